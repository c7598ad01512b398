//! Caller-assigned channel identifier.
//!
//! [`ChannelKey`] is a newtype wrapper around an `i32` so that channel keys
//! cannot be confused with listener counts, indices, or other integers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one logical event stream.
///
/// Keys are opaque to the bus: the host assigns them (usually from a table
/// of constants) and they stay stable for the lifetime of the process. Used
/// as the dictionary key in [`super::ChannelRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelKey(i32);

impl ChannelKey {
    /// Creates a `ChannelKey` from a raw integer.
    #[must_use]
    pub const fn new(raw: i32) -> Self {
        Self(raw)
    }

    /// Returns the raw integer.
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for ChannelKey {
    fn from(raw: i32) -> Self {
        Self(raw)
    }
}

impl From<ChannelKey> for i32 {
    fn from(key: ChannelKey) -> Self {
        key.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_integer() {
        assert_eq!(format!("{}", ChannelKey::new(42)), "42");
        assert_eq!(format!("{}", ChannelKey::new(-7)), "-7");
    }

    #[test]
    fn serializes_as_bare_integer() {
        let Ok(json) = serde_json::to_string(&ChannelKey::new(101)) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "101");

        let Ok(key) = serde_json::from_str::<ChannelKey>("101") else {
            panic!("deserialization failed");
        };
        assert_eq!(key, ChannelKey::new(101));
    }

    #[test]
    fn converts_from_and_into_i32() {
        let key: ChannelKey = 200.into();
        assert_eq!(key.get(), 200);
        assert_eq!(i32::from(key), 200);
    }

    #[test]
    fn hash_works_in_hashmap() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ChannelKey::new(1), "login");
        assert_eq!(map.get(&ChannelKey::new(1)), Some(&"login"));
        assert_eq!(map.get(&ChannelKey::new(2)), None);
    }
}
