//! Bus configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Missing or unparsable values fall back
//! to the defaults of [`BusConfig::default`].

/// Default upper bound of retired channels kept per payload shape.
pub const DEFAULT_POOL_MAX_PER_SHAPE: usize = 64;

/// Default limit on publish calls nested inside listeners.
pub const DEFAULT_MAX_PUBLISH_DEPTH: usize = 32;

/// Top-level bus configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Recycle retired channels instead of dropping them.
    pub pool_enabled: bool,

    /// Maximum number of pooled channels per payload shape.
    pub pool_max_per_shape: usize,

    /// How many publishes on one channel may nest inside each other's
    /// listeners on one thread, counting the outermost call. Deeper
    /// publishes deliver nothing.
    pub max_publish_depth: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            pool_enabled: true,
            pool_max_per_shape: DEFAULT_POOL_MAX_PER_SHAPE,
            max_publish_depth: DEFAULT_MAX_PUBLISH_DEPTH,
        }
    }
}

impl BusConfig {
    /// Loads configuration from environment variables.
    ///
    /// | Variable                        | Default |
    /// |---------------------------------|---------|
    /// | `EVENT_BUS_POOL_ENABLED`        | `true`  |
    /// | `EVENT_BUS_POOL_MAX_PER_SHAPE`  | `64`    |
    /// | `EVENT_BUS_MAX_PUBLISH_DEPTH`   | `32`    |
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        Self {
            pool_enabled: parse_env_bool("EVENT_BUS_POOL_ENABLED", defaults.pool_enabled),
            pool_max_per_shape: parse_env(
                "EVENT_BUS_POOL_MAX_PER_SHAPE",
                defaults.pool_max_per_shape,
            ),
            max_publish_depth: parse_env("EVENT_BUS_MAX_PUBLISH_DEPTH", defaults.max_publish_depth)
                .max(1),
        }
    }

    /// Returns a copy with pooling switched on or off.
    #[must_use]
    pub fn with_pool_enabled(mut self, enabled: bool) -> Self {
        self.pool_enabled = enabled;
        self
    }

    /// Returns a copy with a different nesting limit (at least 1).
    #[must_use]
    pub fn with_max_publish_depth(mut self, depth: usize) -> Self {
        self.max_publish_depth = depth.max(1);
        self
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}
