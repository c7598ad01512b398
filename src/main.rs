//! keyed-bus demo entry point.
//!
//! Wires a login screen out of independent panels that only talk through
//! the bus, then drives a short session and prints the bus statistics.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use keyed_bus::config::BusConfig;
use keyed_bus::domain::Listener;
use keyed_bus::service::EventService;

const ON_LOGIN_CLICKED: i32 = 100;
const ON_LOGGED_IN: i32 = 101;
const ON_LOGOUT_CLICKED: i32 = 102;
const ON_LOGGED_OUT: i32 = 103;
const ON_SHOW_POPUP: i32 = 200;
const ON_CLOSE_POPUP: i32 = 201;

/// Which panel is on screen, and whether the popup covers it.
#[derive(Debug, Default)]
struct Screen {
    logged_in_as: Option<String>,
    popup: Option<String>,
}

impl Screen {
    fn describe(&self) -> String {
        let panel = match &self.logged_in_as {
            Some(user) => format!("logged in as {user}"),
            None => "login".to_string(),
        };
        match &self.popup {
            Some(text) => format!("{panel} (popup: {text})"),
            None => panel,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = BusConfig::from_env();
    tracing::info!(
        pool_enabled = config.pool_enabled,
        max_publish_depth = config.max_publish_depth,
        "starting keyed-bus demo"
    );

    let bus = EventService::new(&config);
    let screen = Arc::new(Mutex::new(Screen::default()));

    // Login panel: validates the name, then either complains or logs in.
    let login: Listener<(String,)> = {
        let bus = bus.clone();
        Listener::new(move |name: &String| {
            if name.trim().is_empty() {
                bus.publish1(ON_SHOW_POPUP, "Username cannot be empty".to_string());
            } else {
                bus.publish1(ON_LOGGED_IN, name.clone());
            }
        })
    };

    // Logged-in panel: turns a logout click into a logged-out event.
    let logout: Listener<()> = {
        let bus = bus.clone();
        Listener::new(move || {
            bus.publish0(ON_LOGGED_OUT);
        })
    };

    // Panels handler: tracks what is visible.
    let on_logged_in: Listener<(String,)> = {
        let screen = Arc::clone(&screen);
        Listener::new(move |name: &String| {
            tracing::info!(user = %name, "showing logged-in panel");
            screen.lock().logged_in_as = Some(name.clone());
        })
    };
    let on_logged_out: Listener<()> = {
        let screen = Arc::clone(&screen);
        Listener::new(move || {
            tracing::info!("showing login panel");
            screen.lock().logged_in_as = None;
        })
    };

    // Popup panel.
    let show_popup: Listener<(String,)> = {
        let screen = Arc::clone(&screen);
        Listener::new(move |text: &String| {
            tracing::info!(text = %text, "popup shown");
            screen.lock().popup = Some(text.clone());
        })
    };
    let close_popup: Listener<()> = {
        let screen = Arc::clone(&screen);
        Listener::new(move || {
            tracing::info!("popup closed");
            screen.lock().popup = None;
        })
    };

    bus.subscribe(ON_LOGIN_CLICKED, &login)?;
    bus.subscribe(ON_LOGOUT_CLICKED, &logout)?;
    bus.subscribe(ON_LOGGED_IN, &on_logged_in)?;
    bus.subscribe(ON_LOGGED_OUT, &on_logged_out)?;
    bus.subscribe(ON_SHOW_POPUP, &show_popup)?;
    bus.subscribe(ON_CLOSE_POPUP, &close_popup)?;
    println!("{}", serde_json::to_string_pretty(&bus.channels())?);

    bus.publish1(ON_LOGIN_CLICKED, String::new());
    bus.publish0(ON_CLOSE_POPUP);
    bus.publish1(ON_LOGIN_CLICKED, "ada".to_string());
    tracing::info!(screen = %screen.lock().describe(), "after login");

    bus.publish0(ON_LOGOUT_CLICKED);
    tracing::info!(screen = %screen.lock().describe(), "after logout");

    // Tear the panels down again; emptied channels go back to the pool.
    bus.unsubscribe(ON_LOGIN_CLICKED, &login)?;
    bus.unsubscribe(ON_LOGOUT_CLICKED, &logout)?;
    bus.unsubscribe(ON_LOGGED_IN, &on_logged_in)?;
    bus.unsubscribe(ON_LOGGED_OUT, &on_logged_out)?;
    bus.unsubscribe(ON_SHOW_POPUP, &show_popup)?;
    bus.unsubscribe(ON_CLOSE_POPUP, &close_popup)?;

    println!("{}", serde_json::to_string_pretty(&bus.stats())?);
    bus.clear_all(true);

    Ok(())
}
