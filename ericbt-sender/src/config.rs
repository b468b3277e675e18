use std::time::Duration;

use ericbt_link::finder::Target;
use ericbt_link::link::Delivery;

/// Advertised name of the display to drive; change to match your board.
pub const DEVICE_NAME: &str = "ericbt-04Ws";

/// Set to connect by address instead of by name.
pub const DEVICE_ADDRESS: Option<&str> = None;

pub struct SenderConfig {
    pub target: Target,
    pub scan_timeout: Duration,
    /// Pause between discovery and connecting
    pub settle: Duration,
    pub interval: Duration,
    pub delivery: Delivery,
}

impl Default for SenderConfig {
    fn default() -> Self {
        let target = match DEVICE_ADDRESS {
            Some(address) => address.parse().unwrap_or_else(|e| match e {}),
            None => Target::Name(DEVICE_NAME.to_string()),
        };
        Self {
            target,
            scan_timeout: Duration::from_secs(25),
            settle: Duration::from_millis(500),
            interval: Duration::from_millis(500),
            delivery: Delivery::FireAndForget,
        }
    }
}
