//! Debounces raw route-change notifications into one "wireless output active"
//! flag.

use segue_core::{RouteChange, RouteChangeReason, RouteSnapshot, RouteState};
use tracing::debug;

/// Tracks whether audio is routed to a wireless display/speaker.
///
/// Consumers only see edges: [`handle`](Self::handle) returns `Some(active)`
/// when the flag flips and `None` for every notification that does not.
#[derive(Debug, Clone, Default)]
pub struct RouteMonitor {
    active: bool,
    last_reason: Option<RouteChangeReason>,
}

impl RouteMonitor {
    /// Start from the route in effect when playback is set up.
    pub fn new(initial: &RouteSnapshot) -> Self {
        Self {
            active: initial.is_wireless_active(),
            last_reason: None,
        }
    }

    pub const fn is_active(&self) -> bool {
        self.active
    }

    pub const fn state(&self) -> RouteState {
        RouteState {
            airplay_active: self.active,
            last_reason: self.last_reason,
        }
    }

    /// Apply a notification. Returns the new flag if it changed.
    pub fn handle(&mut self, change: &RouteChange) -> Option<bool> {
        self.last_reason = Some(change.reason);
        let wireless = change.current.is_wireless_active();

        match change.reason {
            RouteChangeReason::NewDeviceAvailable => {
                if wireless && !self.active {
                    self.active = true;
                    return Some(true);
                }
                None
            }
            RouteChangeReason::OldDeviceUnavailable => {
                let was_active = self.active;
                self.active = wireless;
                (was_active && !wireless).then_some(false)
            }
            RouteChangeReason::CategoryChange => {
                if wireless == self.active {
                    return None;
                }
                self.active = wireless;
                Some(wireless)
            }
            RouteChangeReason::RouteConfigurationChange | RouteChangeReason::Other => {
                debug!("Ignoring route change: {:?}", change.reason);
                None
            }
        }
    }
}
