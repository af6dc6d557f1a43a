//! Audio output route descriptions.

use serde::{Deserialize, Serialize};

/// Why the platform reported a route change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteChangeReason {
    NewDeviceAvailable,
    OldDeviceUnavailable,
    RouteConfigurationChange,
    CategoryChange,
    Other,
}

/// Kind of a single output port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputKind {
    BuiltInSpeaker,
    Headphones,
    Bluetooth,
    AirPlay,
    Hdmi,
    Usb,
    Other,
}

impl OutputKind {
    pub const fn is_wireless_display(self) -> bool {
        matches!(self, Self::AirPlay)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteOutput {
    pub kind: OutputKind,
    pub name: String,
}

impl RouteOutput {
    pub fn new(kind: OutputKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// The set of outputs audio is routed to at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSnapshot {
    pub outputs: Vec<RouteOutput>,
}

impl RouteSnapshot {
    pub const fn new(outputs: Vec<RouteOutput>) -> Self {
        Self { outputs }
    }

    pub fn single(kind: OutputKind, name: impl Into<String>) -> Self {
        Self::new(vec![RouteOutput::new(kind, name)])
    }

    /// Whether any output is a wireless display/speaker (AirPlay).
    pub fn is_wireless_active(&self) -> bool {
        self.outputs.iter().any(|o| o.kind.is_wireless_display())
    }
}

/// A raw route-change notification from the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteChange {
    pub reason: RouteChangeReason,
    pub previous: RouteSnapshot,
    pub current: RouteSnapshot,
}

impl RouteChange {
    pub const fn new(
        reason: RouteChangeReason,
        previous: RouteSnapshot,
        current: RouteSnapshot,
    ) -> Self {
        Self {
            reason,
            previous,
            current,
        }
    }
}

/// Debounced route state as seen by consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteState {
    pub airplay_active: bool,
    pub last_reason: Option<RouteChangeReason>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wireless_predicate() {
        assert!(!RouteSnapshot::default().is_wireless_active());
        assert!(!RouteSnapshot::single(OutputKind::Bluetooth, "Buds").is_wireless_active());
        let mixed = RouteSnapshot::new(vec![
            RouteOutput::new(OutputKind::BuiltInSpeaker, "Speaker"),
            RouteOutput::new(OutputKind::AirPlay, "Living Room"),
        ]);
        assert!(mixed.is_wireless_active());
    }
}
