use serde::{Deserialize, Serialize};

/// Outcome of a single TCP connect attempt.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Open,
    Closed,
}

impl PortState {
    pub fn as_str(self) -> &'static str {
        match self {
            PortState::Open => "open",
            PortState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for PortState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One result entry per requested port.
///
/// `service` holds the banner the service sent right after the handshake, and
/// is empty when the port is closed or nothing arrived in time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanResult {
    pub port: u16,
    pub state: PortState,
    pub service: String,
}

impl ScanResult {
    pub fn closed(port: u16) -> Self {
        Self {
            port,
            state: PortState::Closed,
            service: String::new(),
        }
    }

    pub fn open(port: u16, service: String) -> Self {
        Self {
            port,
            state: PortState::Open,
            service,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == PortState::Open
    }
}
