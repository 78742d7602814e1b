use std::fmt::Display;

use crate::error::MqttError;

/// The two incompatible protocol generations this crate speaks.
///
/// The numeric value is the "protocol level" byte of a `CONNECT` packet. Everything after the fixed header can differ
/// between the two, so a message is always bound to exactly one version.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProtocolVersion {
    /// MQTT 3.1.1, protocol level 4
    V311 = 4,
    /// MQTT 5.0, protocol level 5
    V50 = 5,
}

impl ProtocolVersion {

    /// `true` for versions that know about properties, reason strings and the like.
    pub fn has_properties(&self) -> bool {
        *self == ProtocolVersion::V50
    }
}

impl TryFrom<u8> for ProtocolVersion {
    type Error = MqttError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            4 => Ok(ProtocolVersion::V311),
            5 => Ok(ProtocolVersion::V50),
            els => Err(MqttError::ProtocolError(format!("Unsupported protocol level: {}", els))),
        }
    }
}

impl From<ProtocolVersion> for u8 {
    fn from(version: ProtocolVersion) -> Self {
        version as u8
    }
}

impl Display for ProtocolVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolVersion::V311 => write!(f, "3.1.1"),
            ProtocolVersion::V50 => write!(f, "5.0"),
        }
    }
}
