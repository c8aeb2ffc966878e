use std::fmt;

use serde::{Deserialize, Serialize};

/// Outbound provider a message is delivered through. Decides the destination
/// syntax and the content limit applied at intake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Whatsapp,
    Email,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Whatsapp => "whatsapp",
            ChannelKind::Email => "email",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "whatsapp" => Some(ChannelKind::Whatsapp),
            "email" => Some(ChannelKind::Email),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
