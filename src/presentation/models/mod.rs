use poem_openapi::Enum;

use crate::domain::models::{ChannelKind, MessageStatus};

#[derive(Enum, Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ChannelKindDto {
    #[default]
    #[oai(rename = "whatsapp")]
    Whatsapp,
    #[oai(rename = "email")]
    Email,
}

impl From<ChannelKindDto> for ChannelKind {
    fn from(value: ChannelKindDto) -> Self {
        match value {
            ChannelKindDto::Whatsapp => ChannelKind::Whatsapp,
            ChannelKindDto::Email => ChannelKind::Email,
        }
    }
}

impl From<ChannelKind> for ChannelKindDto {
    fn from(value: ChannelKind) -> Self {
        match value {
            ChannelKind::Whatsapp => ChannelKindDto::Whatsapp,
            ChannelKind::Email => ChannelKindDto::Email,
        }
    }
}

#[derive(Enum, Copy, Clone, Debug, Eq, PartialEq)]
pub enum MessageStatusDto {
    #[oai(rename = "PENDING")]
    Pending,
    #[oai(rename = "SENT")]
    Sent,
}

impl From<MessageStatus> for MessageStatusDto {
    fn from(value: MessageStatus) -> Self {
        match value {
            MessageStatus::Pending => MessageStatusDto::Pending,
            MessageStatus::Sent => MessageStatusDto::Sent,
        }
    }
}
