pub mod channel;
pub mod message;

pub use channel::ChannelKind;
pub use message::{MarkSentOutcome, MessageStatus, NewScheduledMessage, ScheduledMessage};
