use poem_openapi::Object;

use crate::presentation::models::ChannelKindDto;

/// Field checks are left to the domain validator so every rejection carries
/// the same error body.
#[derive(Object, Debug)]
pub struct ScheduleMessageRequestDto {
    #[oai(default)]
    pub channel: ChannelKindDto,
    /// Phone number for WhatsApp, email address for email.
    pub recipient: String,
    pub content: String,
    /// ISO 8601 timestamp; UTC is assumed when no offset is given.
    pub send_date: String,
}
