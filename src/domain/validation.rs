//! Intake checks for a scheduling request. Everything here is pure: the
//! result depends only on the arguments, including the caller's `now`.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

use crate::domain::{
    errors::ValidationError,
    models::{ChannelKind, NewScheduledMessage},
};

pub const DEFAULT_MIN_LEAD_SECONDS: i64 = 60;
pub const WHATSAPP_CONTENT_LIMIT: usize = 4096;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?\.)+[A-Za-z]{2,}$",
    )
    .expect("Failed to compile email regex")
});

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9][0-9]{7,14}$").expect("Failed to compile phone regex"));

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    /// Scheduled times at or before `now + min_lead` are rejected.
    pub min_lead: Duration,
    pub whatsapp_content_limit: Option<usize>,
    pub email_content_limit: Option<usize>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            min_lead: Duration::seconds(DEFAULT_MIN_LEAD_SECONDS),
            whatsapp_content_limit: Some(WHATSAPP_CONTENT_LIMIT),
            email_content_limit: None,
        }
    }
}

impl ValidationPolicy {
    pub fn content_limit(&self, channel: ChannelKind) -> Option<usize> {
        match channel {
            ChannelKind::Whatsapp => self.whatsapp_content_limit,
            ChannelKind::Email => self.email_content_limit,
        }
    }
}

/// Checks destination, content and scheduled time, in that order, and returns
/// the normalized fields ready to be stored.
pub fn validate(
    channel: ChannelKind,
    destination: &str,
    content: &str,
    scheduled_time: &str,
    now: DateTime<Utc>,
    policy: &ValidationPolicy,
) -> Result<NewScheduledMessage, ValidationError> {
    let destination = normalize_destination(channel, destination)?;
    check_content(content, policy.content_limit(channel))?;
    let scheduled_at = parse_scheduled_time(scheduled_time)?;

    // A lead past the end of the calendar leaves no acceptable time.
    let earliest = now
        .checked_add_signed(policy.min_lead)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    if scheduled_at <= earliest {
        return Err(ValidationError::TimeNotInFuture { earliest });
    }

    Ok(NewScheduledMessage {
        channel,
        destination,
        content: content.to_string(),
        scheduled_at,
    })
}

/// Returns the destination in its stored form: trimmed email addresses, and
/// phone numbers reduced to `+` followed by digits.
pub fn normalize_destination(
    channel: ChannelKind,
    destination: &str,
) -> Result<String, ValidationError> {
    let invalid = || ValidationError::InvalidDestination {
        channel,
        destination: destination.to_string(),
    };

    let trimmed = destination.trim();
    match channel {
        ChannelKind::Email => {
            if EMAIL_RE.is_match(trimmed) {
                Ok(trimmed.to_string())
            } else {
                Err(invalid())
            }
        }
        ChannelKind::Whatsapp => {
            let compact: String = trimmed
                .chars()
                .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
                .collect();
            if PHONE_RE.is_match(&compact) {
                Ok(format!("+{}", compact.trim_start_matches('+')))
            } else {
                Err(invalid())
            }
        }
    }
}

pub fn check_content(content: &str, limit: Option<usize>) -> Result<(), ValidationError> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    if let Some(limit) = limit {
        let actual = content.chars().count();
        if actual > limit {
            return Err(ValidationError::ContentTooLong { limit, actual });
        }
    }
    Ok(())
}

/// Parses an ISO-8601 timestamp. Input without an offset is taken as UTC,
/// never as local time. A bare date means midnight UTC.
pub fn parse_scheduled_time(text: &str) -> Result<DateTime<Utc>, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::InvalidTimeFormat);
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(text, format) {
            return Ok(parsed.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(parsed.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    Err(ValidationError::InvalidTimeFormat)
}
