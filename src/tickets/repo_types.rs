use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// Per-event 6-digit verification number shown to organizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(u32);

impl ShortCode {
    pub const MAX: u32 = 999_999;

    pub fn new(value: u32) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    /// Fresh code for a new event. Not unique and not secret, only a coarse check.
    pub fn generate() -> Self {
        Self(rand::thread_rng().gen_range(0..=Self::MAX))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// A scanned number matches when it equals the stored value; zero padding is
    /// lost once the code goes through a numeric barcode.
    pub fn matches(self, scanned: u32) -> bool {
        self.0 == scanned
    }
}

impl fmt::Display for ShortCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum RegistrationStatus {
    Registered,
    Other(String),
}

impl From<String> for RegistrationStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Registered" => Self::Registered,
            _ => Self::Other(s),
        }
    }
}

impl From<RegistrationStatus> for String {
    fn from(s: RegistrationStatus) -> Self {
        match s {
            RegistrationStatus::Registered => "Registered".into(),
            RegistrationStatus::Other(other) => other,
        }
    }
}

/// One member's participation in one event. (event_id, member_id) is unique.
#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub event_id: String,
    pub member_id: String,
    pub status: RegistrationStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct RegistrationRow {
    pub event_id: String,
    pub member_id: String,
    pub status: String,
    pub registered_at: OffsetDateTime,
}

impl From<RegistrationRow> for Registration {
    fn from(r: RegistrationRow) -> Self {
        Self {
            event_id: r.event_id,
            member_id: r.member_id,
            status: r.status.into(),
            registered_at: r.registered_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Online,
    Offline,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Online => "ONLINE",
            EventType::Offline => "OFFLINE",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "ONLINE" => Some(EventType::Online),
            "OFFLINE" => Some(EventType::Offline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Event {
    pub id: String,
    pub club_id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub location: Option<String>,
    pub event_type: Option<EventType>,
    pub event_date: OffsetDateTime,
    pub created_by: String,
    pub short_code: ShortCode,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct EventRow {
    pub id: String,
    pub club_id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub location: Option<String>,
    #[sqlx(rename = "type")]
    pub event_type: Option<String>,
    pub event_date: OffsetDateTime,
    pub created_by: String,
    pub short_code: i32,
    pub created_at: OffsetDateTime,
}

impl TryFrom<EventRow> for Event {
    type Error = anyhow::Error;

    fn try_from(r: EventRow) -> Result<Self, Self::Error> {
        let short_code = u32::try_from(r.short_code)
            .ok()
            .and_then(ShortCode::new)
            .ok_or_else(|| anyhow::anyhow!("event {} has out-of-range short code {}", r.id, r.short_code))?;
        Ok(Self {
            event_type: r.event_type.as_deref().and_then(EventType::parse),
            id: r.id,
            club_id: r.club_id,
            name: r.name,
            description: r.description,
            image: r.image,
            location: r.location,
            event_date: r.event_date,
            created_by: r.created_by,
            short_code,
            created_at: r.created_at,
        })
    }
}

/// Input for creating an event; id and short code are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub club_id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub location: Option<String>,
    pub event_type: EventType,
    pub event_date: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_code_displays_zero_padded() {
        assert_eq!(ShortCode::new(42613).unwrap().to_string(), "042613");
        assert_eq!(ShortCode::new(0).unwrap().to_string(), "000000");
        assert!(ShortCode::new(1_000_000).is_none());
    }

    #[test]
    fn generated_short_codes_stay_in_range() {
        for _ in 0..1000 {
            let code = ShortCode::generate();
            assert!(code.value() <= ShortCode::MAX);
            assert_eq!(code.to_string().len(), 6);
        }
    }

    #[test]
    fn status_keeps_unknown_values() {
        assert_eq!(RegistrationStatus::from("Registered".to_string()), RegistrationStatus::Registered);
        let other = RegistrationStatus::from("Waitlisted".to_string());
        assert_eq!(String::from(other), "Waitlisted");
    }

    #[test]
    fn event_row_rejects_negative_short_code() {
        let row = EventRow {
            id: "e1".into(),
            club_id: "c1".into(),
            name: "Hackathon".into(),
            description: None,
            image: None,
            location: None,
            event_type: Some("OFFLINE".into()),
            event_date: OffsetDateTime::UNIX_EPOCH,
            created_by: "m1".into(),
            short_code: -1,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert!(Event::try_from(row).is_err());
    }
}
