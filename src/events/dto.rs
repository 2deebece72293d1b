use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::tickets::repo_types::{Event, EventType};

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub club_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(with = "time::serde::rfc3339")]
    pub event_date: OffsetDateTime,
}

/// Returned only to the organizer who created the event.
#[derive(Debug, Serialize)]
pub struct CreatedEventResponse {
    pub id: String,
    pub name: String,
    pub short_code: String,
    pub ticket_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub event_date: OffsetDateTime,
}

impl CreatedEventResponse {
    pub fn new(event: Event, ticket_id: String) -> Self {
        Self {
            short_code: event.short_code.to_string(),
            id: event.id,
            name: event.name,
            ticket_id,
            event_date: event.event_date,
        }
    }
}
