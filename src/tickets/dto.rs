use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::tickets::{
    identity,
    repo_types::{Event, EventType, Registration, RegistrationStatus},
    scan::{DecodeEffect, ScanState},
};

/// Event as shown to ticket holders. The short code stays with the organizer.
#[derive(Debug, Serialize)]
pub struct EventSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub location: Option<String>,
    pub event_type: Option<EventType>,
    #[serde(with = "time::serde::rfc3339")]
    pub event_date: OffsetDateTime,
}

impl From<Event> for EventSummary {
    fn from(e: Event) -> Self {
        Self {
            id: e.id,
            name: e.name,
            description: e.description,
            image: e.image,
            location: e.location,
            event_type: e.event_type,
            event_date: e.event_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TicketListItem {
    pub id: String,
    pub path: String,
    pub status: RegistrationStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
    pub event: EventSummary,
}

impl TicketListItem {
    pub fn new(id: String, registration: Registration, event: Event) -> Self {
        Self {
            path: identity::to_path_segment(&id),
            id,
            status: registration.status,
            registered_at: registration.registered_at,
            event: event.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TicketDetails {
    pub id: String,
    pub member_id: String,
    pub status: RegistrationStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub registered_at: OffsetDateTime,
    pub event: EventSummary,
    pub qr_svg: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckTicketRequest {
    pub event_code: u32,
}

#[derive(Debug, Deserialize)]
pub struct OpenScanRequest {
    pub ticket_id: String,
}

#[derive(Debug, Serialize)]
pub struct ScanSessionResponse {
    pub session_id: Uuid,
    pub ticket_id: String,
    #[serde(flatten)]
    pub state: ScanState,
}

#[derive(Debug, Serialize)]
pub struct DecodeResponse {
    pub session_id: Uuid,
    pub effect: DecodeEffect,
    pub session: ScanState,
}
