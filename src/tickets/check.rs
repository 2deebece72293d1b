use serde::Serialize;
use tracing::{error, info, warn};

use crate::{
    error::TicketError,
    store::TicketStore,
    tickets::{
        identity::{self, TicketKey},
        repo_types::{Event, Registration, RegistrationStatus},
    },
};

/// Why an admission check rejected a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MalformedTicket,
    NotFound,
    /// A registration exists but its status is not `Registered`.
    NotActive,
    CodeMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum Admission {
    Valid,
    Rejected(RejectReason),
}

/// A registration found through its ticket id, with the event it belongs to.
#[derive(Debug, Clone)]
pub struct TicketView {
    pub ticket_id: String,
    pub key: TicketKey,
    pub registration: Registration,
    pub event: Event,
}

/// Member-side ticket lookup. Read-only.
pub async fn lookup(store: &dyn TicketStore, ticket_id: &str) -> Result<TicketView, TicketError> {
    let key = identity::decode(ticket_id)?;

    let (registration, event) = tokio::try_join!(
        store.find_registration(&key),
        store.find_event(&key.event_id),
    )
    .map_err(TicketError::CheckFailed)?;

    let registration = registration.ok_or(TicketError::NotFound("ticket"))?;
    let event = event.ok_or(TicketError::NotFound("event"))?;

    Ok(TicketView {
        ticket_id: key.to_string(),
        key,
        registration,
        event,
    })
}

/// Organizer-side admission check against the live registration state.
///
/// Decode problems and missing rows are verdicts (`Ok(Rejected)`); store
/// failures come back as [`TicketError::CheckFailed`] so they are never
/// reported as an invalid ticket.
pub async fn check_admission(
    store: &dyn TicketStore,
    ticket_id: &str,
    scanned_code: u32,
) -> Result<Admission, TicketError> {
    let key = match identity::decode(ticket_id) {
        Ok(key) => key,
        Err(_) => {
            warn!(target: "ticket_audit", ticket_id, reason = "malformed_ticket", "admission rejected");
            return Ok(Admission::Rejected(RejectReason::MalformedTicket));
        }
    };

    let (registration, event) = match tokio::try_join!(
        store.find_registration(&key),
        store.find_event(&key.event_id),
    ) {
        Ok(found) => found,
        Err(e) => {
            error!(target: "ticket_audit", error = ?e, event_id = %key.event_id, member_id = %key.member_id, "admission check failed");
            return Err(TicketError::CheckFailed(e));
        }
    };

    let verdict = match (registration, event) {
        (Some(r), Some(_)) if r.status != RegistrationStatus::Registered => {
            Admission::Rejected(RejectReason::NotActive)
        }
        (Some(_), Some(event)) if event.short_code.matches(scanned_code) => Admission::Valid,
        (Some(_), Some(_)) => Admission::Rejected(RejectReason::CodeMismatch),
        _ => Admission::Rejected(RejectReason::NotFound),
    };

    match verdict {
        Admission::Valid => {
            info!(target: "ticket_audit", event_id = %key.event_id, member_id = %key.member_id, "admission granted")
        }
        Admission::Rejected(reason) => {
            warn!(target: "ticket_audit", event_id = %key.event_id, member_id = %key.member_id, ?reason, scanned_code, "admission rejected")
        }
    }
    Ok(verdict)
}
