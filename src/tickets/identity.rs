use std::fmt;

use serde::Serialize;

use crate::error::TicketError;

/// Joins event and member ids in a ticket id. Generated ids are UUID strings,
/// which never contain it.
pub const TICKET_ID_SEPARATOR: char = '#';

/// Characters excluded from the id alphabet. `%` is reserved because `decode`
/// percent-decodes before splitting.
const RESERVED: [char; 2] = [TICKET_ID_SEPARATOR, '%'];

/// The (event, member) pair a ticket stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TicketKey {
    pub event_id: String,
    pub member_id: String,
}

impl TicketKey {
    pub fn new(event_id: impl Into<String>, member_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            member_id: member_id.into(),
        }
    }
}

impl fmt::Display for TicketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.event_id, TICKET_ID_SEPARATOR, self.member_id)
    }
}

fn check_part(part: &str) -> Result<(), TicketError> {
    if part.is_empty() {
        return Err(TicketError::InvalidIdentifier(TICKET_ID_SEPARATOR));
    }
    match part.chars().find(|c| RESERVED.contains(c)) {
        Some(c) => Err(TicketError::InvalidIdentifier(c)),
        None => Ok(()),
    }
}

pub fn encode(event_id: &str, member_id: &str) -> Result<String, TicketError> {
    check_part(event_id)?;
    check_part(member_id)?;
    Ok(format!("{event_id}{TICKET_ID_SEPARATOR}{member_id}"))
}

/// Percent-decodes `ticket_id`, then splits it into exactly two non-empty parts.
pub fn decode(ticket_id: &str) -> Result<TicketKey, TicketError> {
    let raw = urlencoding::decode(ticket_id).map_err(|_| TicketError::MalformedTicketId)?;

    let mut parts = raw.split(TICKET_ID_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(event_id), Some(member_id), None)
            if !event_id.is_empty() && !member_id.is_empty() =>
        {
            Ok(TicketKey::new(event_id, member_id))
        }
        _ => Err(TicketError::MalformedTicketId),
    }
}

/// Ticket id as it appears in a URL path segment.
pub fn to_path_segment(ticket_id: &str) -> String {
    urlencoding::encode(ticket_id).into_owned()
}
