use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    store::TicketStore,
    tickets::check::{self, Admission, RejectReason},
};

/// Symbologies the organizer scanner listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeFormat {
    QrCode,
    RmQrCode,
    MicroQrCode,
    #[serde(other)]
    Unknown,
}

/// One raw decode reported by the scanner.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannedBarcode {
    pub format: BarcodeFormat,
    pub raw_value: String,
}

impl ScannedBarcode {
    /// The event short code carried by this barcode, if it is one.
    pub fn event_code(&self) -> Option<u32> {
        lazy_static! {
            static ref EVENT_CODE_RE: Regex = Regex::new(r"^[0-9]{1,9}$").unwrap();
        }
        if self.format == BarcodeFormat::Unknown {
            return None;
        }
        let raw = self.raw_value.trim();
        if !EVENT_CODE_RE.is_match(raw) {
            return None;
        }
        raw.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "reason", rename_all = "snake_case")]
pub enum ScanOutcome {
    Valid,
    Invalid(InvalidReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    MalformedTicket,
    NotFound,
    NotActive,
    CodeMismatch,
    /// The registration store could not be consulted.
    CheckFailed,
}

impl From<RejectReason> for InvalidReason {
    fn from(r: RejectReason) -> Self {
        match r {
            RejectReason::MalformedTicket => InvalidReason::MalformedTicket,
            RejectReason::NotFound => InvalidReason::NotFound,
            RejectReason::NotActive => InvalidReason::NotActive,
            RejectReason::CodeMismatch => InvalidReason::CodeMismatch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Scanning,
    Checking,
    Resolved { outcome: ScanOutcome },
}

/// What happened to a single decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", content = "outcome", rename_all = "snake_case")]
pub enum DecodeEffect {
    /// Not an event code; the session keeps scanning.
    Ignored,
    /// The session was not scanning (a check is in flight or already resolved).
    Dropped,
    Resolved(ScanOutcome),
}

/// Organizer scan session for one ticket. At most one check runs at a time.
#[derive(Debug)]
pub struct ScanSession {
    ticket_id: String,
    state: Mutex<ScanState>,
}

impl ScanSession {
    pub fn new(ticket_id: impl Into<String>) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            state: Mutex::new(ScanState::Idle),
        }
    }

    pub fn ticket_id(&self) -> &str {
        &self.ticket_id
    }

    pub fn state(&self) -> ScanState {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, ScanState> {
        // The guarded value is a plain tag, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Idle -> Scanning. Other states are left alone.
    pub fn start(&self) -> ScanState {
        let mut state = self.lock();
        if *state == ScanState::Idle {
            *state = ScanState::Scanning;
        }
        *state
    }

    /// Resolved -> Idle, for a new scan attempt.
    pub fn retry(&self) -> ScanState {
        let mut state = self.lock();
        if matches!(*state, ScanState::Resolved { .. }) {
            *state = ScanState::Idle;
        }
        *state
    }

    pub async fn on_decode(&self, store: &dyn TicketStore, barcode: &ScannedBarcode) -> DecodeEffect {
        let code = {
            let mut state = self.lock();
            if *state != ScanState::Scanning {
                debug!(ticket_id = %self.ticket_id, state = ?*state, "decode dropped");
                return DecodeEffect::Dropped;
            }
            let Some(code) = barcode.event_code() else {
                debug!(format = ?barcode.format, "unrecognized decode ignored");
                return DecodeEffect::Ignored;
            };
            *state = ScanState::Checking;
            code
        };

        let _guard = CheckingGuard { session: self };
        let outcome = match check::check_admission(store, &self.ticket_id, code).await {
            Ok(Admission::Valid) => ScanOutcome::Valid,
            Ok(Admission::Rejected(reason)) => ScanOutcome::Invalid(reason.into()),
            Err(_) => ScanOutcome::Invalid(InvalidReason::CheckFailed),
        };

        *self.lock() = ScanState::Resolved { outcome };
        info!(ticket_id = %self.ticket_id, ?outcome, "scan resolved");
        DecodeEffect::Resolved(outcome)
    }
}

/// Puts a session whose check was cancelled mid-flight back to Scanning.
struct CheckingGuard<'a> {
    session: &'a ScanSession,
}

impl Drop for CheckingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.session.lock();
        if *state == ScanState::Checking {
            *state = ScanState::Scanning;
            warn!(ticket_id = %self.session.ticket_id, "check cancelled, scanning again");
        }
    }
}

/// Sessions older than this are swept when a new one is opened.
pub const DEFAULT_SESSION_TTL: Duration = Duration::minutes(30);

struct SessionEntry {
    opened_at: OffsetDateTime,
    session: Arc<ScanSession>,
}

/// Open scan sessions, one per organizer scanner view.
#[derive(Clone)]
pub struct ScanSessions {
    inner: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
    ttl: Duration,
}

impl Default for ScanSessions {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl ScanSessions {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            ttl,
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<Uuid, SessionEntry>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn open(&self, ticket_id: impl Into<String>) -> (Uuid, Arc<ScanSession>) {
        let id = Uuid::new_v4();
        let session = Arc::new(ScanSession::new(ticket_id));
        let now = OffsetDateTime::now_utc();

        let mut map = self.map();
        let before = map.len();
        map.retain(|_, entry| now - entry.opened_at < self.ttl);
        if map.len() < before {
            debug!(swept = before - map.len(), "stale scan sessions swept");
        }
        map.insert(
            id,
            SessionEntry {
                opened_at: now,
                session: session.clone(),
            },
        );
        (id, session)
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<ScanSession>> {
        self.map().get(&id).map(|entry| entry.session.clone())
    }

    pub fn close(&self, id: Uuid) -> bool {
        self.map().remove(&id).is_some()
    }

    pub fn open_count(&self) -> usize {
        self.map().len()
    }
}
