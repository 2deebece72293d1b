use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::TicketError,
    state::AppState,
    tickets::{
        check::{self, Admission, TicketView},
        dto::{
            CheckTicketRequest, DecodeResponse, OpenScanRequest, ScanSessionResponse,
            TicketDetails, TicketListItem,
        },
        identity,
        scan::ScannedBarcode,
    },
};

pub fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/tickets", get(list_tickets))
        .route("/tickets/:ticket_id", get(get_ticket))
        .route("/tickets/:ticket_id/qr.svg", get(get_ticket_qr))
        .route("/tickets/:ticket_id/check", post(check_ticket))
}

pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route("/scan-sessions", post(open_scan))
        .route("/scan-sessions/:id", get(get_scan).delete(close_scan))
        .route("/scan-sessions/:id/decode", post(decode_scan))
        .route("/scan-sessions/:id/retry", post(retry_scan))
}

#[instrument(skip(state))]
pub async fn list_tickets(
    State(state): State<AppState>,
    AuthUser(member_id): AuthUser,
) -> Result<Json<Vec<TicketListItem>>, TicketError> {
    let tickets = state.store.list_tickets(&member_id).await?;

    let mut items = Vec::with_capacity(tickets.len());
    for (registration, event) in tickets {
        let id = identity::encode(&registration.event_id, &registration.member_id)?;
        items.push(TicketListItem::new(id, registration, event));
    }
    Ok(Json(items))
}

/// Ticket holders and the event's creator may view a ticket; everyone else gets 404.
async fn visible_ticket(
    state: &AppState,
    member_id: &str,
    ticket_id: &str,
) -> Result<TicketView, TicketError> {
    let view = check::lookup(state.store.as_ref(), ticket_id).await?;
    if view.key.member_id != member_id && view.event.created_by != member_id {
        warn!(%member_id, ticket_id = %view.ticket_id, "ticket viewed by non-holder");
        return Err(TicketError::NotFound("ticket"));
    }
    Ok(view)
}

#[instrument(skip(state))]
pub async fn get_ticket(
    State(state): State<AppState>,
    AuthUser(member_id): AuthUser,
    Path(ticket_id): Path<String>,
) -> Result<Json<TicketDetails>, TicketError> {
    let view = visible_ticket(&state, &member_id, &ticket_id).await?;
    let qr_svg = state.qr.render(&view.ticket_id)?;

    Ok(Json(TicketDetails {
        id: view.ticket_id,
        member_id: view.registration.member_id,
        status: view.registration.status,
        registered_at: view.registration.registered_at,
        event: view.event.into(),
        qr_svg,
    }))
}

#[instrument(skip(state))]
pub async fn get_ticket_qr(
    State(state): State<AppState>,
    AuthUser(member_id): AuthUser,
    Path(ticket_id): Path<String>,
) -> Result<impl IntoResponse, TicketError> {
    let view = visible_ticket(&state, &member_id, &ticket_id).await?;
    let svg = state.qr.render(&view.ticket_id)?;
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], svg))
}

#[instrument(skip(state))]
pub async fn check_ticket(
    State(state): State<AppState>,
    AuthUser(organizer_id): AuthUser,
    Path(ticket_id): Path<String>,
    Json(body): Json<CheckTicketRequest>,
) -> Result<Json<Admission>, TicketError> {
    let admission = check::check_admission(state.store.as_ref(), &ticket_id, body.event_code).await?;
    Ok(Json(admission))
}

#[instrument(skip(state, body))]
pub async fn open_scan(
    State(state): State<AppState>,
    AuthUser(organizer_id): AuthUser,
    Json(body): Json<OpenScanRequest>,
) -> Result<(StatusCode, Json<ScanSessionResponse>), TicketError> {
    if body.ticket_id.trim().is_empty() {
        return Err(TicketError::BadRequest("ticket_id is required".into()));
    }

    let (session_id, session) = state.scans.open(body.ticket_id);
    let scan_state = session.start();
    info!(%session_id, %organizer_id, open = state.scans.open_count(), "scan session opened");

    Ok((
        StatusCode::CREATED,
        Json(ScanSessionResponse {
            session_id,
            ticket_id: session.ticket_id().to_string(),
            state: scan_state,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn get_scan(
    State(state): State<AppState>,
    AuthUser(_organizer_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ScanSessionResponse>, TicketError> {
    let session = state.scans.get(id).ok_or(TicketError::NotFound("scan session"))?;
    Ok(Json(ScanSessionResponse {
        session_id: id,
        ticket_id: session.ticket_id().to_string(),
        state: session.state(),
    }))
}

#[instrument(skip(state, barcode))]
pub async fn decode_scan(
    State(state): State<AppState>,
    AuthUser(_organizer_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(barcode): Json<ScannedBarcode>,
) -> Result<Json<DecodeResponse>, TicketError> {
    let session = state.scans.get(id).ok_or(TicketError::NotFound("scan session"))?;
    let effect = session.on_decode(state.store.as_ref(), &barcode).await;
    Ok(Json(DecodeResponse {
        session_id: id,
        effect,
        session: session.state(),
    }))
}

/// Starts a new attempt: a resolved session goes back to Idle and straight to Scanning.
#[instrument(skip(state))]
pub async fn retry_scan(
    State(state): State<AppState>,
    AuthUser(_organizer_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ScanSessionResponse>, TicketError> {
    let session = state.scans.get(id).ok_or(TicketError::NotFound("scan session"))?;
    session.retry();
    let scan_state = session.start();
    Ok(Json(ScanSessionResponse {
        session_id: id,
        ticket_id: session.ticket_id().to_string(),
        state: scan_state,
    }))
}

#[instrument(skip(state))]
pub async fn close_scan(
    State(state): State<AppState>,
    AuthUser(_organizer_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, TicketError> {
    if !state.scans.close(id) {
        return Err(TicketError::NotFound("scan session"));
    }
    info!(session_id = %id, "scan session abandoned");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use time::Duration;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        app::build_app,
        auth::jwt::testing::sign,
        store::{
            testing::{MemoryStore, UnreachableStore},
            TicketStore,
        },
    };

    fn state_with(store: impl TicketStore + 'static) -> AppState {
        AppState::fake(Arc::new(store))
    }

    fn seeded() -> AppState {
        state_with(
            MemoryStore::default()
                .with_event("e1", 42613)
                .with_registration("e1", "m1"),
        )
    }

    fn bearer(state: &AppState, member_id: &str) -> String {
        format!("Bearer {}", sign(&state.config.jwt, member_id, Duration::minutes(5)))
    }

    async fn send(
        state: &AppState,
        member_id: &str,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, String) {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, bearer(state, member_id));
        let body = match body {
            Some(json) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let res = build_app(state.clone())
            .oneshot(req.body(body).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn json(body: &str) -> serde_json::Value {
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn requests_without_token_are_unauthorized() {
        let res = build_app(seeded())
            .oneshot(Request::get("/api/v1/tickets").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn lists_own_tickets_with_paths() {
        let state = seeded();
        let (status, body) = send(&state, "m1", "GET", "/api/v1/tickets", None).await;
        assert_eq!(status, StatusCode::OK);
        let list = json(&body);
        assert_eq!(list[0]["id"], "e1#m1");
        assert_eq!(list[0]["path"], "e1%23m1");
        assert_eq!(list[0]["status"], "Registered");
        assert!(list[0]["event"].get("short_code").is_none());
    }

    #[tokio::test]
    async fn ticket_view_includes_qr() {
        let state = seeded();
        let (status, body) = send(&state, "m1", "GET", "/api/v1/tickets/e1%23m1", None).await;
        assert_eq!(status, StatusCode::OK);
        let ticket = json(&body);
        assert_eq!(ticket["id"], "e1#m1");
        assert!(ticket["qr_svg"].as_str().unwrap().contains("<svg"));
    }

    #[tokio::test]
    async fn qr_endpoint_serves_svg() {
        let state = seeded();
        let (status, body) = send(&state, "m1", "GET", "/api/v1/tickets/e1%23m1/qr.svg", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<svg"));
    }

    #[tokio::test]
    async fn ticket_view_error_states() {
        let state = seeded();
        let (status, body) = send(&state, "m1", "GET", "/api/v1/tickets/e1m1", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["error"]["code"], "MALFORMED_TICKET_ID");

        let (status, _) = send(&state, "m2", "GET", "/api/v1/tickets/e1%23m2", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // Someone else's ticket looks the same as a missing one.
        let (status, _) = send(&state, "m2", "GET", "/api/v1/tickets/e1%23m1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // The organizer who created the event can open it.
        let (status, _) = send(&state, "organizer", "GET", "/api/v1/tickets/e1%23m1", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn check_endpoint_reports_verdicts() {
        let state = seeded();
        let uri = "/api/v1/tickets/e1%23m1/check";

        let (status, body) =
            send(&state, "organizer", "POST", uri, Some(serde_json::json!({ "event_code": 42613 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body), serde_json::json!({ "result": "valid" }));

        let (_, body) =
            send(&state, "organizer", "POST", uri, Some(serde_json::json!({ "event_code": 99999 }))).await;
        assert_eq!(json(&body)["reason"], "code_mismatch");
    }

    #[tokio::test]
    async fn check_endpoint_surfaces_store_failure() {
        let state = state_with(UnreachableStore);
        let (status, body) = send(
            &state,
            "organizer",
            "POST",
            "/api/v1/tickets/e1%23m1/check",
            Some(serde_json::json!({ "event_code": 42613 })),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json(&body)["error"]["code"], "CHECK_FAILED");
    }

    #[tokio::test]
    async fn scan_session_lifecycle() {
        let state = seeded();
        let (status, body) = send(
            &state,
            "organizer",
            "POST",
            "/api/v1/scan-sessions",
            Some(serde_json::json!({ "ticket_id": "e1%23m1" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let opened = json(&body);
        assert_eq!(opened["state"], "scanning");
        let id = opened["session_id"].as_str().unwrap().to_string();
        let decode_uri = format!("/api/v1/scan-sessions/{id}/decode");

        let (_, body) = send(
            &state,
            "organizer",
            "POST",
            &decode_uri,
            Some(serde_json::json!({ "format": "ean_13", "raw_value": "42613" })),
        )
        .await;
        assert_eq!(json(&body)["effect"]["effect"], "ignored");

        let (_, body) = send(
            &state,
            "organizer",
            "POST",
            &decode_uri,
            Some(serde_json::json!({ "format": "qr_code", "raw_value": "42613" })),
        )
        .await;
        let decoded = json(&body);
        assert_eq!(decoded["effect"]["effect"], "resolved");
        assert_eq!(decoded["session"]["outcome"]["result"], "valid");

        let (_, body) = send(
            &state,
            "organizer",
            "POST",
            &decode_uri,
            Some(serde_json::json!({ "format": "qr_code", "raw_value": "42613" })),
        )
        .await;
        assert_eq!(json(&body)["effect"]["effect"], "dropped");

        let (_, body) =
            send(&state, "organizer", "POST", &format!("/api/v1/scan-sessions/{id}/retry"), None).await;
        assert_eq!(json(&body)["state"], "scanning");

        let (status, _) =
            send(&state, "organizer", "DELETE", &format!("/api/v1/scan-sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) =
            send(&state, "organizer", "GET", &format!("/api/v1/scan-sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
