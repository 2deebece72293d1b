use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument};

use crate::{
    auth::AuthUser,
    error::TicketError,
    events::dto::{CreateEventRequest, CreatedEventResponse},
    state::AppState,
    tickets::{identity, repo_types::NewEvent},
};

pub fn event_routes() -> Router<AppState> {
    Router::new().route("/events", post(create_event))
}

/// Creates the event with a fresh short code and registers the creator.
#[instrument(skip(state, body))]
pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(member_id): AuthUser,
    Json(body): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<CreatedEventResponse>), TicketError> {
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(TicketError::BadRequest("Name is required".into()));
    }
    if body.club_id.trim().is_empty() {
        return Err(TicketError::BadRequest("Club is required".into()));
    }

    let event = state
        .store
        .create_event(
            NewEvent {
                club_id: body.club_id,
                name,
                description: body.description,
                image: body.image,
                location: body.location,
                event_type: body.event_type,
                event_date: body.event_date,
            },
            &member_id,
        )
        .await?;

    let ticket_id = identity::encode(&event.id, &member_id)?;
    info!(event_id = %event.id, %member_id, "event created");
    Ok((StatusCode::CREATED, Json(CreatedEventResponse::new(event, ticket_id))))
}
