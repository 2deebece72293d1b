use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::tickets::{
    identity::TicketKey,
    repo_types::{Event, EventRow, NewEvent, Registration, RegistrationRow, ShortCode},
};

/// Read side of event registrations plus event creation.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn find_registration(&self, key: &TicketKey) -> anyhow::Result<Option<Registration>>;
    async fn find_event(&self, event_id: &str) -> anyhow::Result<Option<Event>>;
    async fn list_tickets(&self, member_id: &str) -> anyhow::Result<Vec<(Registration, Event)>>;
    async fn create_event(&self, event: NewEvent, creator_id: &str) -> anyhow::Result<Event>;
}

const EVENT_COLUMNS: &str = r#"
    id, club_id, name, description, image, location, type, event_date,
    created_by, short_code, created_at
"#;

#[derive(Clone)]
pub struct PgTicketStore {
    db: PgPool,
}

impl PgTicketStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn find_registration(&self, key: &TicketKey) -> anyhow::Result<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(
            r#"
            SELECT event_id, member_id, status, registered_at
              FROM event_registrations
             WHERE event_id = $1 AND member_id = $2
            "#,
        )
        .bind(&key.event_id)
        .bind(&key.member_id)
        .fetch_optional(&self.db)
        .await
        .context("find registration")?;
        Ok(row.map(Registration::from))
    }

    async fn find_event(&self, event_id: &str) -> anyhow::Result<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(event_id)
        .fetch_optional(&self.db)
        .await
        .context("find event")?;
        row.map(Event::try_from).transpose()
    }

    async fn list_tickets(&self, member_id: &str) -> anyhow::Result<Vec<(Registration, Event)>> {
        let registrations = sqlx::query_as::<_, RegistrationRow>(
            r#"
            SELECT event_id, member_id, status, registered_at
              FROM event_registrations
             WHERE member_id = $1
             ORDER BY registered_at DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.db)
        .await
        .context("list registrations by member")?;

        let event_ids: Vec<String> = registrations.iter().map(|r| r.event_id.clone()).collect();
        let events = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = ANY($1)"
        ))
        .bind(&event_ids)
        .fetch_all(&self.db)
        .await
        .context("list events for registrations")?
        .into_iter()
        .map(Event::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;

        let tickets = registrations
            .into_iter()
            .filter_map(|r| {
                let event = events.iter().find(|e| e.id == r.event_id)?.clone();
                Some((Registration::from(r), event))
            })
            .collect();
        Ok(tickets)
    }

    async fn create_event(&self, event: NewEvent, creator_id: &str) -> anyhow::Result<Event> {
        let event_id = Uuid::new_v4().to_string();
        let short_code = ShortCode::generate();

        let mut tx = self.db.begin().await.context("begin tx")?;
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            INSERT INTO events (id, club_id, name, description, image, location, type,
                                event_date, created_by, short_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {EVENT_COLUMNS}
            "#
        ))
        .bind(&event_id)
        .bind(&event.club_id)
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.image)
        .bind(&event.location)
        .bind(event.event_type.as_str())
        .bind(event.event_date)
        .bind(creator_id)
        .bind(short_code.value() as i32)
        .fetch_one(&mut *tx)
        .await
        .context("insert event")?;

        // The creator always holds a ticket for their own event.
        sqlx::query(
            r#"
            INSERT INTO event_registrations (event_id, member_id, status)
            VALUES ($1, $2, 'Registered')
            "#,
        )
        .bind(&event_id)
        .bind(creator_id)
        .execute(&mut *tx)
        .await
        .context("register event creator")?;

        tx.commit().await.context("commit tx")?;
        debug!(%event_id, creator_id, "event created");
        Event::try_from(row)
    }
}
