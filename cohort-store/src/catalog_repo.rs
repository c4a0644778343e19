use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cohort_catalog::{BundleDefinition, BundleStatus, CatalogRepository, EventRecord, EventStatus};
use cohort_core::{CoreError, CoreResult};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_links(&self, bundle_ids: &[Uuid]) -> CoreResult<HashMap<Uuid, Vec<LinkRow>>> {
        let rows = sqlx::query_as::<_, LinkRow>(
            "SELECT bundle_id, event_id, role FROM bundle_events WHERE bundle_id = ANY($1) ORDER BY bundle_id, position",
        )
        .bind(bundle_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        let mut grouped: HashMap<Uuid, Vec<LinkRow>> = HashMap::new();
        for row in rows {
            grouped.entry(row.bundle_id).or_default().push(row);
        }
        Ok(grouped)
    }
}

const EVENT_COLUMNS: &str =
    "id, title, date, location, capacity, price_nis, lifecycle_status, registered_count";

const BUNDLE_COLUMNS: &str =
    "id, title, description, price_nis, valid_until, publish, lifecycle_status, created_at";

#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    title: String,
    date: DateTime<Utc>,
    location: String,
    capacity: i32,
    price_nis: i64,
    lifecycle_status: String,
    registered_count: i32,
}

impl TryFrom<EventRow> for EventRecord {
    type Error = CoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(EventRecord {
            id: row.id,
            title: row.title,
            date: row.date,
            location: row.location,
            capacity: u32::try_from(row.capacity).map_err(CoreError::storage)?,
            price_nis: row.price_nis,
            lifecycle_status: row.lifecycle_status.parse().map_err(CoreError::storage)?,
            registered_count: u32::try_from(row.registered_count).map_err(CoreError::storage)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BundleRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    price_nis: i64,
    valid_until: Option<DateTime<Utc>>,
    publish: bool,
    lifecycle_status: String,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct LinkRow {
    bundle_id: Uuid,
    event_id: Uuid,
    role: String,
}

fn assemble_bundle(row: BundleRow, links: Vec<LinkRow>) -> CoreResult<BundleDefinition> {
    let (members, pool): (Vec<LinkRow>, Vec<LinkRow>) = links.into_iter().partition(|l| l.role == "member");
    Ok(BundleDefinition {
        id: row.id,
        title: row.title,
        description: row.description,
        price_nis: row.price_nis,
        event_ids: members.into_iter().map(|l| l.event_id).collect(),
        replacement_event_ids: pool.into_iter().map(|l| l.event_id).collect(),
        valid_until: row.valid_until,
        publish: row.publish,
        lifecycle_status: row.lifecycle_status.parse::<BundleStatus>().map_err(CoreError::storage)?,
        created_at: row.created_at,
    })
}

fn to_db_count(value: u32) -> CoreResult<i32> {
    i32::try_from(value).map_err(CoreError::storage)
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn get_bundle(&self, id: Uuid) -> CoreResult<Option<BundleDefinition>> {
        let row = sqlx::query_as::<_, BundleRow>(&format!("SELECT {} FROM bundles WHERE id = $1", BUNDLE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::storage)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut links = self.load_links(&[id]).await?;
        assemble_bundle(row, links.remove(&id).unwrap_or_default()).map(Some)
    }

    async fn list_bundles(&self) -> CoreResult<Vec<BundleDefinition>> {
        let rows = sqlx::query_as::<_, BundleRow>(&format!(
            "SELECT {} FROM bundles ORDER BY created_at",
            BUNDLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut links = self.load_links(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let bundle_links = links.remove(&row.id).unwrap_or_default();
                assemble_bundle(row, bundle_links)
            })
            .collect()
    }

    async fn save_bundle(&self, bundle: &BundleDefinition) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(CoreError::storage)?;

        sqlx::query(
            r#"
            INSERT INTO bundles (id, title, description, price_nis, valid_until, publish, lifecycle_status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                price_nis = EXCLUDED.price_nis,
                valid_until = EXCLUDED.valid_until,
                publish = EXCLUDED.publish,
                lifecycle_status = EXCLUDED.lifecycle_status
            "#,
        )
        .bind(bundle.id)
        .bind(&bundle.title)
        .bind(&bundle.description)
        .bind(bundle.price_nis)
        .bind(bundle.valid_until)
        .bind(bundle.publish)
        .bind(bundle.lifecycle_status.as_str())
        .bind(bundle.created_at)
        .execute(&mut *tx)
        .await
        .map_err(CoreError::storage)?;

        sqlx::query("DELETE FROM bundle_events WHERE bundle_id = $1")
            .bind(bundle.id)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::storage)?;

        let links = bundle
            .event_ids
            .iter()
            .map(|id| (id, "member"))
            .chain(bundle.replacement_event_ids.iter().map(|id| (id, "replacement")));
        for (position, (event_id, role)) in links.enumerate() {
            sqlx::query("INSERT INTO bundle_events (bundle_id, event_id, role, position) VALUES ($1, $2, $3, $4)")
                .bind(bundle.id)
                .bind(event_id)
                .bind(role)
                .bind(position as i32)
                .execute(&mut *tx)
                .await
                .map_err(CoreError::storage)?;
        }

        tx.commit().await.map_err(CoreError::storage)?;
        Ok(())
    }

    async fn update_bundle_status(
        &self,
        id: Uuid,
        publish: bool,
        status: BundleStatus,
    ) -> CoreResult<Option<BundleDefinition>> {
        let updated = sqlx::query("UPDATE bundles SET publish = $2, lifecycle_status = $3 WHERE id = $1")
            .bind(id)
            .bind(publish)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(CoreError::storage)?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_bundle(id).await
    }

    async fn expire_if_active(&self, id: Uuid) -> CoreResult<bool> {
        let updated = sqlx::query(
            "UPDATE bundles SET lifecycle_status = 'expired' WHERE id = $1 AND lifecycle_status = 'active'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        Ok(updated.rows_affected() == 1)
    }

    async fn get_events(&self, ids: &[Uuid]) -> CoreResult<Vec<EventRecord>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!("SELECT {} FROM events WHERE id = ANY($1)", EVENT_COLUMNS))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(CoreError::storage)?;

        rows.into_iter().map(EventRecord::try_from).collect()
    }

    async fn create_event(&self, event: &EventRecord) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO events (id, title, date, location, capacity, price_nis, lifecycle_status, registered_count)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(event.date)
        .bind(&event.location)
        .bind(to_db_count(event.capacity)?)
        .bind(event.price_nis)
        .bind(event.lifecycle_status.as_str())
        .bind(to_db_count(event.registered_count)?)
        .execute(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        Ok(())
    }

    async fn update_event_status(&self, id: Uuid, status: EventStatus) -> CoreResult<Option<EventRecord>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "UPDATE events SET lifecycle_status = $2 WHERE id = $1 RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        row.map(EventRecord::try_from).transpose()
    }
}
