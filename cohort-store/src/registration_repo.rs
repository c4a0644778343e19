use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cohort_core::payment::PaymentState;
use cohort_core::{CoreError, CoreResult};
use cohort_order::{
    BundleRegistration, BuyerInstructions, CommitOutcome, EventRegistrationEntry, RegistrationRepository,
    SkippedEventEntry,
};
use cohort_shared::pii::Masked;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

const REGISTRATION_COLUMNS: &str = "id, bundle_id, buyer_id, buyer_email, created_at, payment_status, amount_paid, \
     payment_date, amount_due_nis, event_registrations, skipped_events, pickup, medical, notes";

/// Seats are claimed with a conditional increment inside the same transaction
/// that inserts the registration.
const CLAIM_SEAT: &str = "UPDATE events SET registered_count = registered_count + 1 \
     WHERE id = $1 AND lifecycle_status = 'active' AND registered_count < capacity";

pub struct PgRegistrationRepository {
    pool: PgPool,
}

impl PgRegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RegistrationRow {
    id: Uuid,
    bundle_id: Uuid,
    buyer_id: String,
    buyer_email: Option<String>,
    created_at: DateTime<Utc>,
    payment_status: String,
    amount_paid: Option<i64>,
    payment_date: Option<DateTime<Utc>>,
    amount_due_nis: i64,
    event_registrations: Json<Vec<EventRegistrationEntry>>,
    skipped_events: Json<Vec<SkippedEventEntry>>,
    pickup: Option<String>,
    medical: Option<String>,
    notes: Option<String>,
}

impl TryFrom<RegistrationRow> for BundleRegistration {
    type Error = CoreError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        let payment = PaymentState::from_columns(&row.payment_status, row.amount_paid, row.payment_date)
            .map_err(CoreError::storage)?;
        Ok(BundleRegistration {
            id: row.id,
            bundle_id: row.bundle_id,
            buyer_id: row.buyer_id,
            buyer_email: row.buyer_email,
            created_at: row.created_at,
            payment,
            amount_due_nis: row.amount_due_nis,
            event_registrations: row.event_registrations.0,
            skipped_events: row.skipped_events.0,
            instructions: BuyerInstructions {
                pickup: row.pickup,
                medical: row.medical.map(Masked),
                notes: row.notes,
            },
        })
    }
}

#[async_trait]
impl RegistrationRepository for PgRegistrationRepository {
    async fn find_active(&self, buyer_id: &str, bundle_id: Uuid) -> CoreResult<Option<BundleRegistration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {} FROM bundle_registrations \
             WHERE buyer_id = $1 AND bundle_id = $2 AND payment_status IN ('pending', 'paid', 'free') \
             ORDER BY created_at DESC LIMIT 1",
            REGISTRATION_COLUMNS
        ))
        .bind(buyer_id)
        .bind(bundle_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        row.map(BundleRegistration::try_from).transpose()
    }

    async fn get_registration(&self, id: Uuid) -> CoreResult<Option<BundleRegistration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {} FROM bundle_registrations WHERE id = $1",
            REGISTRATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        row.map(BundleRegistration::try_from).transpose()
    }

    async fn list_for_bundle(&self, bundle_id: Uuid) -> CoreResult<Vec<BundleRegistration>> {
        let rows = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {} FROM bundle_registrations WHERE bundle_id = $1 ORDER BY created_at",
            REGISTRATION_COLUMNS
        ))
        .bind(bundle_id)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        rows.into_iter().map(BundleRegistration::try_from).collect()
    }

    async fn commit(&self, registration: &BundleRegistration, claims: &[Uuid]) -> CoreResult<CommitOutcome> {
        let mut tx = self.pool.begin().await.map_err(CoreError::storage)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO bundle_registrations (
                id, bundle_id, buyer_id, buyer_email, created_at, payment_status, amount_paid, payment_date,
                amount_due_nis, event_registrations, skipped_events, pickup, medical, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(registration.id)
        .bind(registration.bundle_id)
        .bind(&registration.buyer_id)
        .bind(&registration.buyer_email)
        .bind(registration.created_at)
        .bind(registration.payment_status().as_str())
        .bind(registration.payment.amount_paid())
        .bind(registration.payment.payment_date())
        .bind(registration.amount_due_nis)
        .bind(Json(&registration.event_registrations))
        .bind(Json(&registration.skipped_events))
        .bind(&registration.instructions.pickup)
        .bind(registration.instructions.medical.as_ref().map(|m| m.expose().as_str()))
        .bind(&registration.instructions.notes)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                tx.rollback().await.map_err(CoreError::storage)?;
                let existing = self
                    .find_active(&registration.buyer_id, registration.bundle_id)
                    .await?
                    .ok_or_else(|| CoreError::StorageError("active registration vanished after unique violation".into()))?;
                return Ok(CommitOutcome::DuplicateActive(existing));
            }
            Err(e) => return Err(CoreError::storage(e)),
        }

        // Fixed lock order across concurrent commits.
        let mut ordered = claims.to_vec();
        ordered.sort();

        let mut conflicted = Vec::new();
        for event_id in &ordered {
            let claimed = sqlx::query(CLAIM_SEAT)
                .bind(event_id)
                .execute(&mut *tx)
                .await
                .map_err(CoreError::storage)?;
            if claimed.rows_affected() == 0 {
                conflicted.push(*event_id);
            }
        }

        if !conflicted.is_empty() {
            tx.rollback().await.map_err(CoreError::storage)?;
            return Ok(CommitOutcome::CapacityConflict(conflicted));
        }

        tx.commit().await.map_err(CoreError::storage)?;
        Ok(CommitOutcome::Committed)
    }

    async fn update_payment(&self, id: Uuid, payment: &PaymentState) -> CoreResult<Option<BundleRegistration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "UPDATE bundle_registrations SET payment_status = $2, amount_paid = $3, payment_date = $4 \
             WHERE id = $1 RETURNING {}",
            REGISTRATION_COLUMNS
        ))
        .bind(id)
        .bind(payment.status().as_str())
        .bind(payment.amount_paid())
        .bind(payment.payment_date())
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::storage)?;

        row.map(BundleRegistration::try_from).transpose()
    }
}
