//! PostgreSQL implementation of BillingStore.
//!
//! Every write is a single `INSERT ... ON CONFLICT` statement, so concurrent
//! deliveries of the same webhook converge without explicit locking.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{
    Invoice, Payment, PaymentStatus, Subscription, SubscriptionSnapshot, SubscriptionStatus,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, InvoiceId, SubscriptionRecordId, Timestamp, UserId,
};
use crate::ports::BillingStore;

/// PostgreSQL implementation of the BillingStore port.
pub struct PostgresBillingStore {
    pool: PgPool,
}

impl PostgresBillingStore {
    /// Creates a new PostgresBillingStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    provider_payment_id: String,
    provider_order_id: Option<String>,
    amount: i64,
    currency: String,
    status: String,
    method: Option<String>,
    user_id: Option<String>,
    raw: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(Payment {
            provider_payment_id: row.provider_payment_id,
            provider_order_id: row.provider_order_id,
            amount: row.amount,
            currency: row.currency,
            status: PaymentStatus::parse(&row.status),
            method: row.method,
            user_id: parse_user_id(row.user_id)?,
            raw: row.raw,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    provider_subscription_id: String,
    status: String,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    user_id: Option<String>,
    autopay: bool,
    cancel_at: Option<DateTime<Utc>>,
    canceled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionRecordId::from_uuid(row.id),
            provider_subscription_id: row.provider_subscription_id,
            status: SubscriptionStatus::parse(&row.status),
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            user_id: parse_user_id(row.user_id)?,
            autopay: row.autopay,
            cancel_at: row.cancel_at.map(Timestamp::from_datetime),
            canceled_at: row.canceled_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: Uuid,
    idempotency_key: String,
    provider_subscription_id: String,
    user_id: Option<String>,
    amount: i64,
    currency: String,
    period_start: Option<DateTime<Utc>>,
    period_end: Option<DateTime<Utc>>,
    status: String,
    raw: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = DomainError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Invoice {
            id: InvoiceId::from_uuid(row.id),
            idempotency_key: row.idempotency_key,
            provider_subscription_id: row.provider_subscription_id,
            user_id: parse_user_id(row.user_id)?,
            amount: row.amount,
            currency: row.currency,
            period_start: row.period_start.map(Timestamp::from_datetime),
            period_end: row.period_end.map(Timestamp::from_datetime),
            status: row.status,
            raw: row.raw,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn parse_user_id(raw: Option<String>) -> Result<Option<UserId>, DomainError> {
    raw.map(|id| {
        UserId::new(id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
        })
    })
    .transpose()
}

fn db_error(operation: &str) -> impl FnOnce(sqlx::Error) -> DomainError + '_ {
    move |e| DomainError::database(format!("Failed to {}: {}", operation, e))
}

const SUBSCRIPTION_COLUMNS: &str = "id, provider_subscription_id, status, current_period_start, \
     current_period_end, user_id, autopay, cancel_at, canceled_at, created_at, updated_at";

#[async_trait]
impl BillingStore for PostgresBillingStore {
    async fn upsert_payment(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                provider_payment_id, provider_order_id, amount, currency, status,
                method, user_id, raw, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (provider_payment_id) DO UPDATE SET
                provider_order_id = COALESCE(EXCLUDED.provider_order_id, payments.provider_order_id),
                amount = EXCLUDED.amount,
                currency = EXCLUDED.currency,
                status = EXCLUDED.status,
                method = COALESCE(EXCLUDED.method, payments.method),
                user_id = COALESCE(EXCLUDED.user_id, payments.user_id),
                raw = COALESCE(EXCLUDED.raw, payments.raw),
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&payment.provider_payment_id)
        .bind(&payment.provider_order_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.method)
        .bind(payment.user_id.as_ref().map(|u| u.as_str()))
        .bind(&payment.raw)
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("upsert payment"))?;

        Ok(())
    }

    async fn find_payment(&self, provider_payment_id: &str) -> Result<Option<Payment>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT provider_payment_id, provider_order_id, amount, currency, status,
                   method, user_id, raw, created_at, updated_at
            FROM payments
            WHERE provider_payment_id = $1
            "#,
        )
        .bind(provider_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find payment"))?;

        row.map(Payment::try_from).transpose()
    }

    async fn upsert_subscription(
        &self,
        snapshot: &SubscriptionSnapshot,
    ) -> Result<Subscription, DomainError> {
        let now = Timestamp::now();
        let sql = format!(
            r#"
            INSERT INTO subscriptions (
                id, provider_subscription_id, status, current_period_start,
                current_period_end, user_id, autopay, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            ON CONFLICT (provider_subscription_id) DO UPDATE SET
                status = CASE
                    WHEN subscriptions.status = 'canceled' THEN subscriptions.status
                    ELSE EXCLUDED.status
                END,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                user_id = COALESCE(EXCLUDED.user_id, subscriptions.user_id),
                autopay = EXCLUDED.autopay,
                updated_at = EXCLUDED.updated_at
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        );

        let row: SubscriptionRow = sqlx::query_as(&sql)
            .bind(*SubscriptionRecordId::new().as_uuid())
            .bind(&snapshot.provider_subscription_id)
            .bind(snapshot.status.as_str())
            .bind(snapshot.current_period_start.map(|t| *t.as_datetime()))
            .bind(snapshot.current_period_end.map(|t| *t.as_datetime()))
            .bind(snapshot.user_id.as_ref().map(|u| u.as_str()))
            .bind(snapshot.autopay)
            .bind(now.as_datetime())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("upsert subscription"))?;

        Subscription::try_from(row)
    }

    async fn mark_subscription_canceled(
        &self,
        provider_subscription_id: &str,
        canceled_at: Timestamp,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = 'canceled',
                canceled_at = $2,
                updated_at = $2
            WHERE provider_subscription_id = $1
            "#,
        )
        .bind(provider_subscription_id)
        .bind(canceled_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("cancel subscription"))?;

        Ok(result.rows_affected())
    }

    async fn record_cancellation(
        &self,
        id: SubscriptionRecordId,
        cancel_at: Timestamp,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = 'canceled',
                cancel_at = $2,
                updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(cancel_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("record cancellation"))?;

        Ok(())
    }

    async fn upsert_invoice(&self, invoice: &Invoice) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, idempotency_key, provider_subscription_id, user_id, amount,
                currency, period_start, period_end, status, raw, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(invoice.id.as_uuid())
        .bind(&invoice.idempotency_key)
        .bind(&invoice.provider_subscription_id)
        .bind(invoice.user_id.as_ref().map(|u| u.as_str()))
        .bind(invoice.amount)
        .bind(&invoice.currency)
        .bind(invoice.period_start.map(|t| *t.as_datetime()))
        .bind(invoice.period_end.map(|t| *t.as_datetime()))
        .bind(&invoice.status)
        .bind(&invoice.raw)
        .bind(invoice.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_error("upsert invoice"))?;

        Ok(())
    }

    async fn latest_subscription_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC LIMIT 1",
            SUBSCRIPTION_COLUMNS
        );

        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find subscription"))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn invoices_for_user(&self, user_id: &UserId) -> Result<Vec<Invoice>, DomainError> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT id, idempotency_key, provider_subscription_id, user_id, amount,
                   currency, period_start, period_end, status, raw, created_at
            FROM invoices
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list invoices"))?;

        rows.into_iter().map(Invoice::try_from).collect()
    }
}
