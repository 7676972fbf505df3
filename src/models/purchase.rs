use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;

use super::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentState {
    Pending,
    Validated,
    Rejected,
}

impl PaymentState {
    /// Only a pending payment can be settled, in either direction.
    pub fn can_transition_to(self, next: PaymentState) -> bool {
        matches!(
            (self, next),
            (PaymentState::Pending, PaymentState::Validated) | (PaymentState::Pending, PaymentState::Rejected)
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Purchase{
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub amount_paid: Decimal,
    pub state: PaymentState,
    pub purchased_at: DateTime<Utc>,
}

impl Purchase {
    pub fn is_validated(&self) -> bool {
        self.state == PaymentState::Validated
    }
}

#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub student_id: i64,
    pub course_id: i64,
    pub amount_paid: Decimal,
    pub state: PaymentState,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PurchaseFilter {
    pub student_id: Option<i64>,
    pub course_id: Option<i64>,
    pub state: Option<PaymentState>,
}

#[async_trait]
pub trait PurchaseStore: Send + Sync {
    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase, StoreError>;
    async fn find_purchase(&self, id: i64) -> Result<Option<Purchase>, StoreError>;
    async fn find_purchase_for(&self, student_id: i64, course_id: i64) -> Result<Option<Purchase>, StoreError>;
    async fn list_purchases(&self, filter: PurchaseFilter) -> Result<Vec<Purchase>, StoreError>;
    /// Moves a purchase from `from` to `to`. Returns `None` when the row is not in state `from`.
    async fn transition_purchase(&self, id: i64, from: PaymentState, to: PaymentState) -> Result<Option<Purchase>, StoreError>;
}

#[async_trait]
impl PurchaseStore for PgStore {
    async fn create_purchase(&self, purchase: NewPurchase) -> Result<Purchase, StoreError> {
        let result = sqlx::query_as::<_, Purchase>(
            r#"
                INSERT INTO purchases (student_id, course_id, amount_paid, state)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            "#,
        )
        .bind(purchase.student_id)
        .bind(purchase.course_id)
        .bind(purchase.amount_paid)
        .bind(purchase.state)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn find_purchase(&self, id: i64) -> Result<Option<Purchase>, StoreError> {
        let result = sqlx::query_as::<_, Purchase>("SELECT * FROM purchases WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(result)
    }

    async fn find_purchase_for(&self, student_id: i64, course_id: i64) -> Result<Option<Purchase>, StoreError> {
        let result = sqlx::query_as::<_, Purchase>(
            "SELECT * FROM purchases WHERE student_id = $1 AND course_id = $2",
        )
        .bind(student_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }

    async fn list_purchases(&self, filter: PurchaseFilter) -> Result<Vec<Purchase>, StoreError> {
        let result = sqlx::query_as::<_, Purchase>(
            r#"
                SELECT * FROM purchases
                WHERE ($1::BIGINT IS NULL OR student_id = $1)
                  AND ($2::BIGINT IS NULL OR course_id = $2)
                  AND ($3::payment_state IS NULL OR state = $3)
                ORDER BY purchased_at DESC, id DESC
            "#,
        )
        .bind(filter.student_id)
        .bind(filter.course_id)
        .bind(filter.state)
        .fetch_all(&self.pool)
        .await?;

        Ok(result)
    }

    async fn transition_purchase(&self, id: i64, from: PaymentState, to: PaymentState) -> Result<Option<Purchase>, StoreError> {
        let result = sqlx::query_as::<_, Purchase>(
            "UPDATE purchases SET state = $3 WHERE id = $1 AND state = $2 RETURNING *",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        Ok(result)
    }
}
