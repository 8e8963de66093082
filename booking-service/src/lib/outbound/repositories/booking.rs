use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::booking::errors::BookingError;
use crate::domain::booking::models::Booking;
use crate::domain::booking::models::BookingId;
use crate::domain::booking::models::BookingStatus;
use crate::domain::booking::ports::BookingRepository;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::UserId;

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    customer_id: Uuid,
    customer_email: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = BookingError;

    fn try_from(r: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: BookingId(r.id),
            customer_id: UserId(r.customer_id),
            customer_email: EmailAddress::new(r.customer_email)
                .map_err(|e| BookingError::DatabaseError(e.to_string()))?,
            start_time: r.start_time,
            end_time: r.end_time,
            status: r.status.parse()?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

pub struct PostgresBookingRepository {
    pool: PgPool,
}

impl PostgresBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    async fn find_by_id(&self, id: &BookingId) -> Result<Option<Booking>, BookingError> {
        let row: Option<BookingRow> = sqlx::query_as(
            r#"
            SELECT b.id, b.customer_id, u.email AS customer_email, b.start_time, b.end_time,
                   b.status, b.created_at, b.updated_at
            FROM bookings b
            JOIN users u ON u.id = b.customer_id
            WHERE b.id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        row.map(Booking::try_from).transpose()
    }

    async fn insert(&self, booking: Booking) -> Result<Booking, BookingError> {
        sqlx::query(
            r#"
            INSERT INTO bookings (id, customer_id, start_time, end_time, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(booking.id.0)
        .bind(booking.customer_id.0)
        .bind(booking.start_time)
        .bind(booking.end_time)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        Ok(booking)
    }

    async fn transition(
        &self,
        id: &BookingId,
        from: BookingStatus,
        to: BookingStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, BookingError> {
        let result = sqlx::query(
            "UPDATE bookings SET status = $3, updated_at = $4 WHERE id = $1 AND status = $2",
        )
        .bind(id.0)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }
}
