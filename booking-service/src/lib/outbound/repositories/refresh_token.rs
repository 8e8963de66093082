use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::session::errors::SessionError;
use crate::domain::session::models::LineageId;
use crate::domain::session::models::RefreshTokenId;
use crate::domain::session::models::RefreshTokenRecord;
use crate::domain::session::ports::RefreshTokenRepository;
use crate::domain::user::models::UserId;

#[derive(FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    lineage_id: Uuid,
    token_hash: String,
    user_id: Uuid,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
    revoked_at: Option<DateTime<Utc>>,
    predecessor_id: Option<Uuid>,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(r: RefreshTokenRow) -> Self {
        RefreshTokenRecord {
            id: RefreshTokenId(r.id),
            lineage_id: LineageId(r.lineage_id),
            token_hash: r.token_hash,
            user_id: UserId(r.user_id),
            issued_at: r.issued_at,
            expires_at: r.expires_at,
            consumed_at: r.consumed_at,
            revoked_at: r.revoked_at,
            predecessor_id: r.predecessor_id.map(RefreshTokenId),
        }
    }
}

fn database_error(e: sqlx::Error) -> SessionError {
    SessionError::DatabaseError(e.to_string())
}

pub struct PostgresRefreshTokenRepository {
    pool: PgPool,
}

impl PostgresRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_record<'e, E>(executor: E, record: &RefreshTokenRecord) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens
            (id, lineage_id, token_hash, user_id, issued_at, expires_at, consumed_at, revoked_at, predecessor_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(record.id.0)
    .bind(record.lineage_id.0)
    .bind(&record.token_hash)
    .bind(record.user_id.0)
    .bind(record.issued_at)
    .bind(record.expires_at)
    .bind(record.consumed_at)
    .bind(record.revoked_at)
    .bind(record.predecessor_id.map(|id| id.0))
    .execute(executor)
    .await
    .map(|_| ())
}

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    async fn insert(&self, record: RefreshTokenRecord) -> Result<(), SessionError> {
        insert_record(&self.pool, &record)
            .await
            .map_err(database_error)
    }

    async fn find_by_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshTokenRecord>, SessionError> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            r#"
            SELECT id, lineage_id, token_hash, user_id, issued_at, expires_at,
                   consumed_at, revoked_at, predecessor_id
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(row.map(RefreshTokenRecord::from))
    }

    async fn rotate(
        &self,
        current: &RefreshTokenId,
        successor: RefreshTokenRecord,
        at: DateTime<Utc>,
    ) -> Result<bool, SessionError> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;

        let consumed = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET consumed_at = $2
            WHERE id = $1 AND consumed_at IS NULL AND revoked_at IS NULL
            "#,
        )
        .bind(current.0)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(database_error)?;

        if consumed.rows_affected() == 0 {
            tx.rollback().await.map_err(database_error)?;
            return Ok(false);
        }

        insert_record(&mut *tx, &successor)
            .await
            .map_err(database_error)?;
        tx.commit().await.map_err(database_error)?;

        Ok(true)
    }

    async fn revoke_lineage(
        &self,
        lineage_id: &LineageId,
        at: DateTime<Utc>,
    ) -> Result<u64, SessionError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 WHERE lineage_id = $1 AND revoked_at IS NULL",
        )
        .bind(lineage_id.0)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(result.rows_affected())
    }

    async fn revoke_all_for_user(
        &self,
        user_id: &UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, SessionError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = $2 WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id.0)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(result.rows_affected())
    }

    async fn count_active_for_user(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<u64, SessionError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM refresh_tokens
            WHERE user_id = $1 AND consumed_at IS NULL AND revoked_at IS NULL AND expires_at > $2
            "#,
        )
        .bind(user_id.0)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(count as u64)
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        Ok(result.rows_affected())
    }
}
