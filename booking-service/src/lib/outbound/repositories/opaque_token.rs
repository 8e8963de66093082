use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::token::errors::OpaqueTokenError;
use crate::domain::token::models::OpaqueToken;
use crate::domain::token::models::OwnerId;
use crate::domain::token::models::TokenPurpose;
use crate::domain::token::ports::OpaqueTokenRepository;

const SELECT_TOKEN: &str = r#"
    SELECT id, token_hash, purpose, owner_id, issued_at, expires_at, consumed_at
    FROM opaque_tokens
"#;

#[derive(FromRow)]
struct OpaqueTokenRow {
    id: Uuid,
    token_hash: String,
    purpose: String,
    owner_id: Uuid,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
}

impl TryFrom<OpaqueTokenRow> for OpaqueToken {
    type Error = OpaqueTokenError;

    fn try_from(r: OpaqueTokenRow) -> Result<Self, Self::Error> {
        Ok(OpaqueToken {
            id: r.id,
            token_hash: r.token_hash,
            purpose: r.purpose.parse()?,
            owner: OwnerId(r.owner_id),
            issued_at: r.issued_at,
            expires_at: r.expires_at,
            consumed_at: r.consumed_at,
        })
    }
}

fn database_error(e: sqlx::Error) -> OpaqueTokenError {
    OpaqueTokenError::DatabaseError(e.to_string())
}

pub struct PostgresOpaqueTokenRepository {
    pool: PgPool,
}

impl PostgresOpaqueTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OpaqueTokenRepository for PostgresOpaqueTokenRepository {
    async fn insert(&self, token: OpaqueToken) -> Result<(), OpaqueTokenError> {
        sqlx::query(
            r#"
            INSERT INTO opaque_tokens (id, token_hash, purpose, owner_id, issued_at, expires_at, consumed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token.id)
        .bind(&token.token_hash)
        .bind(token.purpose.as_str())
        .bind(token.owner.0)
        .bind(token.issued_at)
        .bind(token.expires_at)
        .bind(token.consumed_at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<OpaqueToken>, OpaqueTokenError> {
        let row: Option<OpaqueTokenRow> =
            sqlx::query_as(&format!("{} WHERE token_hash = $1", SELECT_TOKEN))
                .bind(token_hash)
                .fetch_optional(&self.pool)
                .await
                .map_err(database_error)?;

        row.map(OpaqueToken::try_from).transpose()
    }

    async fn mark_consumed(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, OpaqueTokenError> {
        let result = sqlx::query(
            "UPDATE opaque_tokens SET consumed_at = $2 WHERE id = $1 AND consumed_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(database_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_for_owner(
        &self,
        purpose: TokenPurpose,
        owner: OwnerId,
    ) -> Result<u64, OpaqueTokenError> {
        let result = sqlx::query("DELETE FROM opaque_tokens WHERE purpose = $1 AND owner_id = $2")
            .bind(purpose.as_str())
            .bind(owner.0)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        Ok(result.rows_affected())
    }

    async fn find_live_for_owner(
        &self,
        purpose: TokenPurpose,
        owner: OwnerId,
        now: DateTime<Utc>,
    ) -> Result<Vec<OpaqueToken>, OpaqueTokenError> {
        let rows: Vec<OpaqueTokenRow> = sqlx::query_as(&format!(
            "{} WHERE purpose = $1 AND owner_id = $2 AND consumed_at IS NULL AND expires_at > $3 \
             ORDER BY issued_at DESC",
            SELECT_TOKEN
        ))
        .bind(purpose.as_str())
        .bind(owner.0)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.into_iter().map(OpaqueToken::try_from).collect()
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> Result<u64, OpaqueTokenError> {
        let result = sqlx::query("DELETE FROM opaque_tokens WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;

        Ok(result.rows_affected())
    }
}
