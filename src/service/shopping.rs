//! Application acceptance.

use crate::error::AppError;
use sqlx::PgPool;

/// Mark an application accepted. Accepting twice keeps the first timestamp.
pub async fn accept_application(pool: &PgPool, id: i64) -> Result<(), AppError> {
    let sql = r#"UPDATE "applications" SET "is_accepted" = TRUE, "accepted_at" = COALESCE("accepted_at", NOW()) WHERE "id" = $1 RETURNING "id""#;
    tracing::debug!(sql = %sql, id, "query");
    sqlx::query_scalar::<_, i64>(sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("applications {}", id)))?;
    tracing::info!(id, "application accepted");
    Ok(())
}
