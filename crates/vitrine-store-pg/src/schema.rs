//! Table definitions.
//!
//! `dashboard_public.time_settings` holds the serialized JSON of
//! `{"from": ..., "to": ...}` as text, `{}` when unset.

use sqlx::PgPool;
use tracing::debug;

const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS dashboard (
        id BIGSERIAL PRIMARY KEY,
        org_id BIGINT NOT NULL,
        uid VARCHAR(40) NOT NULL,
        title TEXT NOT NULL DEFAULT '',
        data JSONB NOT NULL,
        UNIQUE (org_id, uid)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS dashboard_public (
        uid VARCHAR(40) PRIMARY KEY,
        dashboard_uid VARCHAR(40) NOT NULL,
        org_id BIGINT NOT NULL,
        access_token VARCHAR(32) NOT NULL UNIQUE,
        is_enabled BOOLEAN NOT NULL DEFAULT FALSE,
        annotations_enabled BOOLEAN NOT NULL DEFAULT FALSE,
        time_settings TEXT NOT NULL DEFAULT '{}',
        created_by BIGINT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        updated_by BIGINT,
        updated_at TIMESTAMPTZ
    )"#,
    r#"CREATE INDEX IF NOT EXISTS dashboard_public_org_dashboard
        ON dashboard_public (org_id, dashboard_uid)"#,
];

/// Create the tables when missing. Safe to run on every start.
pub async fn ensure_schema(pool: &PgPool) -> anyhow::Result<()> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    debug!("Vitrine schema ready");
    Ok(())
}
