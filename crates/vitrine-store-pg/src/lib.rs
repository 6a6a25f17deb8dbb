//! # vitrine-store-pg
//!
//! Postgres implementations of [`DashboardStore`] and
//! [`PublicDashboardStore`] over a shared `sqlx` pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{Arguments, PgPool, Row};
use tracing::info;
use vitrine_core::{Dashboard, PublicDashboard, StoreConfig, TimeSettings};
use vitrine_service::{DashboardStore, PublicDashboardStore};

pub mod schema;

pub use schema::ensure_schema;

const PUBLIC_DASHBOARD_COLUMNS: &str = "uid, dashboard_uid, org_id, access_token, is_enabled, \
     annotations_enabled, time_settings, created_by, created_at, updated_by, updated_at";

/// Open a pool from `config`.
pub async fn connect(config: &StoreConfig) -> anyhow::Result<PgPool> {
    let url = config
        .connection_string()
        .ok_or_else(|| {
            anyhow::anyhow!("No database URL configured (store.database_url or store.database_url_env)")
        })?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&url)
        .await?;
    info!(max_connections = config.max_connections, "Connected to Postgres");
    Ok(pool)
}

/// Both stores over one pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the tables exist.
    pub async fn connect(config: &StoreConfig) -> anyhow::Result<Self> {
        let pool = connect(config).await?;
        ensure_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_public_dashboard(
        &self,
        filter: &str,
        args: PgArguments,
    ) -> anyhow::Result<Option<PublicDashboard>> {
        let sql = format!(
            "SELECT {PUBLIC_DASHBOARD_COLUMNS} FROM dashboard_public WHERE {filter} LIMIT 1"
        );
        let row = sqlx::query_with(&sql, args)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(public_dashboard_from_row).transpose()
    }
}

fn args_add<T>(args: &mut PgArguments, v: T) -> anyhow::Result<()>
where
    T: Send + Sync + 'static,
    for<'q> T: sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    args.add(v).map_err(|e| anyhow::anyhow!(e))
}

fn encode_time_settings(settings: &TimeSettings) -> anyhow::Result<String> {
    Ok(serde_json::to_string(settings)?)
}

/// Empty and `null` values read as unset.
fn decode_time_settings(raw: &str) -> anyhow::Result<TimeSettings> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(TimeSettings::default());
    }
    serde_json::from_str(trimmed)
        .map_err(|e| anyhow::anyhow!("Malformed time_settings '{}': {}", trimmed, e))
}

fn public_dashboard_from_row(row: &PgRow) -> anyhow::Result<PublicDashboard> {
    let time_settings: String = row.try_get("time_settings")?;
    Ok(PublicDashboard {
        uid: row.try_get("uid")?,
        dashboard_uid: row.try_get("dashboard_uid")?,
        org_id: row.try_get("org_id")?,
        access_token: row.try_get("access_token")?,
        is_enabled: row.try_get("is_enabled")?,
        annotations_enabled: row.try_get("annotations_enabled")?,
        time_settings: decode_time_settings(&time_settings)?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_by: row.try_get("updated_by")?,
        updated_at: row.try_get::<Option<DateTime<Utc>>, _>("updated_at")?,
    })
}

fn dashboard_from_row(row: &PgRow) -> anyhow::Result<Dashboard> {
    let data: Json<Value> = row.try_get("data")?;
    Ok(Dashboard {
        id: row.try_get("id")?,
        uid: row.try_get("uid")?,
        org_id: row.try_get("org_id")?,
        title: row.try_get("title")?,
        data: data.0,
    })
}

#[async_trait]
impl DashboardStore for PgStore {
    async fn find_dashboard(&self, org_id: i64, uid: &str) -> anyhow::Result<Option<Dashboard>> {
        let row = sqlx::query(
            "SELECT id, org_id, uid, title, data FROM dashboard WHERE org_id = $1 AND uid = $2",
        )
        .bind(org_id)
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(dashboard_from_row).transpose()
    }

    async fn save_dashboard(&self, dashboard: Dashboard) -> anyhow::Result<Dashboard> {
        let row = sqlx::query(
            "INSERT INTO dashboard (org_id, uid, title, data) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (org_id, uid) DO UPDATE SET title = EXCLUDED.title, data = EXCLUDED.data \
             RETURNING id",
        )
        .bind(dashboard.org_id)
        .bind(&dashboard.uid)
        .bind(&dashboard.title)
        .bind(Json(dashboard.data.clone()))
        .fetch_one(&self.pool)
        .await?;
        let id: i64 = row.try_get("id")?;
        Ok(dashboard.with_id(id))
    }
}

#[async_trait]
impl PublicDashboardStore for PgStore {
    async fn find(&self, uid: &str) -> anyhow::Result<Option<PublicDashboard>> {
        let mut args = PgArguments::default();
        args_add(&mut args, uid.to_string())?;
        self.fetch_public_dashboard("uid = $1", args).await
    }

    async fn find_by_access_token(
        &self,
        access_token: &str,
    ) -> anyhow::Result<Option<PublicDashboard>> {
        let mut args = PgArguments::default();
        args_add(&mut args, access_token.to_string())?;
        self.fetch_public_dashboard("access_token = $1", args).await
    }

    async fn find_by_dashboard_uid(
        &self,
        org_id: i64,
        dashboard_uid: &str,
    ) -> anyhow::Result<Option<PublicDashboard>> {
        let mut args = PgArguments::default();
        args_add(&mut args, org_id)?;
        args_add(&mut args, dashboard_uid.to_string())?;
        self.fetch_public_dashboard("org_id = $1 AND dashboard_uid = $2", args)
            .await
    }

    async fn find_all(&self, org_id: i64) -> anyhow::Result<Vec<PublicDashboard>> {
        let sql =
            format!("SELECT {PUBLIC_DASHBOARD_COLUMNS} FROM dashboard_public WHERE org_id = $1");
        let rows = sqlx::query(&sql).bind(org_id).fetch_all(&self.pool).await?;
        rows.iter().map(public_dashboard_from_row).collect()
    }

    async fn save(&self, public_dashboard: &PublicDashboard) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO dashboard_public (uid, dashboard_uid, org_id, access_token, is_enabled, \
             annotations_enabled, time_settings, created_by, created_at, updated_by, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(&public_dashboard.uid)
        .bind(&public_dashboard.dashboard_uid)
        .bind(public_dashboard.org_id)
        .bind(&public_dashboard.access_token)
        .bind(public_dashboard.is_enabled)
        .bind(public_dashboard.annotations_enabled)
        .bind(encode_time_settings(&public_dashboard.time_settings)?)
        .bind(public_dashboard.created_by)
        .bind(public_dashboard.created_at)
        .bind(public_dashboard.updated_by)
        .bind(public_dashboard.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update(&self, public_dashboard: &PublicDashboard) -> anyhow::Result<()> {
        let result = sqlx::query(
            "UPDATE dashboard_public SET is_enabled = $2, annotations_enabled = $3, \
             time_settings = $4, updated_by = $5, updated_at = $6 WHERE uid = $1",
        )
        .bind(&public_dashboard.uid)
        .bind(public_dashboard.is_enabled)
        .bind(public_dashboard.annotations_enabled)
        .bind(encode_time_settings(&public_dashboard.time_settings)?)
        .bind(public_dashboard.updated_by)
        .bind(public_dashboard.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("public dashboard {} does not exist", public_dashboard.uid);
        }
        Ok(())
    }

    async fn exists_enabled_by_access_token(&self, access_token: &str) -> anyhow::Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM dashboard_public WHERE access_token = $1 AND is_enabled) AS found",
        )
        .bind(access_token)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("found")?)
    }

    async fn exists_enabled_by_dashboard_uid(
        &self,
        org_id: i64,
        dashboard_uid: &str,
    ) -> anyhow::Result<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM dashboard_public \
             WHERE org_id = $1 AND dashboard_uid = $2 AND is_enabled) AS found",
        )
        .bind(org_id)
        .bind(dashboard_uid)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("found")?)
    }

    async fn get_org_id_by_access_token(&self, access_token: &str) -> anyhow::Result<Option<i64>> {
        let row = sqlx::query(
            "SELECT org_id FROM dashboard_public WHERE access_token = $1 AND is_enabled",
        )
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.try_get::<i64, _>("org_id")).transpose()?)
    }
}
