//! PostgreSQL-backed organisation store.
//!
//! One row per installed integration instance, upserted on conflict by
//! organisation id. A re-install rewrites the row and refreshes
//! `created_at`, which is what invalidates stale continuation chains.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use elba_connector::error::{ConnectorError, ConnectorResult};
use elba_connector::organisation::Organisation;
use elba_connector::traits::OrganisationStore;

/// Attributes written on install or re-auth.
#[derive(Debug, Clone)]
pub struct NewOrganisation {
    pub id: Uuid,
    pub vendor: String,
    pub region: String,
    pub credentials_encrypted: Vec<u8>,
    pub credentials_key_version: i32,
    pub routing: serde_json::Value,
}

/// Store over the `organisations` table.
#[derive(Debug, Clone)]
pub struct PgOrganisationStore {
    pool: PgPool,
}

impl PgOrganisationStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the table DDL. Idempotent.
    pub async fn migrate(&self) -> ConnectorResult<()> {
        for statement in [
            r"
            CREATE TABLE IF NOT EXISTS organisations (
                id UUID PRIMARY KEY,
                vendor VARCHAR(64) NOT NULL,
                region VARCHAR(32) NOT NULL,
                credentials_encrypted BYTEA NOT NULL,
                credentials_key_version INT NOT NULL DEFAULT 1,
                routing JSONB NOT NULL DEFAULT '{}'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            ",
            r"
            CREATE INDEX IF NOT EXISTS organisations_vendor_idx
                ON organisations (vendor)
            ",
        ] {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_error)?;
        }
        Ok(())
    }

    /// Create or replace the organisation row.
    ///
    /// At most one row per organisation id; an existing row (re-install or
    /// re-auth) is fully replaced and its `created_at` refreshed.
    #[instrument(skip(self, organisation), fields(organisation_id = %organisation.id))]
    pub async fn upsert(&self, organisation: &NewOrganisation) -> ConnectorResult<Organisation> {
        let row = sqlx::query_as::<_, OrganisationRow>(
            r"
            INSERT INTO organisations (
                id, vendor, region, credentials_encrypted, credentials_key_version, routing
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                vendor = EXCLUDED.vendor,
                region = EXCLUDED.region,
                credentials_encrypted = EXCLUDED.credentials_encrypted,
                credentials_key_version = EXCLUDED.credentials_key_version,
                routing = EXCLUDED.routing,
                created_at = NOW()
            RETURNING id, vendor, region, credentials_encrypted,
                      credentials_key_version, routing, created_at
            ",
        )
        .bind(organisation.id)
        .bind(&organisation.vendor)
        .bind(&organisation.region)
        .bind(&organisation.credentials_encrypted)
        .bind(organisation.credentials_key_version)
        .bind(&organisation.routing)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.into_organisation())
    }

    /// Remove the row on uninstall. Returns whether a row existed.
    #[instrument(skip(self))]
    pub async fn delete(&self, organisation_id: Uuid) -> ConnectorResult<bool> {
        let result = sqlx::query("DELETE FROM organisations WHERE id = $1")
            .bind(organisation_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    /// All organisation ids for one vendor, for the cron fan-out.
    #[instrument(skip(self))]
    pub async fn list_ids(&self, vendor: &str) -> ConnectorResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM organisations WHERE vendor = $1 ORDER BY created_at",
        )
        .bind(vendor)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(ids)
    }

    async fn fetch(&self, organisation_id: Uuid) -> ConnectorResult<Option<Organisation>> {
        let row = sqlx::query_as::<_, OrganisationRow>(
            r"
            SELECT id, vendor, region, credentials_encrypted,
                   credentials_key_version, routing, created_at
            FROM organisations
            WHERE id = $1
            ",
        )
        .bind(organisation_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(OrganisationRow::into_organisation))
    }
}

#[async_trait]
impl OrganisationStore for PgOrganisationStore {
    async fn get(&self, organisation_id: Uuid) -> ConnectorResult<Option<Organisation>> {
        self.fetch(organisation_id).await
    }
}

fn db_error(err: sqlx::Error) -> ConnectorError {
    ConnectorError::database_with_source("organisation store query failed", err)
}

/// Database row for an organisation.
#[derive(Debug, sqlx::FromRow)]
struct OrganisationRow {
    id: Uuid,
    vendor: String,
    region: String,
    credentials_encrypted: Vec<u8>,
    credentials_key_version: i32,
    routing: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl OrganisationRow {
    fn into_organisation(self) -> Organisation {
        Organisation {
            id: self.id,
            vendor: self.vendor,
            region: self.region,
            credentials_encrypted: self.credentials_encrypted,
            credentials_key_version: self.credentials_key_version,
            routing: self.routing,
            created_at: self.created_at,
        }
    }
}
