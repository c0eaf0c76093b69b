//! PostgreSQL backend.
//!
//! Every operation runs inside the single transaction opened by
//! [`PgBackend::begin`]. Schema names are interpolated, everything else is
//! bound.

use async_trait::async_trait;
use pgshape_core::SqlModel;
use pgshape_core::migrations::{LiveColumn, LiveIndex};
use sqlx::postgres::{PgPool, Postgres};
use sqlx::Transaction;
use tracing::debug;

use crate::backend::SchemaBackend;
use crate::error::{MigrateError, Result};

/// Name of the snapshot table in every namespace.
pub const CONFIG_TABLE: &str = "_config";

/// Name of the named-step table in every namespace.
pub const STEPS_TABLE: &str = "_migrations";

const COLUMNS_SQL: &str = "SELECT column_name::text, udt_name::text, is_nullable::text, \
    character_maximum_length::int4, numeric_precision::int4, numeric_precision_radix::int4 \
    FROM information_schema.columns WHERE table_name = $1 AND table_schema = $2";

const INDEXES_SQL: &str = "SELECT i.relname::text, idx.indrelid::regclass::text, \
    to_jsonb(ARRAY(SELECT pg_get_indexdef(idx.indexrelid, k + 1, true) \
    FROM generate_subscripts(idx.indkey, 1) AS k ORDER BY k))::text, ns.nspname::text \
    FROM pg_index AS idx \
    JOIN pg_class AS i ON i.oid = idx.indexrelid \
    JOIN pg_namespace AS ns ON ns.oid = i.relnamespace \
    WHERE NOT idx.indisprimary AND idx.indrelid = to_regclass($1) \
    ORDER BY i.relname";

/// Returns the statements creating a namespace and its bookkeeping tables.
#[must_use]
pub fn ensure_schema_sql(schema: &str) -> [String; 3] {
    [
        format!("CREATE SCHEMA IF NOT EXISTS {schema}"),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.{CONFIG_TABLE} (table_name VARCHAR(250) NOT NULL, storej JSONB NULL, PRIMARY KEY (table_name))"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {schema}.{STEPS_TABLE} (name VARCHAR(250) NOT NULL, PRIMARY KEY (name))"
        ),
    ]
}

type ColumnRow = (String, String, String, Option<i32>, Option<i32>, Option<i32>);

/// A [`SchemaBackend`] over one PostgreSQL transaction.
pub struct PgBackend {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgBackend {
    /// Opens a transaction on the pool.
    pub async fn begin(pool: &PgPool) -> Result<Self> {
        let tx = pool.begin().await?;
        Ok(Self { tx: Some(tx) })
    }

    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        self.tx.as_mut().ok_or(MigrateError::NoTransaction)
    }

    fn decode_snapshot(table: String, storej: Option<String>) -> Result<SqlModel> {
        match storej {
            Some(json) => {
                let mut model = SqlModel::from_json(&json)?;
                if model.table.is_empty() {
                    model.table = table;
                }
                Ok(model)
            }
            None => Ok(SqlModel::empty(table)),
        }
    }
}

#[async_trait]
impl SchemaBackend for PgBackend {
    async fn ensure_schema(&mut self, schema: &str) -> Result<()> {
        let tx = self.tx()?;
        for sql in ensure_schema_sql(schema) {
            debug!(sql = %sql, "Ensuring schema");
            sqlx::query(&sql).execute(&mut **tx).await?;
        }
        Ok(())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        let tx = self.tx()?;
        sqlx::query(sql).execute(&mut **tx).await?;
        Ok(())
    }

    async fn load_snapshot(&mut self, schema: &str, table: &str) -> Result<SqlModel> {
        let sql = format!(
            "SELECT table_name::text, storej::text FROM {schema}.{CONFIG_TABLE} WHERE table_name = $1"
        );
        let tx = self.tx()?;
        let row: Option<(String, Option<String>)> = sqlx::query_as(&sql)
            .bind(table)
            .fetch_optional(&mut **tx)
            .await?;

        match row {
            Some((name, storej)) => Self::decode_snapshot(name, storej),
            None => Ok(SqlModel::empty(table)),
        }
    }

    async fn save_snapshot(&mut self, schema: &str, model: &SqlModel) -> Result<()> {
        let sql = format!(
            "INSERT INTO {schema}.{CONFIG_TABLE} (table_name,storej) VALUES($1,$2::jsonb) ON CONFLICT(table_name) DO UPDATE SET storej=excluded.storej"
        );
        let json = model.to_json()?;
        debug!(table = %model.table, "Saving snapshot");
        let tx = self.tx()?;
        sqlx::query(&sql)
            .bind(&model.table)
            .bind(json)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn snapshots(&mut self, schema: &str) -> Result<Vec<SqlModel>> {
        let sql = format!(
            "SELECT table_name::text, storej::text FROM {schema}.{CONFIG_TABLE} ORDER BY table_name"
        );
        let tx = self.tx()?;
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as(&sql).fetch_all(&mut **tx).await?;

        rows.into_iter()
            .map(|(name, storej)| Self::decode_snapshot(name, storej))
            .collect()
    }

    async fn live_columns(&mut self, schema: &str, table: &str) -> Result<Vec<LiveColumn>> {
        let tx = self.tx()?;
        let rows: Vec<ColumnRow> = sqlx::query_as(COLUMNS_SQL)
            .bind(table)
            .bind(schema)
            .fetch_all(&mut **tx)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(name, udt_name, is_nullable, len, precision, radix)| LiveColumn {
                name,
                udt_name,
                is_nullable,
                char_max_length: len,
                numeric_precision: precision,
                numeric_precision_radix: radix,
            })
            .collect())
    }

    async fn live_indexes(&mut self, schema: &str, table: &str) -> Result<Vec<LiveIndex>> {
        let qualified = format!("{schema}.{table}");
        let tx = self.tx()?;
        let rows: Vec<(String, String, String, String)> = sqlx::query_as(INDEXES_SQL)
            .bind(&qualified)
            .fetch_all(&mut **tx)
            .await?;

        rows.into_iter()
            .map(|(name, table, columns, schema)| {
                Ok(LiveIndex {
                    name,
                    table,
                    schema,
                    columns: serde_json::from_str(&columns)?,
                })
            })
            .collect()
    }

    async fn start_step(&mut self, schema: &str, name: &str) -> Result<()> {
        let sql = format!("INSERT INTO {schema}.{STEPS_TABLE} (name) VALUES($1)");
        let tx = self.tx()?;
        sqlx::query(&sql).bind(name).execute(&mut **tx).await?;
        Ok(())
    }

    async fn step_started(&mut self, schema: &str, name: &str) -> Result<bool> {
        let sql = format!("SELECT name::text FROM {schema}.{STEPS_TABLE} WHERE name = $1");
        let tx = self.tx()?;
        let row: Option<(String,)> = sqlx::query_as(&sql)
            .bind(name)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(row.is_some())
    }

    async fn stop_step(&mut self, schema: &str, name: &str) -> Result<()> {
        let sql = format!("DELETE FROM {schema}.{STEPS_TABLE} WHERE name = $1");
        let tx = self.tx()?;
        sqlx::query(&sql).bind(name).execute(&mut **tx).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or(MigrateError::NoTransaction)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let tx = self.tx.take().ok_or(MigrateError::NoTransaction)?;
        tx.rollback().await?;
        Ok(())
    }
}
