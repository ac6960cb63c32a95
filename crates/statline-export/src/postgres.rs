//! Postgres sink — batched multi-row inserts into a metrics table.
//!
//! The table and its indexes are created at construction if absent.
//! Batches above `batch_size` are split into multiple INSERT statements;
//! each statement is retried per the sink's `RetryPolicy` before the
//! whole export is reported failed.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info, warn};

use statline_model::MetricRecord;

use crate::sink::{RetryPolicy, Sink, SinkError, SinkResult};

/// Sink that inserts record batches into a Postgres table.
pub struct PostgresSink {
    name: String,
    pool: PgPool,
    table: String,
    batch_size: usize,
    retry: RetryPolicy,
}

impl PostgresSink {
    /// Connect and ensure the metrics table exists. Any failure here is
    /// fatal at startup — a sink that cannot reach its store at
    /// construction time is a configuration problem, not a runtime one.
    pub async fn connect(
        name: impl Into<String>,
        connection_string: &str,
        table: impl Into<String>,
        batch_size: usize,
        retry: RetryPolicy,
    ) -> SinkResult<Self> {
        let name = name.into();
        let table = table.into();
        if connection_string.is_empty() {
            return Err(SinkError::Config(
                "postgres sink requires a connection string".to_string(),
            ));
        }
        validate_table_name(&table)?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(connection_string)
            .await?;

        let sink = Self {
            name,
            pool,
            table,
            batch_size: batch_size.max(1),
            retry,
        };
        sink.ensure_table().await?;
        info!(sink = %sink.name, table = %sink.table, "postgres sink connected");
        Ok(sink)
    }

    /// Create the metrics table and its query indexes if absent.
    async fn ensure_table(&self) -> SinkResult<()> {
        let table = &self.table;
        let create = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id BIGSERIAL PRIMARY KEY,
                counter_id INTEGER NOT NULL,
                value DOUBLE PRECISION NOT NULL,
                dimension_tag VARCHAR(100),
                host VARCHAR(255) NOT NULL,
                system VARCHAR(100) NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL,
                inserted_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#
        );
        sqlx::query(&create).execute(&self.pool).await?;

        let indexes = [
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_counter_time \
                 ON {table} (counter_id, timestamp DESC)"
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_host_time \
                 ON {table} (host, timestamp DESC)"
            ),
        ];
        for statement in indexes {
            if let Err(e) = sqlx::query(&statement).execute(&self.pool).await {
                // Missing indexes slow queries down but don't lose data.
                warn!(sink = %self.name, error = %e, "failed to create index");
            }
        }
        Ok(())
    }

    /// One multi-row INSERT attempt for a single chunk.
    async fn insert_chunk(&self, records: &[MetricRecord]) -> SinkResult<()> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} (counter_id, value, dimension_tag, host, system, timestamp) ",
            self.table
        ));
        builder.push_values(records, |mut row, record| {
            row.push_bind(u32::from(record.metric) as i32)
                .push_bind(record.value)
                .push_bind(record.dimension.as_deref())
                .push_bind(record.host.as_str())
                .push_bind(record.system.as_str())
                .push_bind(record.timestamp);
        });
        builder.build().execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Sink for PostgresSink {
    async fn export(&self, records: &[MetricRecord]) -> SinkResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let attempts = self.retry.max_attempts.max(1);
        for chunk in records.chunks(self.batch_size) {
            let mut last: Option<SinkError> = None;
            for attempt in 1..=attempts {
                match self.insert_chunk(chunk).await {
                    Ok(()) => {
                        last = None;
                        break;
                    }
                    Err(e) => {
                        warn!(
                            sink = %self.name,
                            attempt,
                            max_attempts = attempts,
                            error = %e,
                            "postgres insert attempt failed"
                        );
                        last = Some(e);
                        if attempt < attempts {
                            tokio::time::sleep(self.retry.delay_after(attempt)).await;
                        }
                    }
                }
            }
            if let Some(last) = last {
                return Err(SinkError::RetriesExhausted {
                    attempts,
                    last: Box::new(last),
                });
            }
        }

        debug!(
            sink = %self.name,
            records = records.len(),
            "exported metrics to postgres"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn close(&self) -> SinkResult<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// The table name is interpolated into DDL and INSERT statements, so it
/// is restricted to identifier characters rather than quoted.
fn validate_table_name(table: &str) -> SinkResult<()> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(SinkError::Config(format!(
            "invalid table name: {table:?} (expected [a-zA-Z_][a-zA-Z0-9_]*)"
        )))
    }
}
