use std::{sync::Arc, time::Duration};

use futures::future::{BoxFuture, FutureExt};
use sqlx::{postgres::PgPoolOptions, Connection, PgConnection, PgPool};
use tokio_util::task::TaskTracker;

use crate::app::util::sqlx::{get_code_from_err, SqlStateCodes};

use super::{errors::SinkError, models::transaction::Transaction, service};

/// Storage backend for scored transactions.
///
/// Implementations report every failure; [`PersistenceSink`] decides what to
/// do with them.
pub trait TransactionSink: Send + Sync {
    fn describe(&self) -> String;

    fn create_schema(&self) -> BoxFuture<'_, Result<(), SinkError>>;

    fn insert<'a>(
        &'a self,
        tx: &'a Transaction,
        probability: f64,
        flagged: bool,
    ) -> BoxFuture<'a, Result<(), SinkError>>;
}

enum Connector {
    Disabled,
    PerCall(String),
    Pooled(PgPool, u32),
}

pub struct PgTransactionSink {
    connector: Connector,
}

impl PgTransactionSink {
    /// Without `max_connections` every call opens and closes its own
    /// connection. With it, calls share a lazily connected pool.
    pub fn new(database_url: Option<&str>, max_connections: Option<u32>) -> Self {
        let Some(url) = database_url
        else {
            return Self {
                connector: Connector::Disabled,
            };
        };

        let Some(max_connections) = max_connections
        else {
            return Self {
                connector: Connector::PerCall(url.to_string()),
            };
        };

        match PgPoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(Some(Duration::from_secs(60)))
            .connect_lazy(url)
        {
            Ok(pool) => Self {
                connector: Connector::Pooled(pool, max_connections),
            },
            Err(e) => {
                tracing::error!(%e, "failed to configure connection pool, using per-call connections");
                Self {
                    connector: Connector::PerCall(url.to_string()),
                }
            }
        }
    }
}

impl TransactionSink for PgTransactionSink {
    fn describe(&self) -> String {
        match &self.connector {
            Connector::Disabled => "disabled".to_string(),
            Connector::PerCall(_) => "postgres (connection per call)".to_string(),
            Connector::Pooled(_, size) => format!("postgres (pool of {})", size),
        }
    }

    fn create_schema(&self) -> BoxFuture<'_, Result<(), SinkError>> {
        async move {
            match &self.connector {
                Connector::Disabled => Err(SinkError::NotConfigured),
                Connector::PerCall(url) => {
                    let mut conn = PgConnection::connect(url).await?;
                    service::create_table(&mut conn).await?;
                    conn.close().await?;
                    Ok(())
                }
                Connector::Pooled(pool, _) => Ok(service::create_table(pool).await?),
            }
        }
        .boxed()
    }

    fn insert<'a>(
        &'a self,
        tx: &'a Transaction,
        probability: f64,
        flagged: bool,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        async move {
            match &self.connector {
                Connector::Disabled => Err(SinkError::NotConfigured),
                Connector::PerCall(url) => {
                    let mut conn = PgConnection::connect(url).await?;
                    service::insert_transaction(&mut conn, tx, probability, flagged).await?;
                    conn.close().await?;
                    Ok(())
                }
                Connector::Pooled(pool, _) => {
                    Ok(service::insert_transaction(pool, tx, probability, flagged).await?)
                }
            }
        }
        .boxed()
    }
}

/// Failure boundary around a [`TransactionSink`]: errors are logged and
/// never returned.
///
/// Clones share the same set of background records, so draining any clone
/// waits for records started through all of them.
#[derive(Clone)]
pub struct PersistenceSink {
    inner: Arc<dyn TransactionSink>,
    tasks: TaskTracker,
}

impl PersistenceSink {
    pub fn new(inner: Arc<dyn TransactionSink>) -> Self {
        Self {
            inner,
            tasks: TaskTracker::new(),
        }
    }

    pub fn describe(&self) -> String {
        self.inner.describe()
    }

    pub async fn ensure_schema(&self) {
        match self.inner.create_schema().await {
            Ok(_) => tracing::info!("transactions table initialized"),
            Err(SinkError::NotConfigured) => {
                tracing::warn!("DATABASE_URL not set, skipping transactions table init")
            }
            Err(e) => log_sink_error("ensure_schema", &e),
        }
    }

    pub async fn record(&self, tx: &Transaction, probability: f64, flagged: bool) {
        match self.inner.insert(tx, probability, flagged).await {
            Ok(_) => tracing::debug!(
                step = tx.step,
                kind = %tx.kind,
                probability,
                flagged,
                "transaction recorded"
            ),
            Err(SinkError::NotConfigured) => {
                tracing::warn!("DATABASE_URL not set, skipping transaction record")
            }
            Err(e) => log_sink_error("record", &e),
        }
    }

    /// Records on a tracked task without waiting for it. Must be called from
    /// within a tokio runtime.
    pub fn record_in_background(&self, tx: Transaction, probability: f64, flagged: bool) {
        let sink = self.clone();

        self.tasks.spawn(async move {
            sink.record(&tx, probability, flagged).await;
        });
    }

    /// Background records that have not finished yet.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Waits up to `timeout` for background records to finish. Returns
    /// `false` when some were still running at the deadline.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tasks.close();

        let pending = self.tasks.len();
        if pending > 0 {
            tracing::info!(pending, "waiting for pending transaction records");
        }

        match tokio::time::timeout(timeout, self.tasks.wait()).await {
            Ok(_) => true,
            Err(_) => {
                tracing::warn!(
                    abandoned = self.tasks.len(),
                    "gave up waiting for pending transaction records"
                );
                false
            }
        }
    }
}

fn log_sink_error(op: &str, e: &SinkError) {
    let SinkError::Database(db_err) = e
    else {
        tracing::error!(op, %e, "persistence failed");
        return;
    };

    match get_code_from_err(db_err).as_deref() {
        Some(SqlStateCodes::UNDEFINED_TABLE) => {
            tracing::error!(op, %e, "persistence failed, transactions table is missing")
        }
        Some(SqlStateCodes::STRING_DATA_RIGHT_TRUNCATION) => {
            tracing::error!(op, %e, "persistence failed, value too long for column")
        }
        Some(code) => tracing::error!(op, code, %e, "persistence failed"),
        None => tracing::error!(op, %e, "persistence failed"),
    }
}
