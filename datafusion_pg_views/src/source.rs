use std::fmt;
use std::sync::Arc;

use sqlx::{Connection, PgConnection};
use tracing::{debug, warn};

use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// A remote database that we introspect and query.
///
/// Cloning is cheap; every operation opens its own connection and closes it before
/// returning, so a `RemoteSource` can be shared freely between concurrent scans.
#[derive(Clone)]
pub struct RemoteSource {
    connection_string: Arc<str>,
    dialect: Dialect,
}

impl RemoteSource {
    pub fn new(connection_string: &str, dialect: Dialect) -> Self {
        Self {
            connection_string: Arc::from(connection_string),
            dialect,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub(crate) async fn connect(&self) -> Result<PgConnection> {
        PgConnection::connect(&self.connection_string)
            .await
            .map_err(Error::Connection)
    }

    // Consumes the connection, so it can't be closed (or used) a second time.
    pub(crate) async fn release(&self, conn: PgConnection) {
        match conn.close().await {
            Ok(()) => debug!("Closed remote connection"),
            Err(e) => warn!("Failed closing the remote connection cleanly: {e}"),
        }
    }
}

// Keep credentials in the connection string out of the logs
impl fmt::Debug for RemoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSource")
            .field("dialect", &self.dialect)
            .finish_non_exhaustive()
    }
}
