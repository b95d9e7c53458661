use sqlx::PgConnection;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::source::RemoteSource;

/// A column as reported by the remote database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    /// Rust type the row decoder yields for the column (informational only)
    pub native_scan_type: String,
    /// Canonical database type name, e.g. `INT4` or `JSONB`
    pub native_db_type: String,
}

/// A discovered view (or table) together with its ordered columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub schema_name: String,
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Vec<String>,
}

impl RemoteSource {
    /// List the views of `schema` and their columns.
    ///
    /// A schema without any views yields an empty vector. Views are ordered by name, so that
    /// repeated calls against an unchanged database produce identical results.
    pub async fn discover(&self, schema: &str, include_tables: bool) -> Result<Vec<View>> {
        let mut conn = self.connect().await?;
        let result = self.discover_views(&mut conn, schema, include_tables).await;
        self.release(conn).await;

        let views = result.map_err(|source| Error::Discovery {
            schema: schema.to_string(),
            source,
        })?;
        info!("Discovered {} view(s) in schema {schema:?}", views.len());
        Ok(views)
    }

    async fn discover_views(
        &self,
        conn: &mut PgConnection,
        schema: &str,
        include_tables: bool,
    ) -> Result<Vec<View>, sqlx::Error> {
        let dialect = self.dialect();

        let relations = dialect.list_views(conn, include_tables).await?;
        debug!("Listed {} relation(s) across all schemas", relations.len());

        let mut views = Vec::new();
        for (schema_name, name) in relations {
            if schema_name != schema {
                continue;
            }

            let columns = dialect.list_columns(conn, &schema_name, &name).await?;
            let primary_key = dialect.primary_key(conn, &schema_name, &name).await?;
            debug!(
                "View {schema_name}.{name}: {} column(s), primary key {primary_key:?}",
                columns.len()
            );

            views.push(View {
                schema_name,
                name,
                columns,
                primary_key,
            });
        }

        Ok(views)
    }
}
