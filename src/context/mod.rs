pub mod logical;
pub mod physical;

use std::sync::Arc;

use arrow::array::{BooleanBuilder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::catalog::schema::SchemaProvider;
pub use datafusion::error::{DataFusionError as Error, Result};
use datafusion::prelude::SessionContext;
use datafusion_pg_views::{RemoteSchemaProvider, RemoteSource};
use tracing::info;

use crate::config::schema::PgViewConfig;

pub const DEFAULT_CATALOG: &str = "pgview";

// Holds the DataFusion session with the remote schema registered in it, and knows how to
// re-run discovery against the remote database.
pub struct PgViewContext {
    pub config: PgViewConfig,
    pub inner: SessionContext,
    pub source: RemoteSource,
}

impl PgViewContext {
    pub fn inner(&self) -> &SessionContext {
        &self.inner
    }

    pub fn schema_name(&self) -> &str {
        &self.config.source.schema
    }

    /// Make `provider` the schema queries run against, replacing any previous one
    pub fn register_provider(&self, provider: RemoteSchemaProvider) -> Result<()> {
        let catalog = self.inner.catalog(DEFAULT_CATALOG).ok_or_else(|| {
            Error::Internal(format!("Catalog {DEFAULT_CATALOG} not registered"))
        })?;
        catalog.register_schema(self.schema_name(), Arc::new(provider))?;
        Ok(())
    }

    fn remote_schema(&self) -> Result<Arc<dyn SchemaProvider>> {
        self.inner
            .catalog(DEFAULT_CATALOG)
            .and_then(|c| c.schema(self.schema_name()))
            .ok_or_else(|| {
                Error::Internal(format!(
                    "Schema {DEFAULT_CATALOG}.{} not registered",
                    self.schema_name()
                ))
            })
    }

    /// Re-run discovery, picking up views created or dropped since the last one.
    ///
    /// Returns the number of exposed views.
    pub async fn refresh(&self) -> Result<usize> {
        let source = &self.config.source;
        let provider = RemoteSchemaProvider::try_new(
            self.source.clone(),
            &source.schema,
            &source.tables_to_expose,
            source.include_tables,
        )
        .await?;

        let count = provider.descriptors().count();
        self.register_provider(provider)?;
        info!("Refreshed schema {:?}: {count} view(s)", source.schema);
        Ok(count)
    }

    /// Columns of an exposed view with their abstract and native types, or `None` for
    /// tables that didn't come out of discovery (e.g. the raw query table).
    pub fn describe_table(&self, name: &str) -> Result<Option<RecordBatch>> {
        let schema = self.remote_schema()?;
        let Some(provider) = schema.as_any().downcast_ref::<RemoteSchemaProvider>() else {
            return Ok(None);
        };
        let Some(descriptor) = provider.descriptor(name) else {
            return Ok(None);
        };

        let mut names = StringBuilder::new();
        let mut types = StringBuilder::new();
        let mut native_types = StringBuilder::new();
        let mut primary_key = BooleanBuilder::new();

        for column in &descriptor.columns {
            let native_type = descriptor
                .view
                .columns
                .iter()
                .find(|c| c.name == column.name)
                .map(|c| c.native_db_type.as_str())
                .unwrap_or_default();

            names.append_value(&column.name);
            types.append_value(column.column_type.to_string());
            native_types.append_value(native_type);
            primary_key.append_value(descriptor.view.primary_key.contains(&column.name));
        }

        let schema = Arc::new(Schema::new(vec![
            Field::new("column_name", DataType::Utf8, false),
            Field::new("data_type", DataType::Utf8, false),
            Field::new("native_type", DataType::Utf8, false),
            Field::new("primary_key", DataType::Boolean, false),
        ]));

        Ok(Some(RecordBatch::try_new(
            schema,
            vec![
                Arc::new(names.finish()),
                Arc::new(types.finish()),
                Arc::new(native_types.finish()),
                Arc::new(primary_key.finish()),
            ],
        )?))
    }
}
