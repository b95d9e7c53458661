use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use datafusion::catalog::schema::SchemaProvider;
use datafusion::datasource::TableProvider;
use tracing::{info, warn};

use crate::descriptor::{compile_patterns, select_views, TableDescriptor};
use crate::discovery::View;
use crate::error::Result;
use crate::provider::RemoteView;
use crate::raw::{RawQueryTable, RAW_TABLE_NAME};
use crate::source::RemoteSource;

/// All exposed views of one remote schema, plus the `raw` pass-through table.
///
/// The set of tables is fixed at construction; build a new provider to pick up views
/// created or dropped since.
pub struct RemoteSchemaProvider {
    schema_name: String,
    views: BTreeMap<String, Arc<RemoteView>>,
    raw: Arc<RawQueryTable>,
}

impl RemoteSchemaProvider {
    /// Discover the views of `schema_name` and expose those picked by `patterns`
    pub async fn try_new(
        source: RemoteSource,
        schema_name: &str,
        patterns: &[String],
        include_tables: bool,
    ) -> Result<Self> {
        let patterns = compile_patterns(patterns)?;
        let views = source.discover(schema_name, include_tables).await?;
        Ok(Self::from_views(
            source,
            schema_name,
            select_views(views, &patterns),
        ))
    }

    pub fn from_views(source: RemoteSource, schema_name: &str, views: Vec<View>) -> Self {
        let mut tables = BTreeMap::new();

        for view in views {
            if view.name == RAW_TABLE_NAME {
                warn!(
                    "View {}.{} is shadowed by the raw query table",
                    view.schema_name, view.name
                );
                continue;
            }

            let descriptor = TableDescriptor::synthesize(&view);
            tables.insert(
                view.name,
                Arc::new(RemoteView::new(source.clone(), descriptor)),
            );
        }

        info!(
            "Exposing {} table(s) from schema {schema_name:?}",
            tables.len()
        );

        Self {
            schema_name: schema_name.to_string(),
            views: tables,
            raw: Arc::new(RawQueryTable::new(source)),
        }
    }

    pub fn schema_name(&self) -> &str {
        &self.schema_name
    }

    /// The descriptor of an exposed view (the raw table has none)
    pub fn descriptor(&self, name: &str) -> Option<&TableDescriptor> {
        self.views.get(name).map(|v| v.descriptor())
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &TableDescriptor> {
        self.views.values().map(|v| v.descriptor())
    }
}

#[async_trait]
impl SchemaProvider for RemoteSchemaProvider {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn table_names(&self) -> Vec<String> {
        self.views
            .keys()
            .cloned()
            .chain(std::iter::once(RAW_TABLE_NAME.to_string()))
            .collect()
    }

    async fn table(&self, name: &str) -> Option<Arc<dyn TableProvider>> {
        if name == RAW_TABLE_NAME {
            return Some(self.raw.clone() as _);
        }
        self.views.get(name).map(|v| v.clone() as _)
    }

    fn table_exist(&self, name: &str) -> bool {
        name == RAW_TABLE_NAME || self.views.contains_key(name)
    }
}
