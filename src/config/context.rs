use std::sync::Arc;

use datafusion::catalog::{CatalogProvider, MemoryCatalogProvider};
use datafusion::common::{DataFusionError, Result};
use datafusion::execution::memory_pool::GreedyMemoryPool;
use datafusion::execution::runtime_env::{RuntimeConfig, RuntimeEnv};
use datafusion::prelude::{SessionConfig, SessionContext};
use datafusion_pg_views::{DialectRegistry, RemoteSchemaProvider, RemoteSource};

use super::schema;
use crate::context::{PgViewContext, DEFAULT_CATALOG};

/// Discover the configured schema and build a context that can query its views
pub async fn build_context(cfg: schema::PgViewConfig) -> Result<PgViewContext> {
    let dialect = DialectRegistry::default().get(&cfg.source.dialect)?;
    let source = RemoteSource::new(&cfg.source.connection_string, dialect);

    let provider = RemoteSchemaProvider::try_new(
        source.clone(),
        &cfg.source.schema,
        &cfg.source.tables_to_expose,
        cfg.source.include_tables,
    )
    .await?;

    build_context_with_provider(cfg, source, provider)
}

pub fn build_context_with_provider(
    cfg: schema::PgViewConfig,
    source: RemoteSource,
    provider: RemoteSchemaProvider,
) -> Result<PgViewContext> {
    let max_memory = cfg
        .runtime
        .max_memory_bytes()
        .map_err(|e| DataFusionError::Configuration(e.to_string()))?;

    let mut runtime_config = RuntimeConfig::new();
    if let Some(max_memory) = max_memory {
        runtime_config =
            runtime_config.with_memory_pool(Arc::new(GreedyMemoryPool::new(max_memory)));
    }

    let session_config = SessionConfig::from_env()?
        .with_information_schema(true)
        .with_batch_size(cfg.misc.batch_size)
        .with_default_catalog_and_schema(DEFAULT_CATALOG, &cfg.source.schema);

    let runtime_env = RuntimeEnv::new(runtime_config)?;
    let context = SessionContext::new_with_config_rt(session_config, Arc::new(runtime_env));

    let catalog = MemoryCatalogProvider::new();
    catalog.register_schema(&cfg.source.schema, Arc::new(provider))?;
    context.register_catalog(DEFAULT_CATALOG, Arc::new(catalog));

    Ok(PgViewContext {
        config: cfg,
        inner: context,
        source,
    })
}
