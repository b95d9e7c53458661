use std::any::Any;
use std::ops::ControlFlow;
use std::sync::Arc;

use arrow::array::StringBuilder;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::datasource::TableProvider;
use datafusion::error::Result;
use datafusion::execution::context::SessionState;
use datafusion::physical_plan::memory::MemoryExec;
use datafusion::physical_plan::ExecutionPlan;
use datafusion::scalar::ScalarValue;
use datafusion_expr::{BinaryExpr, Expr, Operator, TableProviderFilterPushDown, TableType};
use itertools::Itertools;
use tracing::{debug, warn};

use crate::error::Error;
use crate::row::row_to_json;
use crate::source::RemoteSource;

pub const RAW_TABLE_NAME: &str = "raw";
const QUERY_COLUMN: &str = "query";
const DATA_COLUMN: &str = "data";

// `query = '<sql>'` (or the mirrored form)
fn query_literal(filter: &Expr) -> Option<&str> {
    let Expr::BinaryExpr(BinaryExpr {
        left,
        op: Operator::Eq,
        right,
    }) = filter
    else {
        return None;
    };

    match (left.as_ref(), right.as_ref()) {
        (Expr::Column(c), Expr::Literal(ScalarValue::Utf8(Some(q))))
        | (Expr::Literal(ScalarValue::Utf8(Some(q))), Expr::Column(c))
            if c.name == QUERY_COLUMN =>
        {
            Some(q.as_str())
        }
        _ => None,
    }
}

/// Passes arbitrary SQL through to the remote database.
///
/// `SELECT data FROM raw WHERE query = 'SELECT ...'` runs the query verbatim, and returns each
/// result row as a JSON object in the `data` column, next to the query itself.
#[derive(Debug)]
pub struct RawQueryTable {
    source: RemoteSource,
    schema: SchemaRef,
}

impl RawQueryTable {
    pub fn new(source: RemoteSource) -> Self {
        Self {
            source,
            schema: Arc::new(Schema::new(vec![
                Field::new(QUERY_COLUMN, DataType::Utf8, false),
                Field::new(DATA_COLUMN, DataType::Utf8, false),
            ])),
        }
    }

    async fn load_record_batch(&self, query: &str, limit: Option<usize>) -> Result<RecordBatch> {
        let mut queries = StringBuilder::new();
        let mut data = StringBuilder::new();
        let mut rows = 0;

        self.source
            .execute_sql(query, |row| {
                queries.append_value(query);
                data.append_value(row_to_json(&row).to_string());
                rows += 1;

                Ok(match limit {
                    Some(limit) if rows >= limit => ControlFlow::Break(()),
                    _ => ControlFlow::Continue(()),
                })
            })
            .await?;

        Ok(RecordBatch::try_new(
            self.schema.clone(),
            vec![Arc::new(queries.finish()), Arc::new(data.finish())],
        )?)
    }
}

#[async_trait]
impl TableProvider for RawQueryTable {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn table_type(&self) -> TableType {
        TableType::View
    }

    async fn scan(
        &self,
        _ctx: &SessionState,
        projection: Option<&Vec<usize>>,
        filters: &[Expr],
        limit: Option<usize>,
    ) -> Result<Arc<dyn ExecutionPlan>> {
        let queries: Vec<&str> = filters.iter().filter_map(query_literal).unique().collect();

        let batches = match queries.as_slice() {
            [] => return Err(Error::MissingRawQuery.into()),
            [query] if limit != Some(0) => vec![self.load_record_batch(query, limit).await?],
            [_] => vec![],
            [..] => {
                // `query = 'a' AND query = 'b'` can't match anything
                warn!("Conflicting raw queries {queries:?}, returning no rows");
                vec![]
            }
        };
        debug!("Raw query produced {} batch(es)", batches.len());

        Ok(Arc::new(MemoryExec::try_new(
            &[batches],
            self.schema(),
            projection.cloned(),
        )?))
    }

    fn supports_filters_pushdown(
        &self,
        filters: &[&Expr],
    ) -> Result<Vec<TableProviderFilterPushDown>> {
        Ok(filters
            .iter()
            .map(|f| match query_literal(f) {
                Some(_) => TableProviderFilterPushDown::Exact,
                None => TableProviderFilterPushDown::Unsupported,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use datafusion::datasource::TableProvider;
    use datafusion_expr::{col, lit, TableProviderFilterPushDown};
    use rstest::rstest;

    use super::{query_literal, RawQueryTable};
    use crate::dialect::Dialect;
    use crate::source::RemoteSource;

    #[rstest]
    #[case::column_first(col("query").eq(lit("SELECT 1")), Some("SELECT 1"))]
    #[case::literal_first(lit("SELECT 1").eq(col("query")), Some("SELECT 1"))]
    #[case::other_column(col("data").eq(lit("SELECT 1")), None)]
    #[case::not_eq(col("query").not_eq(lit("SELECT 1")), None)]
    #[case::non_string(col("query").eq(lit(1)), None)]
    fn test_query_literal(#[case] filter: datafusion_expr::Expr, #[case] expected: Option<&str>) {
        assert_eq!(query_literal(&filter), expected)
    }

    #[test]
    fn test_raw_table_pushdown() {
        let table = RawQueryTable::new(RemoteSource::new(
            "postgresql://localhost/db",
            Dialect::Postgres,
        ));

        let schema = table.schema();
        assert_eq!(schema.field(0).name(), "query");
        assert_eq!(schema.field(1).name(), "data");

        let query = col("query").eq(lit("SELECT 1"));
        let data = col("data").like(lit("%x%"));
        let support = table.supports_filters_pushdown(&[&query, &data]).unwrap();
        assert!(matches!(
            support.as_slice(),
            [
                TableProviderFilterPushDown::Exact,
                TableProviderFilterPushDown::Unsupported
            ]
        ));
    }
}
