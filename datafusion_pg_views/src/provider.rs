use std::any::Any;
use std::ops::ControlFlow;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Float64Builder, Int64Builder, StringBuilder,
    TimestampMicrosecondBuilder,
};
use arrow::datatypes::{DataType, SchemaRef, TimeUnit};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use async_trait::async_trait;
use datafusion::common::DataFusionError;
use datafusion::datasource::TableProvider;
use datafusion::error::Result;
use datafusion::execution::context::SessionState;
use datafusion::physical_plan::memory::MemoryExec;
use datafusion::physical_plan::ExecutionPlan;
use datafusion_expr::{Expr, TableProviderFilterPushDown, TableType};
use tracing::debug;

use crate::descriptor::TableDescriptor;
use crate::error::Error;
use crate::filter_pushdown::filter_to_qualifiers;
use crate::row::{Row, Value};
use crate::source::RemoteSource;

enum ColumnBuilder {
    Utf8(StringBuilder),
    Boolean(BooleanBuilder),
    Float64(Float64Builder),
    Int64(Int64Builder),
    Timestamp(TimestampMicrosecondBuilder),
}

impl ColumnBuilder {
    fn new(data_type: &DataType) -> Option<Self> {
        Some(match data_type {
            DataType::Utf8 => Self::Utf8(StringBuilder::new()),
            DataType::Boolean => Self::Boolean(BooleanBuilder::new()),
            DataType::Float64 => Self::Float64(Float64Builder::new()),
            DataType::Int64 => Self::Int64(Int64Builder::new()),
            DataType::Timestamp(TimeUnit::Microsecond, None) => {
                Self::Timestamp(TimestampMicrosecondBuilder::new())
            }
            _ => return None,
        })
    }

    fn append(&mut self, value: Option<&Value>) -> Result<(), String> {
        match (self, value) {
            (Self::Utf8(b), None | Some(Value::Null)) => b.append_null(),
            (Self::Boolean(b), None | Some(Value::Null)) => b.append_null(),
            (Self::Float64(b), None | Some(Value::Null)) => b.append_null(),
            (Self::Int64(b), None | Some(Value::Null)) => b.append_null(),
            (Self::Timestamp(b), None | Some(Value::Null)) => b.append_null(),

            (Self::Utf8(b), Some(Value::Text(s) | Value::Json(s))) => b.append_value(s),
            (Self::Utf8(b), Some(Value::Bytes(bytes))) => {
                b.append_value(String::from_utf8_lossy(bytes))
            }
            (Self::Boolean(b), Some(Value::Bool(v))) => b.append_value(*v),
            (Self::Float64(b), Some(Value::Double(v))) => b.append_value(*v),
            (Self::Float64(b), Some(Value::Int(v))) => b.append_value(*v as f64),
            (Self::Int64(b), Some(Value::Int(v))) => b.append_value(*v),
            (Self::Timestamp(b), Some(Value::Timestamp(ts))) => {
                b.append_value(ts.and_utc().timestamp_micros())
            }

            (builder, Some(other)) => {
                return Err(format!(
                    "value {other:?} doesn't fit a {} column",
                    builder.kind()
                ))
            }
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Utf8(_) => "text",
            Self::Boolean(_) => "boolean",
            Self::Float64(_) => "double",
            Self::Int64(_) => "integer",
            Self::Timestamp(_) => "timestamp",
        }
    }

    fn finish(&mut self) -> ArrayRef {
        match self {
            Self::Utf8(b) => Arc::new(b.finish()),
            Self::Boolean(b) => Arc::new(b.finish()),
            Self::Float64(b) => Arc::new(b.finish()),
            Self::Int64(b) => Arc::new(b.finish()),
            Self::Timestamp(b) => Arc::new(b.finish()),
        }
    }
}

/// Accumulates decoded rows into record batches of at most `batch_size` rows
pub(crate) struct BatchAssembler {
    table: String,
    schema: SchemaRef,
    builders: Vec<(String, ColumnBuilder)>,
    batch_size: usize,
    pending: usize,
    total: usize,
    batches: Vec<RecordBatch>,
}

impl BatchAssembler {
    pub(crate) fn try_new(
        table: &str,
        schema: SchemaRef,
        batch_size: usize,
    ) -> Result<Self, Error> {
        let builders = schema
            .fields()
            .iter()
            .map(|f| {
                ColumnBuilder::new(f.data_type())
                    .map(|b| (f.name().to_string(), b))
                    .ok_or_else(|| Error::Assembly {
                        table: table.to_string(),
                        column: f.name().to_string(),
                        reason: format!("unsupported column type {}", f.data_type()),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            table: table.to_string(),
            schema,
            builders,
            batch_size: batch_size.max(1),
            pending: 0,
            total: 0,
            batches: vec![],
        })
    }

    pub(crate) fn push(&mut self, row: &Row) -> Result<(), Error> {
        for (name, builder) in self.builders.iter_mut() {
            builder
                .append(row.get(name))
                .map_err(|reason| Error::Assembly {
                    table: self.table.clone(),
                    column: name.clone(),
                    reason,
                })?;
        }

        self.pending += 1;
        self.total += 1;
        if self.pending >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    pub(crate) fn row_count(&self) -> usize {
        self.total
    }

    fn flush(&mut self) -> Result<(), Error> {
        if self.pending == 0 {
            return Ok(());
        }

        let columns = self.builders.iter_mut().map(|(_, b)| b.finish()).collect();
        // Explicit row count, so that tables without any typed column still yield rows
        let options = RecordBatchOptions::new().with_row_count(Some(self.pending));
        self.batches.push(RecordBatch::try_new_with_options(
            self.schema.clone(),
            columns,
            &options,
        )?);
        self.pending = 0;
        Ok(())
    }

    pub(crate) fn finish(mut self) -> Result<Vec<RecordBatch>, Error> {
        self.flush()?;
        Ok(self.batches)
    }
}

/// A discovered view exposed as a DataFusion table.
///
/// Scans run `SELECT * FROM schema.view` with the pushed-down filters as the `WHERE` clause
/// on a fresh connection, and buffer the result in memory.
#[derive(Debug)]
pub struct RemoteView {
    source: RemoteSource,
    descriptor: TableDescriptor,
    schema: SchemaRef,
}

impl RemoteView {
    pub fn new(source: RemoteSource, descriptor: TableDescriptor) -> Self {
        let schema = descriptor.arrow_schema();
        Self {
            source,
            descriptor,
            schema,
        }
    }

    pub fn descriptor(&self) -> &TableDescriptor {
        &self.descriptor
    }
}

#[async_trait]
impl TableProvider for RemoteView {
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
        state: &SessionState,
        projection: Option<&Vec<usize>>,
        filters: &[Expr],
        limit: Option<usize>,
    ) -> Result<Arc<dyn ExecutionPlan>> {
        // All of the filters passed the check in `supports_filters_pushdown`, so they must convert
        let mut qualifiers = vec![];
        for filter in filters {
            let converted = filter_to_qualifiers(filter, &self.descriptor).ok_or_else(|| {
                DataFusionError::Execution(format!(
                    "Failed converting filter {filter} for table {}",
                    self.descriptor.name
                ))
            })?;
            qualifiers.extend(converted);
        }

        let mut assembler = BatchAssembler::try_new(
            &self.descriptor.name,
            self.schema(),
            state.config().batch_size(),
        )?;

        if limit != Some(0) {
            self.source
                .execute(
                    &self.descriptor.schema_name,
                    &self.descriptor.name,
                    &qualifiers,
                    |row| {
                        assembler.push(&row)?;
                        Ok(match limit {
                            Some(limit) if assembler.row_count() >= limit => {
                                ControlFlow::Break(())
                            }
                            _ => ControlFlow::Continue(()),
                        })
                    },
                )
                .await?;
        }

        debug!(
            "Loaded {} row(s) from {}.{}",
            assembler.row_count(),
            self.descriptor.schema_name,
            self.descriptor.name
        );

        Ok(Arc::new(MemoryExec::try_new(
            &[assembler.finish()?],
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
            .map(|f| match filter_to_qualifiers(f, &self.descriptor) {
                // NB: Exact lets DataFusion drop the filter node from the plan, and push any
                // limit clause down to the scan when all filters are shippable.
                Some(_) => TableProviderFilterPushDown::Exact,
                None => TableProviderFilterPushDown::Unsupported,
            })
            .collect())
    }
}
