use std::sync::Arc;

use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use datafusion::execution::context::TaskContext;
use datafusion::logical_expr::LogicalPlan;
use datafusion::physical_plan::empty::EmptyExec;
use datafusion::physical_plan::{collect, ExecutionPlan};

use super::{PgViewContext, Result};

/// Create an ExecutionPlan that doesn't produce any results.
/// This is used for statements that are run while planning, such as `SET` or `CREATE VIEW`.
fn make_dummy_exec() -> Arc<dyn ExecutionPlan> {
    Arc::new(EmptyExec::new(SchemaRef::new(Schema::empty())))
}

impl PgViewContext {
    pub async fn plan_query(&self, sql: &str) -> Result<Arc<dyn ExecutionPlan>> {
        let mut plans = vec![];
        for logical_plan in self.create_logical_plans(sql).await? {
            plans.push(self.create_physical_plan(&logical_plan).await?);
        }

        match plans.len() {
            1 => Ok(plans.remove(0)),
            n => Err(super::Error::NotImplemented(format!(
                "Expected exactly one statement, got {n}"
            ))),
        }
    }

    pub async fn create_physical_plan(
        &self,
        plan: &LogicalPlan,
    ) -> Result<Arc<dyn ExecutionPlan>> {
        match plan {
            // Similarly to DataFrame::sql, these touch the session/catalog rather than produce rows
            LogicalPlan::Ddl(_) | LogicalPlan::Statement(_) => {
                self.inner.execute_logical_plan(plan.clone()).await?;
                Ok(make_dummy_exec())
            }
            _ => self.inner.state().create_physical_plan(plan).await,
        }
    }

    // Copied from DataFusion's physical_plan
    pub async fn collect(
        &self,
        physical_plan: Arc<dyn ExecutionPlan>,
    ) -> Result<Vec<RecordBatch>> {
        let task_context = Arc::new(TaskContext::from(self.inner()));
        collect(physical_plan, task_context).await
    }
}
