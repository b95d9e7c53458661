use datafusion::logical_expr::LogicalPlan;
use datafusion::sql::parser::{DFParser, Statement as DFStatement};

use super::{PgViewContext, Result};

impl PgViewContext {
    pub async fn parse_query(&self, sql: &str) -> Result<Vec<DFStatement>> {
        Ok(DFParser::parse_sql(sql)?.into_iter().collect())
    }

    pub async fn create_logical_plan_from_statement(
        &self,
        statement: DFStatement,
    ) -> Result<LogicalPlan> {
        self.inner.state().statement_to_plan(statement).await
    }

    /// Plan every statement of `sql` up front, so that a planning error in a later
    /// statement prevents the earlier ones from running
    pub async fn create_logical_plans(&self, sql: &str) -> Result<Vec<LogicalPlan>> {
        let mut plans = vec![];
        for statement in self.parse_query(sql).await? {
            plans.push(self.create_logical_plan_from_statement(statement).await?);
        }
        Ok(plans)
    }
}

#[cfg(test)]
mod tests {
    use datafusion::logical_expr::LogicalPlan;

    use crate::context::test_utils::offline_context;

    #[tokio::test]
    async fn test_multiple_statements() {
        let context = offline_context();

        let plans = context
            .create_logical_plans("SELECT 1; SELECT id FROM orders WHERE id > 3;")
            .await
            .unwrap();
        assert_eq!(plans.len(), 2);
        assert!(matches!(plans[1], LogicalPlan::Projection(_)));
    }

    #[tokio::test]
    async fn test_unknown_column() {
        let context = offline_context();

        // Columns of unsupported types are not part of the table
        let err = context
            .create_logical_plans("SELECT shape FROM orders")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("shape"));
    }

    #[tokio::test]
    async fn test_syntax_error() {
        let context = offline_context();

        let err = context
            .create_logical_plans("SELECT * FRM orders")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("FRM"));
    }
}
