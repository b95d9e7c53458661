use std::ops::ControlFlow;

use futures::TryStreamExt;
use sqlx::postgres::{PgRow, PgValueFormat};
use sqlx::{Column as _, Executor, PgConnection, Row as _, ValueRef};
use tracing::debug;

use crate::data_types::native_type_name;
use crate::error::{Error, Result};
use crate::qualifier::{translate, Qualifier, WhereClause};
use crate::row::{Row, Value};
use crate::source::RemoteSource;

impl RemoteSource {
    /// `SELECT * FROM schema.table [WHERE ...]`
    pub fn select_query(&self, schema: &str, table: &str, filter: &WhereClause) -> String {
        let mut query = format!(
            "SELECT * FROM {}",
            self.dialect().qualified_name(schema, table)
        );
        if !filter.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&filter.sql);
        }
        query
    }

    /// Fetch the rows of `schema.table` matching all of the qualifiers.
    ///
    /// See [`RemoteSource::execute_sql`] for how rows are delivered.
    pub async fn execute<F>(
        &self,
        schema: &str,
        table: &str,
        qualifiers: &[Qualifier],
        on_row: F,
    ) -> Result<usize>
    where
        F: FnMut(Row) -> Result<ControlFlow<()>>,
    {
        let filter = translate(self.dialect(), qualifiers);
        let query = self.select_query(schema, table, &filter);
        self.execute_sql(&query, on_row).await
    }

    /// Run a query and hand every row to `on_row` as soon as it's decoded.
    ///
    /// Returning `ControlFlow::Break` from `on_row` stops the iteration early. The connection
    /// is closed before this returns, whether the rows were exhausted, iteration was stopped
    /// or an error occurred. Rows handed out before an error stay delivered. Returns the
    /// number of rows handed to `on_row`.
    pub async fn execute_sql<F>(&self, query: &str, mut on_row: F) -> Result<usize>
    where
        F: FnMut(Row) -> Result<ControlFlow<()>>,
    {
        let mut conn = self.connect().await?;
        let result = stream_rows(&mut conn, query, &mut on_row).await;
        self.release(conn).await;

        if let Ok(count) = &result {
            debug!("Streamed {count} row(s) for query {query:?}");
        }
        result
    }
}

async fn stream_rows<F>(conn: &mut PgConnection, query: &str, on_row: &mut F) -> Result<usize>
where
    F: FnMut(Row) -> Result<ControlFlow<()>>,
{
    debug!("Running remote query {query:?}");

    // A plain string query goes through the simple query protocol, so all values arrive in
    // their text representation.
    let mut rows = (&mut *conn).fetch(query);
    let mut count = 0;

    while let Some(row) = rows.try_next().await.map_err(|source| Error::Query {
        query: query.to_string(),
        source,
    })? {
        let row = decode_row(&row).map_err(|(column, reason)| Error::RowDecode {
            query: query.to_string(),
            column,
            reason,
        })?;

        count += 1;
        if on_row(row)?.is_break() {
            debug!("Stopped reading rows after {count} row(s)");
            break;
        }
    }

    Ok(count)
}

// One slot per result column; on failure, returns the offending column and the reason
fn decode_row(row: &PgRow) -> Result<Row, (String, String)> {
    let mut decoded = Row::with_capacity(row.columns().len());

    for (i, column) in row.columns().iter().enumerate() {
        let name = column.name().to_string();
        let raw = row
            .try_get_raw(i)
            .map_err(|e| (name.clone(), e.to_string()))?;

        let value = if raw.is_null() {
            Value::Null
        } else {
            if !matches!(raw.format(), PgValueFormat::Text) {
                return Err((name, "expected a value in text format".to_string()));
            }
            let text = raw.as_str().map_err(|e| (name.clone(), e.to_string()))?;
            let native_db_type = native_type_name(column.type_info());

            Value::decode_text(&native_db_type, text)
                .map_err(|reason| (name.clone(), reason))?
                .detect_json()
        };

        decoded.insert(name, value);
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use crate::dialect::Dialect;
    use crate::qualifier::{translate, QualOperator, QualValue, Qualifier, WhereClause};
    use crate::source::RemoteSource;

    fn source() -> RemoteSource {
        RemoteSource::new("postgresql://localhost/db", Dialect::Postgres)
    }

    #[test]
    fn test_select_query_without_filter() {
        assert_eq!(
            source().select_query("s", "t", &WhereClause::default()),
            "SELECT * FROM \"s\".\"t\""
        );
    }

    #[test]
    fn test_select_query_with_filter() {
        let filter = translate(
            Dialect::Postgres,
            &[
                Qualifier::new("age", QualOperator::Gt, QualValue::Int64(30)),
                Qualifier::unary("deleted_at", QualOperator::IsNull),
            ],
        );

        assert_eq!(
            source().select_query("public", "people", &filter),
            "SELECT * FROM \"public\".\"people\" WHERE \"age\" > 30 AND \"deleted_at\" IS NULL"
        );
    }

    #[test]
    fn test_debug_hides_connection_string() {
        let rendered = format!("{:?}", RemoteSource::new("postgresql://u:secret@h/db", Dialect::Postgres));
        assert!(!rendered.contains("secret"));
    }
}
