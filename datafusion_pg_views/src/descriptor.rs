use std::sync::Arc;

use arrow_schema::{Field, Schema, SchemaRef};
use glob::{MatchOptions, Pattern};
use tracing::{debug, warn};

use crate::data_types::AbstractColumnType;
use crate::discovery::View;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: AbstractColumnType,
}

/// The engine-facing shape of a discovered view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
    pub schema_name: String,
    pub columns: Vec<ColumnDescriptor>,
    /// Columns that filters may be pushed down on; every typed column qualifies.
    pub key_columns: Vec<String>,
    /// The view this descriptor was synthesized from
    pub view: View,
}

impl TableDescriptor {
    pub fn synthesize(view: &View) -> Self {
        let mut columns = Vec::with_capacity(view.columns.len());

        for col in &view.columns {
            let column_type = AbstractColumnType::from_native(&col.native_db_type);
            if column_type == AbstractColumnType::Unknown {
                warn!(
                    "Skipping column {:?} of view {}.{}: unsupported type {}",
                    col.name, view.schema_name, view.name, col.native_db_type
                );
                continue;
            }

            columns.push(ColumnDescriptor {
                name: col.name.clone(),
                column_type,
            });
        }

        let key_columns = columns.iter().map(|c| c.name.clone()).collect();

        Self {
            name: view.name.clone(),
            schema_name: view.schema_name.clone(),
            columns,
            key_columns,
            view: view.clone(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Native database type of a column of the underlying view
    pub fn native_type(&self, name: &str) -> Option<&str> {
        self.view
            .columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.native_db_type.as_str())
    }

    pub fn is_key_column(&self, name: &str) -> bool {
        self.key_columns.iter().any(|k| k == name)
    }

    pub fn arrow_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .columns
            .iter()
            .filter_map(|c| {
                c.column_type
                    .to_arrow()
                    .map(|data_type| Field::new(&c.name, data_type, true))
            })
            .collect();

        Arc::new(Schema::new(fields))
    }
}

/// Compile table name patterns, e.g. `["orders_*", "customers"]`
pub fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|source| Error::InvalidPattern {
                pattern: p.clone(),
                source,
            })
        })
        .collect()
}

/// Pick the views to expose.
///
/// Patterns are tried in order and a view is picked by the first pattern that matches its
/// name, so the result is grouped by pattern and never contains a view twice.
pub fn select_views(views: Vec<View>, patterns: &[Pattern]) -> Vec<View> {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut remaining: Vec<Option<View>> = views.into_iter().map(Some).collect();
    let mut selected = vec![];

    for pattern in patterns {
        for slot in remaining.iter_mut() {
            let matches = slot
                .as_ref()
                .is_some_and(|v| pattern.matches_with(&v.name, options));

            if matches {
                if let Some(view) = slot.take() {
                    debug!("Pattern {} picked view {}", pattern.as_str(), view.name);
                    selected.push(view);
                }
            }
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use arrow_schema::DataType;
    use rstest::rstest;

    use super::{compile_patterns, select_views, ColumnDescriptor, TableDescriptor};
    use crate::data_types::AbstractColumnType;
    use crate::discovery::{Column, View};
    use crate::error::Error;

    fn column(name: &str, native: &str) -> Column {
        Column {
            name: name.to_string(),
            native_scan_type: AbstractColumnType::from_native(native)
                .scan_type()
                .to_string(),
            native_db_type: native.to_string(),
        }
    }

    fn view(name: &str, columns: Vec<Column>) -> View {
        View {
            schema_name: "public".to_string(),
            name: name.to_string(),
            columns,
            primary_key: vec![],
        }
    }

    #[test]
    fn test_synthesize_drops_unknown_columns() {
        let v = view(
            "orders",
            vec![
                column("id", "INT8"),
                column("shape", "GEOMETRY"),
                column("note", "TEXT"),
                column("tags", "_INT4"),
                column("payload", "JSONB"),
                column("placed_at", "TIMESTAMP"),
            ],
        );

        let descriptor = TableDescriptor::synthesize(&v);

        assert_eq!(descriptor.name, "orders");
        assert_eq!(descriptor.schema_name, "public");
        assert_eq!(
            descriptor.columns,
            vec![
                ColumnDescriptor {
                    name: "id".to_string(),
                    column_type: AbstractColumnType::Int
                },
                ColumnDescriptor {
                    name: "note".to_string(),
                    column_type: AbstractColumnType::String
                },
                ColumnDescriptor {
                    name: "payload".to_string(),
                    column_type: AbstractColumnType::Json
                },
                ColumnDescriptor {
                    name: "placed_at".to_string(),
                    column_type: AbstractColumnType::Timestamp
                },
            ]
        );
        assert_eq!(
            descriptor.key_columns,
            vec!["id", "note", "payload", "placed_at"]
        );
        assert!(!descriptor.is_key_column("shape"));
        assert_eq!(descriptor.native_type("payload"), Some("JSONB"));
        assert_eq!(descriptor.native_type("missing"), None);
        assert_eq!(descriptor.view, v);

        let schema = descriptor.arrow_schema();
        assert_eq!(schema.fields().len(), 4);
        assert_eq!(schema.field(0).data_type(), &DataType::Int64);
        assert_eq!(schema.field(2).data_type(), &DataType::Utf8);
    }

    #[test]
    fn test_synthesize_no_classifiable_columns() {
        let descriptor =
            TableDescriptor::synthesize(&view("blobs", vec![column("data", "BYTEA")]));

        assert!(descriptor.columns.is_empty());
        assert!(descriptor.key_columns.is_empty());
        assert!(descriptor.arrow_schema().fields().is_empty());
    }

    #[rstest]
    #[case::match_all(vec!["*"], vec!["a_1", "a_2", "b_1"])]
    #[case::prefix(vec!["a_*"], vec!["a_1", "a_2"])]
    #[case::pattern_order(vec!["b_*", "a_*"], vec!["b_1", "a_1", "a_2"])]
    #[case::first_match_wins(vec!["a_1", "*"], vec!["a_1", "a_2", "b_1"])]
    #[case::single_char(vec!["?_2"], vec!["a_2"])]
    #[case::no_match(vec!["c*"], vec![])]
    #[case::no_patterns(vec![], vec![])]
    fn test_select_views(#[case] patterns: Vec<&str>, #[case] expected: Vec<&str>) {
        let views = vec![view("a_1", vec![]), view("a_2", vec![]), view("b_1", vec![])];
        let patterns: Vec<String> = patterns.into_iter().map(String::from).collect();

        let selected = select_views(views, &compile_patterns(&patterns).unwrap());

        assert_eq!(
            selected.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
            expected
        );
    }

    #[test]
    fn test_invalid_pattern() {
        let err = compile_patterns(&["[a".to_string()]).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { ref pattern, .. } if pattern == "[a"));
    }
}
