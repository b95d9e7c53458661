use std::collections::HashMap;

use sqlx::{Column as _, Executor, PgConnection};

use crate::data_types::{native_scan_type, native_type_name};
use crate::discovery::Column;
use crate::error::{Error, Result};

/// Paired delimiters used to quote SQL identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierQuoting {
    DoubleQuote,
    Backtick,
    Bracket,
    Brace,
}

impl IdentifierQuoting {
    pub fn delimiters(&self) -> (char, char) {
        match self {
            Self::DoubleQuote => ('"', '"'),
            Self::Backtick => ('`', '`'),
            Self::Bracket => ('[', ']'),
            Self::Brace => ('{', '}'),
        }
    }

    /// Quote an identifier, doubling every occurrence of the closing delimiter.
    ///
    /// Identifiers are always quoted, keywords included. Backslashes are copied verbatim.
    pub fn escape(&self, ident: &str) -> String {
        let (open, close) = self.delimiters();

        let mut escaped = String::with_capacity(ident.len() + 2);
        escaped.push(open);
        for c in ident.chars() {
            escaped.push(c);
            if c == close {
                escaped.push(c);
            }
        }
        escaped.push(close);
        escaped
    }
}

/// Database flavours we know how to introspect and query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
}

const POSTGRES_RELATIONS: &str = r#"
SELECT table_schema::text, table_name::text
FROM information_schema.tables
WHERE table_type::text = ANY($1)
  AND table_schema NOT IN ('pg_catalog', 'information_schema')
ORDER BY table_schema, table_name
"#;

const POSTGRES_PRIMARY_KEY: &str = r#"
SELECT kcu.column_name::text
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_schema = tc.constraint_schema
 AND kcu.constraint_name = tc.constraint_name
WHERE tc.constraint_type = 'PRIMARY KEY'
  AND tc.table_schema = $1
  AND tc.table_name = $2
ORDER BY kcu.ordinal_position
"#;

impl Dialect {
    pub fn quoting(&self) -> IdentifierQuoting {
        match self {
            Self::Postgres => IdentifierQuoting::DoubleQuote,
        }
    }

    pub fn escape_ident(&self, ident: &str) -> String {
        self.quoting().escape(ident)
    }

    /// `schema.name`, with both parts quoted
    pub fn qualified_name(&self, schema: &str, name: &str) -> String {
        format!("{}.{}", self.escape_ident(schema), self.escape_ident(name))
    }

    /// List `(schema, name)` of every view (and optionally every base table) across all
    /// user schemas.
    pub async fn list_views(
        &self,
        conn: &mut PgConnection,
        include_tables: bool,
    ) -> Result<Vec<(String, String)>, sqlx::Error> {
        match self {
            Self::Postgres => {
                let mut kinds = vec!["VIEW"];
                if include_tables {
                    kinds.push("BASE TABLE");
                }

                sqlx::query_as(POSTGRES_RELATIONS)
                    .bind(kinds)
                    .fetch_all(&mut *conn)
                    .await
            }
        }
    }

    /// Ordered columns of a view, as reported by the server for an empty result set
    pub async fn list_columns(
        &self,
        conn: &mut PgConnection,
        schema: &str,
        name: &str,
    ) -> Result<Vec<Column>, sqlx::Error> {
        match self {
            Self::Postgres => {
                let query = format!(
                    "SELECT * FROM {} LIMIT 0",
                    self.qualified_name(schema, name)
                );
                let describe = (&mut *conn).describe(&query).await?;

                Ok(describe
                    .columns()
                    .iter()
                    .map(|c| {
                        let native_db_type = native_type_name(c.type_info());
                        Column {
                            name: c.name().to_string(),
                            native_scan_type: native_scan_type(&native_db_type)
                                .to_string(),
                            native_db_type,
                        }
                    })
                    .collect())
            }
        }
    }

    pub async fn primary_key(
        &self,
        conn: &mut PgConnection,
        schema: &str,
        name: &str,
    ) -> Result<Vec<String>, sqlx::Error> {
        match self {
            Self::Postgres => {
                sqlx::query_scalar(POSTGRES_PRIMARY_KEY)
                    .bind(schema)
                    .bind(name)
                    .fetch_all(&mut *conn)
                    .await
            }
        }
    }
}

/// Maps driver/dialect names found in configuration to a dialect.
///
/// Built once when the configuration is loaded and handed to whatever needs it.
#[derive(Debug, Clone)]
pub struct DialectRegistry {
    dialects: HashMap<String, Dialect>,
}

impl DialectRegistry {
    pub fn empty() -> Self {
        Self {
            dialects: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, dialect: Dialect) -> Option<Dialect> {
        self.dialects.insert(name.to_ascii_lowercase(), dialect)
    }

    pub fn get(&self, name: &str) -> Result<Dialect> {
        self.dialects
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| Error::UnknownDialect {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.dialects.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for DialectRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        // Postgres-compatible servers and the names their drivers commonly go by
        for name in ["postgres", "postgresql", "pgx", "pq"] {
            registry.register(name, Dialect::Postgres);
        }
        registry
    }
}
