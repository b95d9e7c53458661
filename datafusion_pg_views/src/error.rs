use arrow_schema::ArrowError;
use datafusion::error::DataFusionError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Can't connect to the database: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Error inspecting schema {schema:?}: {source}")]
    Discovery {
        schema: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Error while making query \"{query}\": {source}")]
    Query {
        query: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Error while reading column {column:?} of query \"{query}\": {reason}")]
    RowDecode {
        query: String,
        column: String,
        reason: String,
    },

    #[error("Unknown dialect {name:?}")]
    UnknownDialect { name: String },

    #[error("Invalid table pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("Can't load column {column:?} of table {table}: {reason}")]
    Assembly {
        table: String,
        column: String,
        reason: String,
    },

    #[error("Table {name:?} doesn't exist")]
    TableNotFound { name: String },

    #[error("The raw table requires a filter of the form query = '<SQL>'")]
    MissingRawQuery,

    #[error("Failed assembling the result batch: {0}")]
    Arrow(#[from] ArrowError),
}

/// Errors surface inside DataFusion plans (schema lookups, scans), so we want them
/// to be usable with `?` there. Everything but planning mistakes keeps the original
/// error as the source.
impl From<Error> for DataFusionError {
    fn from(val: Error) -> Self {
        match val {
            Error::TableNotFound { .. } | Error::MissingRawQuery => {
                DataFusionError::Plan(val.to_string())
            }
            _ => DataFusionError::External(Box::new(val)),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
