//! Expose the views of a Postgres schema as DataFusion tables.
//!
//! Views are discovered through `information_schema`, their columns classified into a small
//! set of abstract types, and scans translate DataFusion filters into a `WHERE` clause that
//! runs on the remote database.

pub mod data_types;
pub mod descriptor;
pub mod dialect;
pub mod discovery;
pub mod error;
mod executor;
pub mod filter_pushdown;
pub mod provider;
pub mod qualifier;
pub mod raw;
pub mod row;
pub mod schema_provider;
pub mod source;

pub use data_types::AbstractColumnType;
pub use descriptor::{ColumnDescriptor, TableDescriptor};
pub use dialect::{Dialect, DialectRegistry};
pub use discovery::{Column, View};
pub use error::{Error, Result};
pub use provider::RemoteView;
pub use qualifier::{translate, QualOperator, QualValue, Qualifier, WhereClause};
pub use raw::{RawQueryTable, RAW_TABLE_NAME};
pub use row::{Row, Value};
pub use schema_provider::RemoteSchemaProvider;
pub use source::RemoteSource;
