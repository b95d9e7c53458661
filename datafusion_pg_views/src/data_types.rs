use arrow_schema::{DataType, TimeUnit};
use sqlx::postgres::PgTypeInfo;
use sqlx::TypeInfo;
use strum_macros::{Display, EnumString};

/// The fixed set of column shapes we describe to the query engine, independent of the
/// native type vocabulary of the source database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum AbstractColumnType {
    String,
    Bool,
    Double,
    Int,
    Json,
    Timestamp,
    Inet,
    Cidr,
    /// No safe mapping exists; such columns are never exposed nor queryable.
    Unknown,
}

impl AbstractColumnType {
    /// Classify a column by its canonical database type name.
    ///
    /// This is a plain allow-list with case-sensitive matching: supporting a new native type
    /// means adding it to one of the arms below.
    pub fn from_native(native_db_type: &str) -> Self {
        match native_db_type {
            "TEXT" | "_TEXT" | "UUID" => Self::String,
            "BOOL" | "BOOLEAN" => Self::Bool,
            "DOUBLE PRECISION" | "FLOAT8" | "FLOAT4" | "NUMERIC" | "DECIMAL" | "CURRENCY" => {
                Self::Double
            }
            "INT4" | "INT8" | "INTEGER" => Self::Int,
            "JSON" | "JSONB" => Self::Json,
            "TIMESTAMP" => Self::Timestamp,
            "INET" => Self::Inet,
            "CIDR" => Self::Cidr,
            _ => Self::Unknown,
        }
    }

    /// Arrow type used to carry values of this column in record batches
    pub fn to_arrow(&self) -> Option<DataType> {
        match self {
            Self::String | Self::Json | Self::Inet | Self::Cidr => Some(DataType::Utf8),
            Self::Bool => Some(DataType::Boolean),
            Self::Double => Some(DataType::Float64),
            Self::Int => Some(DataType::Int64),
            Self::Timestamp => Some(DataType::Timestamp(TimeUnit::Microsecond, None)),
            Self::Unknown => None,
        }
    }

    /// Name of the Rust type the row decoder produces for this column
    pub fn scan_type(&self) -> &'static str {
        match self {
            Self::String | Self::Inet | Self::Cidr => "String",
            Self::Bool => "bool",
            Self::Double => "f64",
            Self::Int => "i64",
            Self::Timestamp => "NaiveDateTime",
            Self::Json | Self::Unknown => "Vec<u8>",
        }
    }
}

/// Character types that have no abstract mapping but whose values are still plain strings.
const TEXT_CATEGORY: &[&str] = &["TEXT", "VARCHAR", "BPCHAR", "CHAR", "NAME", "CITEXT", "UNKNOWN"];

/// Whether values of the native type are character strings, as opposed to documents,
/// addresses or binary data that merely have a text representation
pub fn is_text_category(native_db_type: &str) -> bool {
    TEXT_CATEGORY.contains(&native_db_type)
}

/// Name of the Rust type the row decoder produces for a native type
pub fn native_scan_type(native_db_type: &str) -> &'static str {
    if is_text_category(native_db_type) {
        return "String";
    }
    AbstractColumnType::from_native(native_db_type).scan_type()
}

/// Canonical, upper-case type name of a Postgres column, e.g. `INT4` or `JSONB`.
///
/// sqlx names array types `TEXT[]`, whereas the catalog (and the type mapping) uses the
/// underscore-prefixed element name, `_TEXT`.
pub fn native_type_name(type_info: &PgTypeInfo) -> String {
    let name = type_info.name().to_ascii_uppercase();
    match name.strip_suffix("[]") {
        Some(element) => format!("_{element}"),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::{is_text_category, native_scan_type, AbstractColumnType};
    use arrow_schema::{DataType, TimeUnit};
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case("TEXT", AbstractColumnType::String)]
    #[case("_TEXT", AbstractColumnType::String)]
    #[case("UUID", AbstractColumnType::String)]
    #[case("BOOL", AbstractColumnType::Bool)]
    #[case("BOOLEAN", AbstractColumnType::Bool)]
    #[case("DOUBLE PRECISION", AbstractColumnType::Double)]
    #[case("FLOAT8", AbstractColumnType::Double)]
    #[case("FLOAT4", AbstractColumnType::Double)]
    #[case("NUMERIC", AbstractColumnType::Double)]
    #[case("DECIMAL", AbstractColumnType::Double)]
    #[case("CURRENCY", AbstractColumnType::Double)]
    #[case("INT4", AbstractColumnType::Int)]
    #[case("INT8", AbstractColumnType::Int)]
    #[case("INTEGER", AbstractColumnType::Int)]
    #[case("JSON", AbstractColumnType::Json)]
    #[case("JSONB", AbstractColumnType::Json)]
    #[case("TIMESTAMP", AbstractColumnType::Timestamp)]
    #[case("INET", AbstractColumnType::Inet)]
    #[case("CIDR", AbstractColumnType::Cidr)]
    fn test_known_native_types(#[case] native: &str, #[case] expected: AbstractColumnType) {
        assert_eq!(AbstractColumnType::from_native(native), expected)
    }

    #[rstest]
    #[case::empty("")]
    #[case::lowercase("text")]
    #[case::mixed_case("Int4")]
    #[case::padded(" INT4")]
    #[case::small_int("INT2")]
    #[case::varchar("VARCHAR")]
    #[case::timestamptz("TIMESTAMPTZ")]
    #[case::int_array("_INT4")]
    #[case::bytea("BYTEA")]
    #[case::date("DATE")]
    fn test_unknown_native_types(#[case] native: &str) {
        assert_eq!(
            AbstractColumnType::from_native(native),
            AbstractColumnType::Unknown
        )
    }

    #[test]
    fn test_arrow_types() {
        assert_eq!(AbstractColumnType::Json.to_arrow(), Some(DataType::Utf8));
        assert_eq!(
            AbstractColumnType::Timestamp.to_arrow(),
            Some(DataType::Timestamp(TimeUnit::Microsecond, None))
        );
        assert_eq!(AbstractColumnType::Unknown.to_arrow(), None);
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(AbstractColumnType::Cidr.to_string(), "CIDR");
        assert_eq!(
            AbstractColumnType::from_str("TIMESTAMP").unwrap(),
            AbstractColumnType::Timestamp
        );
    }

    #[rstest]
    #[case("TEXT", true)]
    #[case("VARCHAR", true)]
    #[case("BPCHAR", true)]
    #[case("NAME", true)]
    #[case("UUID", false)]
    #[case("JSONB", false)]
    #[case("INET", false)]
    #[case("BYTEA", false)]
    #[case("_TEXT", false)]
    fn test_text_category(#[case] native: &str, #[case] expected: bool) {
        assert_eq!(is_text_category(native), expected)
    }

    #[test]
    fn test_native_scan_type() {
        assert_eq!(native_scan_type("VARCHAR"), "String");
        assert_eq!(native_scan_type("INT8"), "i64");
        assert_eq!(native_scan_type("BYTEA"), "Vec<u8>");
    }
}
