use chrono::{DateTime, Utc};
use datafusion::scalar::ScalarValue;
use datafusion_expr::{BinaryExpr, Expr, Like, Operator};
use tracing::debug;

use crate::data_types::{is_text_category, AbstractColumnType};
use crate::descriptor::TableDescriptor;
use crate::qualifier::{QualOperator, QualValue, Qualifier};

fn op_to_qual(op: &Operator) -> Option<QualOperator> {
    Some(match op {
        Operator::Eq => QualOperator::Eq,
        Operator::NotEq => QualOperator::NotEq,
        Operator::Lt => QualOperator::Lt,
        Operator::LtEq => QualOperator::LtEq,
        Operator::Gt => QualOperator::Gt,
        Operator::GtEq => QualOperator::GtEq,
        Operator::RegexMatch => QualOperator::RegexMatch,
        Operator::RegexIMatch => QualOperator::RegexIMatch,
        Operator::RegexNotMatch => QualOperator::RegexNotMatch,
        Operator::RegexNotIMatch => QualOperator::RegexNotIMatch,
        _ => return None,
    })
}

fn timestamp_value(
    value: Option<i64>,
    to_utc: fn(i64) -> Option<DateTime<Utc>>,
) -> Option<QualValue> {
    value.and_then(to_utc).map(QualValue::Timestamp)
}

/// Convert a DataFusion literal into a qualifier value for a column of the given type.
///
/// NULL literals and literal types we don't have a faithful rendering for return `None`.
fn scalar_to_qual_value(
    value: &ScalarValue,
    column_type: AbstractColumnType,
) -> Option<QualValue> {
    let qual_value = match value {
        ScalarValue::Boolean(Some(b)) => QualValue::Bool(*b),
        ScalarValue::Int8(Some(i)) => QualValue::Int64(*i as i64),
        ScalarValue::Int16(Some(i)) => QualValue::Int64(*i as i64),
        ScalarValue::Int32(Some(i)) => QualValue::Int64(*i as i64),
        ScalarValue::Int64(Some(i)) => QualValue::Int64(*i),
        ScalarValue::UInt8(Some(i)) => QualValue::Int64(*i as i64),
        ScalarValue::UInt16(Some(i)) => QualValue::Int64(*i as i64),
        ScalarValue::UInt32(Some(i)) => QualValue::Int64(*i as i64),
        ScalarValue::UInt64(Some(i)) => QualValue::Int64(i64::try_from(*i).ok()?),
        ScalarValue::Float32(Some(f)) => QualValue::Double(*f as f64),
        ScalarValue::Float64(Some(f)) => QualValue::Double(*f),
        ScalarValue::Utf8(Some(s)) | ScalarValue::LargeUtf8(Some(s)) => match column_type {
            AbstractColumnType::Json => QualValue::Jsonb(s.clone()),
            AbstractColumnType::Inet | AbstractColumnType::Cidr => QualValue::Inet(s.clone()),
            _ => QualValue::String(s.clone()),
        },
        ScalarValue::TimestampSecond(v, _) => {
            timestamp_value(*v, |s| DateTime::from_timestamp(s, 0))?
        }
        ScalarValue::TimestampMillisecond(v, _) => {
            timestamp_value(*v, DateTime::from_timestamp_millis)?
        }
        ScalarValue::TimestampMicrosecond(v, _) => {
            timestamp_value(*v, DateTime::from_timestamp_micros)?
        }
        ScalarValue::TimestampNanosecond(v, _) => timestamp_value(*v, |ns| {
            Some(DateTime::from_timestamp_nanos(ns))
        })?,
        _ => return None,
    };

    Some(qual_value)
}

fn key_column<'a>(expr: &'a Expr, descriptor: &TableDescriptor) -> Option<&'a str> {
    match expr {
        Expr::Column(col) if descriptor.is_key_column(&col.name) => Some(&col.name),
        _ => None,
    }
}

// Whether the remote database has `op` for the column's native type. Pattern operators only
// exist for character strings; `json` and array columns only support null checks here.
fn operator_applies(op: QualOperator, native_db_type: &str) -> bool {
    match op {
        QualOperator::IsNull | QualOperator::IsNotNull => true,
        QualOperator::Like
        | QualOperator::NotLike
        | QualOperator::ILike
        | QualOperator::NotILike
        | QualOperator::RegexMatch
        | QualOperator::RegexIMatch
        | QualOperator::RegexNotMatch
        | QualOperator::RegexNotIMatch => is_text_category(native_db_type),
        _ => native_db_type != "JSON" && !native_db_type.starts_with('_'),
    }
}

fn column_literal_qualifier(
    column: &str,
    op: QualOperator,
    value: &ScalarValue,
    descriptor: &TableDescriptor,
) -> Option<Qualifier> {
    let column_type = descriptor.column(column)?.column_type;
    if !operator_applies(op, descriptor.native_type(column)?) {
        return None;
    }
    let value = scalar_to_qual_value(value, column_type)?;
    Some(Qualifier::new(column, op, value))
}

fn collect_qualifiers(
    expr: &Expr,
    descriptor: &TableDescriptor,
    qualifiers: &mut Vec<Qualifier>,
) -> Option<()> {
    match expr {
        Expr::BinaryExpr(BinaryExpr {
            left,
            op: Operator::And,
            right,
        }) => {
            collect_qualifiers(left, descriptor, qualifiers)?;
            collect_qualifiers(right, descriptor, qualifiers)?;
        }
        Expr::BinaryExpr(BinaryExpr { left, op, right }) => {
            let op = op_to_qual(op)?;
            let qualifier = match (left.as_ref(), right.as_ref()) {
                (column, Expr::Literal(value)) => column_literal_qualifier(
                    key_column(column, descriptor)?,
                    op,
                    value,
                    descriptor,
                )?,
                (Expr::Literal(value), column) => column_literal_qualifier(
                    key_column(column, descriptor)?,
                    op.mirror()?,
                    value,
                    descriptor,
                )?,
                _ => return None,
            };
            qualifiers.push(qualifier);
        }
        Expr::IsNull(inner) => qualifiers.push(Qualifier::unary(
            key_column(inner, descriptor)?,
            QualOperator::IsNull,
        )),
        Expr::IsNotNull(inner) => qualifiers.push(Qualifier::unary(
            key_column(inner, descriptor)?,
            QualOperator::IsNotNull,
        )),
        Expr::Like(Like {
            negated,
            expr,
            pattern,
            escape_char: None,
            case_insensitive,
        }) => {
            let op = match (negated, case_insensitive) {
                (false, false) => QualOperator::Like,
                (true, false) => QualOperator::NotLike,
                (false, true) => QualOperator::ILike,
                (true, true) => QualOperator::NotILike,
            };
            let Expr::Literal(value) = pattern.as_ref() else {
                return None;
            };
            qualifiers.push(column_literal_qualifier(
                key_column(expr, descriptor)?,
                op,
                value,
                descriptor,
            )?);
        }
        _ => return None,
    }

    Some(())
}

/// Convert a filter into qualifiers for the given table, if the whole filter can be shipped.
///
/// Shippable filters are comparisons between a key column and a literal, null checks on a key
/// column, `LIKE` patterns on text columns, and conjunctions of those. An operator the column's
/// native type lacks makes the filter unshippable, so DataFusion evaluates it instead.
pub fn filter_to_qualifiers(
    filter: &Expr,
    descriptor: &TableDescriptor,
) -> Option<Vec<Qualifier>> {
    let mut qualifiers = vec![];
    match collect_qualifiers(filter, descriptor, &mut qualifiers) {
        Some(()) => Some(qualifiers),
        None => {
            debug!("Filter {filter} can't be pushed down to {}", descriptor.name);
            None
        }
    }
}
