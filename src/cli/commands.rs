use std::str::FromStr;
use std::sync::Arc;

use arrow::array::StringArray;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;

/// Commands available inside the CLI
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    Help,
    ListTables,
    DescribeTable(String),
    Refresh,
}

const ALL_COMMANDS: &[(&str, &str)] = &[
    ("\\d", "List tables"),
    ("\\d <table>", "Describe a table"),
    ("\\refresh", "Re-discover the views of the remote schema"),
    ("\\?", "Show this help"),
    ("\\q", "Quit"),
];

pub fn all_commands_info() -> Result<RecordBatch, ArrowError> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Command", DataType::Utf8, false),
        Field::new("Description", DataType::Utf8, false),
    ]));

    let (commands, descriptions): (Vec<&str>, Vec<&str>) = ALL_COMMANDS.iter().copied().unzip();

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(commands)),
            Arc::new(StringArray::from(descriptions)),
        ],
    )
}

impl FromStr for Command {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (c, arg) = if let Some((a, b)) = s.split_once(' ') {
            (a, Some(b))
        } else {
            (s, None)
        };
        Ok(match (c, arg) {
            ("q", None) | ("quit", None) => Self::Quit,
            ("d", None) => Self::ListTables,
            ("d", Some(name)) => Self::DescribeTable(name.into()),
            ("refresh", None) => Self::Refresh,
            ("?", None) => Self::Help,
            _ => return Err(()),
        })
    }
}
