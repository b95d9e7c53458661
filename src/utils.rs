use std::io::Write;

use arrow::json::LineDelimitedWriter;
use datafusion::error::Result;

use crate::context::PgViewContext;

// Run a one-off command and output its results to a writer, one JSON object per row
pub async fn run_one_off_command<W>(
    context: &PgViewContext,
    command: &str,
    mut output: W,
) -> Result<()>
where
    W: Write,
{
    // Plan everything first, so that a typo in the last statement doesn't leave the
    // earlier ones half-run
    let mut plans = vec![];
    for logical in context.create_logical_plans(command).await? {
        plans.push(context.create_physical_plan(&logical).await?);
    }

    for plan in plans {
        let batches = context.collect(plan).await?;

        let mut writer = LineDelimitedWriter::new(&mut output);
        writer.write_batches(&batches.iter().collect::<Vec<_>>())?;
        writer.finish()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::run_one_off_command;
    use crate::context::test_utils::offline_context;

    #[tokio::test]
    async fn test_command_splitting() {
        let mut buf = Vec::new();
        let context = offline_context();

        run_one_off_command(&context, "SELECT 1; SELECT 'a;b' AS s", &mut buf)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "{\"Int64(1)\":1}\n{\"s\":\"a;b\"}\n"
        );
    }

    #[tokio::test]
    async fn test_error_runs_nothing() {
        let mut buf = Vec::new();
        let context = offline_context();

        let err = run_one_off_command(&context, "SELECT 1; SELECT nope FROM orders", &mut buf)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("nope"));
        assert!(buf.is_empty());
    }
}
