use crate::cli::*;

// We can't read from stdout until stdin is closed, so all commands get issued first and the
// output is asserted on afterwards.
#[tokio::test]
async fn test_cli_basic() -> std::io::Result<()> {
    let Some((dsn, schema)) = setup_remote_schema().await else {
        return Ok(());
    };
    let temp_dir = setup_temp_config(&dsn, &format!("schema = \"{schema}\""))?;

    let mut cmd = Command::cargo_bin("pgview").expect("pgview bin exists");
    cmd.arg("-c")
        .arg(temp_dir.path().join(TEST_CONFIG_FILE))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;
    let stdin = child.stdin.take().expect("Failed to open stdin");
    let mut expected_stdout: Vec<&str> = vec![];
    let mut expected_stderr: Vec<String> = vec![];

    writeln!(&stdin, "SELECT 'Hello World';")?;
    expected_stdout.extend(vec![
        "+---------------------+",
        "| Utf8(\"Hello World\") |",
        "+---------------------+",
        "| Hello World         |",
        "+---------------------+",
    ]);

    // Multi-line query with a filter that gets shipped to the database
    writeln!(&stdin, "SELECT id, name")?;
    writeln!(&stdin, "FROM people_v")?;
    writeln!(&stdin, "WHERE age > 30 ORDER BY id;")?;
    expected_stdout.extend(vec![
        "+----+------+",
        "| id | name |",
        "+----+------+",
        "| 1  | Ann  |",
        "| 3  | Cid  |",
        "+----+------+",
    ]);

    writeln!(&stdin, "SELECT * FROM missing;")?;
    expected_stderr.push(format!(
        "Error during planning: table 'pgview.{schema}.missing' not found"
    ));

    writeln!(&stdin, "\\d people_v")?;
    expected_stdout.extend(vec![
        "+-------------+-----------+-------------+-------------+",
        "| column_name | data_type | native_type | primary_key |",
        "+-------------+-----------+-------------+-------------+",
        "| id          | INT       | INT4        | false       |",
        "| name        | STRING    | TEXT        | false       |",
        "| age         | INT       | INT4        | false       |",
        "+-------------+-----------+-------------+-------------+",
    ]);

    writeln!(&stdin, "\\refresh")?;
    expected_stdout.push("Exposing 1 view(s)");

    writeln!(&stdin, "\\nope")?;
    expected_stderr.push("'\\nope' is not a valid command".to_string());

    writeln!(&stdin, "\\q")?;
    drop(stdin);

    let output = child.wait_with_output()?;
    assert!(output.status.success());

    // Timings vary between runs
    let stdout: Vec<String> = BufReader::new(output.stdout.as_slice())
        .lines()
        .map_while(Result::ok)
        .filter(|l| !l.starts_with("Time: "))
        .collect();
    let stdout = stdout.join("\n");
    for line in expected_stdout {
        assert!(stdout.contains(line), "stdout is missing {line:?}:\n{stdout}");
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in expected_stderr {
        assert!(stderr.contains(&line), "stderr is missing {line:?}:\n{stderr}");
    }

    Ok(())
}
