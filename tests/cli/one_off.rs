use crate::cli::*;

#[test]
fn test_missing_config() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;

    let output = Command::cargo_bin("pgview")?
        .arg("-c")
        .arg(temp_dir.path().join("nope.toml"))
        .arg("--one-off")
        .arg("SELECT 1")
        .output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error loading the config"));
    assert!(output.stdout.is_empty());
    Ok(())
}

#[test]
fn test_invalid_config() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = setup_temp_config("postgresql://localhost/db", "dialect = \"oracle\"")?;

    let output = Command::cargo_bin("pgview")?
        .arg("-c")
        .arg(temp_dir.path().join(TEST_CONFIG_FILE))
        .arg("--one-off")
        .arg("SELECT 1")
        .output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown dialect \"oracle\""));
    Ok(())
}

#[test]
fn test_unreachable_database() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = setup_temp_config("postgresql://pgview@127.0.0.1:1/db", "")?;

    let output = Command::cargo_bin("pgview")?
        .arg("-c")
        .arg(temp_dir.path().join(TEST_CONFIG_FILE))
        .arg("--one-off")
        .arg("SELECT 1")
        .output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Can't connect to the database"));
    Ok(())
}

#[tokio::test]
async fn test_one_off() -> Result<(), Box<dyn std::error::Error>> {
    let Some((dsn, schema)) = setup_remote_schema().await else {
        return Ok(());
    };
    let temp_dir = setup_temp_config(&dsn, &format!("schema = \"{schema}\""))?;

    let output = Command::cargo_bin("pgview")?
        .arg("--one-off")
        .arg("SELECT id, name FROM people_v WHERE age > 30 ORDER BY id; SELECT count(*) AS c FROM people_v")
        .arg("-c")
        .arg(temp_dir.path().join(TEST_CONFIG_FILE))
        .output()?;

    assert!(output.status.success());

    // Logs go to stderr, so stdout holds only the results
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "{\"id\":1,\"name\":\"Ann\"}\n{\"id\":3,\"name\":\"Cid\"}\n{\"c\":3}\n"
    );

    Ok(())
}

#[tokio::test]
async fn test_one_off_with_env_override() -> Result<(), Box<dyn std::error::Error>> {
    let Some((dsn, schema)) = setup_remote_schema().await else {
        return Ok(());
    };
    let temp_dir = setup_temp_config(&dsn, "")?;

    let output = Command::cargo_bin("pgview")?
        .arg("--one-off")
        .arg(format!(
            "SELECT table_name FROM information_schema.tables \
            WHERE table_schema = '{schema}' ORDER BY table_name"
        ))
        .arg("-c")
        .arg(temp_dir.path().join(TEST_CONFIG_FILE))
        .env("PGVIEW__SOURCE__SCHEMA", &schema)
        .env("PGVIEW__SOURCE__INCLUDE_TABLES", "true")
        .output()?;

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "{\"table_name\":\"people\"}\n{\"table_name\":\"people_v\"}\n{\"table_name\":\"raw\"}\n"
    );

    Ok(())
}
