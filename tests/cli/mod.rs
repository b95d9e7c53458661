use assert_cmd::prelude::*; // Add methods on commands
use rand::Rng;
use sqlx::{Connection, Executor, PgConnection};
use std::env;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio}; // Run programs
use tempfile::{Builder, TempDir};

mod basic;
mod one_off;

const TEST_CONFIG_FILE: &str = "pgview-test.toml";

fn get_random_schema() -> String {
    let mut rng = rand::thread_rng();
    (&mut rng)
        .sample_iter(rand::distributions::Alphanumeric)
        .filter(|c| c.is_ascii_alphabetic())
        .take(20)
        .map(|c| char::from(c).to_ascii_lowercase())
        .collect::<String>()
}

fn setup_temp_config(connection_string: &str, extra: &str) -> std::io::Result<TempDir> {
    let temp_dir = Builder::new()
        .prefix("pgview-test-dir")
        .rand_bytes(5)
        .tempdir()?;

    let mut conf_file = File::create(temp_dir.path().join(TEST_CONFIG_FILE))?;
    write!(
        conf_file,
        r#"
[source]
connection_string = "{}"
{extra}
"#,
        connection_string.escape_default()
    )?;
    Ok(temp_dir)
}

/// Create a schema with a `people_v` view in the test database, returning the connection
/// string and the schema name. `None` when DATABASE_URL isn't set.
async fn setup_remote_schema() -> Option<(String, String)> {
    let Ok(dsn) = env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let schema = get_random_schema();

    let mut conn = PgConnection::connect(&dsn).await.unwrap();
    conn.execute(
        format!(
            r#"
CREATE SCHEMA {schema};
CREATE TABLE {schema}.people (id INT PRIMARY KEY, name TEXT, age INT);
INSERT INTO {schema}.people VALUES (1, 'Ann', 34), (2, 'Bob', 25), (3, 'Cid', 41);
CREATE VIEW {schema}.people_v AS SELECT * FROM {schema}.people;
"#
        )
        .as_str(),
    )
    .await
    .unwrap();
    conn.close().await.unwrap();

    Some((dsn, schema))
}
