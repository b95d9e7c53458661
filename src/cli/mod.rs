mod commands;
mod helper;

use std::sync::Arc;
use std::time::Instant;

use arrow::util::pretty::pretty_format_batches_with_options;
use commands::{all_commands_info, Command};
use datafusion_common::Result;
use helper::CliHelper;
use rustyline::history::DefaultHistory;
use rustyline::{error::ReadlineError, Editor};

use crate::context::PgViewContext;

const HISTORY_FILE: &str = ".pgview_history";

pub struct PgViewCli {
    ctx: Arc<PgViewContext>,
}

impl PgViewCli {
    // Instantiate new CLI instance
    pub fn new(ctx: Arc<PgViewContext>) -> Self {
        PgViewCli { ctx }
    }

    // Interactive loop for running commands from a CLI
    pub async fn repl_loop(&self) -> rustyline::Result<()> {
        let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
        rl.set_helper(Some(CliHelper {}));
        rl.load_history(HISTORY_FILE).ok();

        loop {
            match rl.readline(format!("{}> ", self.ctx.schema_name()).as_str()) {
                Ok(line) if line.starts_with('\\') => {
                    rl.add_history_entry(line.trim_end())?;
                    let command = line.split_whitespace().collect::<Vec<_>>().join(" ");
                    if let Ok(cmd) = &command[1..].parse::<Command>() {
                        match cmd {
                            Command::Quit => break,
                            _ => {
                                if let Err(e) = self.handle_command(cmd).await {
                                    eprintln!("{e}")
                                }
                            }
                        }
                    } else {
                        eprintln!("'\\{}' is not a valid command", &line[1..]);
                    }
                }
                Ok(line) => {
                    rl.add_history_entry(line.trim_end())?;

                    if let Err(err) = self.exec_and_print(&line).await {
                        eprintln!("{err}")
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("\\q");
                    break;
                }
                Err(err) => {
                    eprintln!("Error while reading input: {err:?}");
                    break;
                }
            }
        }

        rl.save_history(HISTORY_FILE)
    }

    // Handle a client command
    async fn handle_command(&self, cmd: &Command) -> Result<()> {
        match cmd {
            Command::Help => {
                let help = all_commands_info()?;
                println!(
                    "{}",
                    pretty_format_batches_with_options(&[help], &Default::default())?
                );
                Ok(())
            }
            Command::ListTables => self.exec_and_print("SHOW TABLES").await,
            Command::DescribeTable(name) => match self.ctx.describe_table(name)? {
                Some(description) => {
                    println!(
                        "{}",
                        pretty_format_batches_with_options(
                            &[description],
                            &Default::default()
                        )?
                    );
                    Ok(())
                }
                None => {
                    self.exec_and_print(&format!("SHOW COLUMNS FROM {name}"))
                        .await
                }
            },
            Command::Refresh => {
                let count = self.ctx.refresh().await?;
                println!("Exposing {count} view(s)");
                Ok(())
            }
            // Handled by the REPL loop itself
            Command::Quit => Ok(()),
        }
    }

    // Execute provided statement(s) and print the output
    async fn exec_and_print(&self, query: &str) -> Result<()> {
        let now = Instant::now();

        // Generate physical plans from all the statements before running any of them
        let mut plans = vec![];
        for logical in self.ctx.create_logical_plans(query).await? {
            plans.push(self.ctx.create_physical_plan(&logical).await?);
        }

        // Collect batches and print them
        for plan in plans {
            let batches = self.ctx.collect(plan).await?;
            if !batches.is_empty() {
                println!(
                    "{}",
                    pretty_format_batches_with_options(&batches, &Default::default())?
                );
            }
        }
        println!("Time: {:.3}s", now.elapsed().as_secs_f64());

        Ok(())
    }
}
