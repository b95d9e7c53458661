use std::io;
use std::path::PathBuf;
use std::process::exit;
use std::sync::Arc;

use clap::Parser;
use pgview::cli::PgViewCli;
use pgview::config::context::build_context;
use pgview::config::schema::{load_config, DEFAULT_CONFIG_PATH};
use pgview::utils::run_one_off_command;
use tracing::{error, info, subscriber, warn};
use tracing_log::LogTracer;
use tracing_subscriber::filter::EnvFilter;

#[derive(Debug, Parser)]
#[clap(
    name = "pgview",
    about = "Query the views of a Postgres schema with SQL",
    version
)]
struct Args {
    #[clap(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config_path: PathBuf,

    #[clap(
        long,
        value_name = "SQL",
        help = "Run the statement(s), print the results as newline-delimited JSON and exit"
    )]
    one_off: Option<String>,

    #[clap(long, help = "Log in JSON format")]
    json_logs: bool,
}

fn prepare_tracing(json_logs: bool) {
    // Redirect all `log`'s events to our subscriber, to collect the ones from our deps too
    if let Err(e) = LogTracer::init() {
        eprintln!("Failed redirecting log events: {e}");
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("pgview=info,datafusion_pg_views=info,warn")
    });

    // Logs go to stderr, so that one-off results on stdout stay machine-readable
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr);

    let result = if json_logs {
        subscriber::set_global_default(builder.json().finish())
    } else {
        subscriber::set_global_default(builder.finish())
    };

    if let Err(e) = result {
        eprintln!("Failed setting up logging: {e}");
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    prepare_tracing(args.json_logs);

    info!("Starting pgview {}", env!("CARGO_PKG_VERSION"));

    let config = match load_config(&args.config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(
                "Error loading the config from {}: {e}",
                args.config_path.display()
            );
            exit(1);
        }
    };

    let context = match build_context(config).await {
        Ok(context) => context,
        Err(e) => {
            error!("Error discovering the remote schema: {e}");
            exit(1);
        }
    };

    if let Some(one_off_cmd) = args.one_off {
        if let Err(e) = run_one_off_command(&context, &one_off_cmd, io::stdout()).await {
            error!("{e}");
            exit(1);
        }
        return;
    }

    if let Err(e) = PgViewCli::new(Arc::new(context)).repl_loop().await {
        warn!("The CLI exited with an error: {e}");
    }
}
