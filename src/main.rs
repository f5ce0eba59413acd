use std::io::stdout;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::filter::EnvFilter;

use sqlbench::cli::{run_one_off_command, SqlbenchCli};
use sqlbench::config::context::build_context;
use sqlbench::config::schema::{load_config, DEFAULT_CONFIG_FILE};

#[derive(Debug, Parser)]
#[clap(name = "sqlbench", about = "Local workbench for embedded SQLite databases")]
struct Args {
    #[clap(short, long, help = "Path to the config file")]
    config_path: Option<PathBuf>,

    #[clap(
        long,
        help = "Run statements against the active database, print the result as JSON and exit"
    )]
    one_off: Option<String>,

    #[clap(long, help = "Output logs in JSON format")]
    json_logs: bool,
}

fn prepare_tracing(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sqlbench={}", Level::INFO)));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    prepare_tracing(args.json_logs);

    // A missing default config just means built-in defaults
    let (config_path, required) = match args.config_path {
        Some(path) => (path, true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };

    let config = match load_config(&config_path, required) {
        Ok(config) => config,
        Err(e) => {
            error!("Error loading the config from {}: {e}", config_path.display());
            return ExitCode::FAILURE;
        }
    };

    let context = match build_context(config).await {
        Ok(context) => context,
        Err(e) => {
            error!("Error starting the session: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(one_off) = args.one_off {
        let mut context = context;
        return match run_one_off_command(&mut context, &one_off, stdout()).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    info!("Starting the interactive session, \\? for help");
    match SqlbenchCli::new(context).repl_loop().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
