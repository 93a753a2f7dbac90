use clap::Parser;
use godot_gate::{CliArgs, LoggingConfig, init_logging, run};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let _guard = match init_logging(LoggingConfig::from_env()) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("warning: logging disabled: {:#}", err);
            None
        }
    };

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
