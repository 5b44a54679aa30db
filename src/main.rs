use clap::Parser;
use fileclerk::cli::{Cli, run_cli};
use fileclerk::logging::init_tracing;
use fileclerk::output::OutputFormatter;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_level, cli.log_json) {
        eprintln!("Warning: could not initialize logging: {}", e);
    }

    match run_cli(&cli.command) {
        Ok(summary) if summary.failed == 0 => ExitCode::SUCCESS,
        Ok(summary) => {
            OutputFormatter::error(&format!(
                "{} of {} files could not be relocated",
                summary.failed,
                summary.total()
            ));
            ExitCode::from(1)
        }
        Err(e) => {
            OutputFormatter::error(&format!("Error: {}", e));
            ExitCode::from(2)
        }
    }
}
