//! deferred demo CLI
//!
//! Entry point for the scenario runner. Parses CLI arguments, installs the
//! log subscriber and delegates to the Runner.

use clap::Parser as ClapParser;
use deferred_cli::{logging, Cli, CliError, Runner};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level());

    let mut runner = Runner::new(cli.loop_config());
    match runner.run(&cli.scenario) {
        Ok(report) => {
            match report.render(cli.json) {
                Ok(line) => println!("{}", line),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
            std::process::exit(report.exit_code());
        }
        Err(CliError::InvalidArgument(e)) => {
            eprintln!("Invalid argument: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
