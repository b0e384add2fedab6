//! Command-line arguments

use clap::{ArgAction, Parser, Subcommand};
use deferred::{ClockMode, LoopConfig};
use tracing::Level;

/// Run a named future scenario on an event loop and report how it settled
#[derive(Debug, Parser)]
#[command(name = "deferred-demo", version, about)]
pub struct Cli {
    /// Run on a virtual clock instead of sleeping for real
    #[arg(long)]
    pub virtual_time: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Abort after this many tasks plus microtasks
    #[arg(long)]
    pub max_turns: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Scenario to run
    #[command(subcommand)]
    pub scenario: Scenario,
}

/// The scenarios the demo knows how to build
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Scenario {
    /// Resolve a value, then double it through a delayed future
    Chain {
        /// Starting value
        #[arg(long, default_value_t = 21)]
        value: i64,
        /// Delay of the inner future
        #[arg(long, default_value_t = 10)]
        delay_ms: u64,
    },

    /// Wait for every member; later members finish first
    All {
        /// Member values
        #[arg(long, value_delimiter = ',', default_values_t = [1, 2, 3])]
        values: Vec<i64>,
        /// Make the member at this index reject
        #[arg(long)]
        fail_index: Option<usize>,
        /// Delay step between members
        #[arg(long, default_value_t = 10)]
        delay_ms: u64,
    },

    /// Member `i` fulfills with `i` after the i-th delay; the fastest wins
    Race {
        /// Per-member delays
        #[arg(long, value_delimiter = ',', default_values_t = [50, 10])]
        delays_ms: Vec<u64>,
    },

    /// Settle a single future after a delay
    Delay {
        /// Value to fulfill with
        #[arg(long, default_value_t = 5)]
        value: i64,
        /// Delay before settling
        #[arg(long, default_value_t = 20)]
        delay_ms: u64,
        /// Reject instead of fulfilling
        #[arg(long)]
        reject: bool,
    },

    /// Reject, then recover in a catch handler
    Recover {
        /// Rejection message
        #[arg(long, default_value = "boom")]
        message: String,
    },
}

impl Scenario {
    /// Subcommand name, used in reports
    pub fn name(&self) -> &'static str {
        match self {
            Scenario::Chain { .. } => "chain",
            Scenario::All { .. } => "all",
            Scenario::Race { .. } => "race",
            Scenario::Delay { .. } => "delay",
            Scenario::Recover { .. } => "recover",
        }
    }
}

impl Cli {
    /// Event loop configuration selected by the flags
    pub fn loop_config(&self) -> LoopConfig {
        let clock = if self.virtual_time {
            ClockMode::Virtual
        } else {
            ClockMode::Real
        };
        let config = LoopConfig::new().with_clock(clock);
        match self.max_turns {
            Some(limit) => config.with_max_turns(limit),
            None => config,
        }
    }

    /// Log level selected by `-v` repetitions
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}
