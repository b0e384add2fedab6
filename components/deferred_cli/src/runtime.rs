//! Scenario execution
//!
//! The Runner builds the futures for a [`Scenario`] on its own event loop,
//! runs the loop until nothing is left to do and reports how the outermost
//! future ended up.

use crate::cli::Scenario;
use crate::error::{CliError, CliResult};
use deferred::{EventLoop, Future, LoopConfig, Outcome, RunStats};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

type Demo = Future<Value, String>;

/// How a scenario ended
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Scenario name
    pub scenario: String,
    /// Final state of the outermost future
    pub state: String,
    /// Fulfillment value, if fulfilled
    pub value: Option<Value>,
    /// Rejection error, if rejected
    pub error: Option<String>,
    /// Loop time elapsed while running
    pub elapsed_ms: u64,
    /// What the loop executed
    pub stats: RunStats,
    /// Loop configuration used
    pub config: LoopConfig,
}

impl Report {
    /// Process exit code: 0 fulfilled, 2 rejected, 3 still pending
    pub fn exit_code(&self) -> i32 {
        match (self.value.is_some(), self.error.is_some()) {
            (true, _) => 0,
            (_, true) => 2,
            _ => 3,
        }
    }

    /// Render as a single human-readable line, or as JSON
    pub fn render(&self, as_json: bool) -> CliResult<String> {
        if as_json {
            return Ok(serde_json::to_string(self)?);
        }
        Ok(match (&self.value, &self.error) {
            (Some(value), _) => format!("fulfilled: {} after {}ms", value, self.elapsed_ms),
            (_, Some(error)) => format!("rejected: {} after {}ms", error, self.elapsed_ms),
            _ => format!("pending: nothing left to run after {}ms", self.elapsed_ms),
        })
    }
}

/// Runs scenarios on an event loop
pub struct Runner {
    event_loop: EventLoop,
}

impl Runner {
    /// Create a runner with a fresh loop built from `config`
    ///
    /// # Example
    /// ```
    /// use deferred::{ClockMode, LoopConfig};
    /// use deferred_cli::{Runner, Scenario};
    ///
    /// let mut runner = Runner::new(LoopConfig::new().with_clock(ClockMode::Virtual));
    /// let report = runner.run(&Scenario::Recover { message: "boom".into() }).unwrap();
    /// assert_eq!(report.state, "fulfilled");
    /// ```
    pub fn new(config: LoopConfig) -> Self {
        Self {
            event_loop: EventLoop::with_config(config),
        }
    }

    /// Get access to the event loop
    pub fn event_loop(&mut self) -> &mut EventLoop {
        &mut self.event_loop
    }

    /// Build `scenario`, drive the loop to completion and report
    ///
    /// # Errors
    /// Returns `CliError` if the arguments cannot describe a run or the
    /// loop aborts
    pub fn run(&mut self, scenario: &Scenario) -> CliResult<Report> {
        let started = self.event_loop.now();
        let future = self.build(scenario)?;
        let stats = self.event_loop.run_until_done()?;
        let elapsed = self.event_loop.now().saturating_sub(started);

        let state = future.state();
        info!(scenario = scenario.name(), %state, ?stats, "scenario finished");

        Ok(Report {
            scenario: scenario.name().to_string(),
            state: state.to_string(),
            value: future.value(),
            error: future.error(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            stats,
            config: self.event_loop.config().clone(),
        })
    }

    fn build(&self, scenario: &Scenario) -> CliResult<Demo> {
        let s = self.event_loop.scheduler();
        let demo = match scenario {
            Scenario::Chain { value, delay_ms } => {
                let delay = Duration::from_millis(*delay_ms);
                let start = Future::<i64, String>::resolve(&s, Outcome::Plain(*value));
                let inner = start.scheduler().clone();
                start
                    .and_then(move |v| {
                        let doubled = v
                            .checked_mul(2)
                            .ok_or_else(|| format!("doubling {} overflows", v))?;
                        Ok(Outcome::Chained(Future::resolve_delay(
                            &inner,
                            Outcome::Plain(doubled),
                            delay,
                        )))
                    })
                    .and_then(|v| Ok(Outcome::Plain(json!(v))))
            }
            Scenario::All {
                values,
                fail_index,
                delay_ms,
            } => {
                if let Some(index) = fail_index.filter(|&i| i >= values.len()) {
                    return Err(CliError::InvalidArgument(format!(
                        "fail index {} is out of range for {} values",
                        index,
                        values.len()
                    )));
                }
                let members = values
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| {
                        let steps = (values.len() - i) as u64;
                        let delay = delay_ms.checked_mul(steps).ok_or_else(|| {
                            CliError::InvalidArgument(format!(
                                "delay of {}ms times {} overflows",
                                delay_ms, steps
                            ))
                        })?;
                        let delay = Duration::from_millis(delay);
                        Ok(if Some(i) == *fail_index {
                            Future::reject_delay(&s, format!("member {} failed", i), delay)
                        } else {
                            Future::resolve_delay(&s, Outcome::Plain(v), delay)
                        })
                    })
                    .collect::<CliResult<Vec<_>>>()?;
                Future::<i64, String>::all(&s, members)
                    .and_then(|values| Ok(Outcome::Plain(json!(values))))
            }
            Scenario::Race { delays_ms } => {
                let members = delays_ms
                    .iter()
                    .enumerate()
                    .map(|(i, &ms)| {
                        Future::resolve_delay(
                            &s,
                            Outcome::Plain(i as i64),
                            Duration::from_millis(ms),
                        )
                    })
                    .collect();
                Future::<i64, String>::race(&s, members)
                    .and_then(|winner| Ok(Outcome::Plain(json!(winner))))
            }
            Scenario::Delay {
                value,
                delay_ms,
                reject,
            } => {
                let delay = Duration::from_millis(*delay_ms);
                let delayed: Future<i64, String> = if *reject {
                    Future::reject_delay(&s, format!("rejected after {}ms", delay_ms), delay)
                } else {
                    Future::resolve_delay(&s, Outcome::Plain(*value), delay)
                };
                delayed.and_then(|v| Ok(Outcome::Plain(json!(v))))
            }
            Scenario::Recover { message } => {
                Future::<String, String>::reject(&s, message.clone())
                    .catch(|e| Ok(Outcome::Plain(format!("recovered: {}", e))))
                    .and_then(|v| Ok(Outcome::Plain(json!(v))))
            }
        };
        Ok(demo)
    }
}
