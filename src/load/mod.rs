//! Load driver
//!
//! Runs a fixed number of virtual users, each on its own OS thread, that
//! emit spans back to back through a shared [`SpanEmitter`]. Every virtual
//! user keeps its own local count next to the shared span counter, so the
//! two can be compared after the run.

use crate::config::LoadConfig;
use crate::telemetry::{SpanEmitter, INVALID_TRACE_ID};
use std::collections::HashSet;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Outcome of a [`LoadRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    /// Spans emitted by all virtual users combined.
    pub emitted: u64,
    /// Shared counter value once every virtual user finished.
    pub counter: u64,
    /// Distinct valid trace ids returned.
    pub distinct_trace_ids: usize,
    /// Returned ids that were all zeros (no pipeline ready).
    pub invalid_trace_ids: u64,
    pub elapsed: Duration,
}

/// Drives concurrent span emission.
#[derive(Debug, Clone)]
pub struct LoadRunner {
    emitter: SpanEmitter,
    virtual_users: usize,
    iterations: u64,
    span_name: String,
}

impl LoadRunner {
    pub fn new(emitter: SpanEmitter, config: &LoadConfig) -> Self {
        Self {
            emitter,
            virtual_users: config.virtual_users.max(1),
            iterations: config.iterations,
            span_name: config.span_name.clone(),
        }
    }

    /// Run every virtual user to completion.
    pub fn run(&self) -> LoadReport {
        let start = Instant::now();

        let tallies: Vec<UserTally> = thread::scope(|s| {
            let handles: Vec<_> = (0..self.virtual_users)
                .map(|user| s.spawn(move || self.run_user(user)))
                .collect();

            handles
                .into_iter()
                .enumerate()
                .filter_map(|(user, handle)| match handle.join() {
                    Ok(tally) => Some(tally),
                    Err(_) => {
                        error!(user, "virtual user panicked");
                        None
                    }
                })
                .collect()
        });

        let mut distinct = HashSet::new();
        let mut emitted = 0;
        let mut invalid_trace_ids = 0;
        for tally in tallies {
            emitted += tally.emitted;
            invalid_trace_ids += tally.invalid;
            distinct.extend(tally.trace_ids);
        }

        let report = LoadReport {
            emitted,
            counter: self.emitter.counter().last_observed(),
            distinct_trace_ids: distinct.len(),
            invalid_trace_ids,
            elapsed: start.elapsed(),
        };

        info!(
            emitted = report.emitted,
            counter = report.counter,
            distinct = report.distinct_trace_ids,
            invalid = report.invalid_trace_ids,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "load run finished"
        );
        report
    }

    fn run_user(&self, user: usize) -> UserTally {
        let mut tally = UserTally::default();

        for _ in 0..self.iterations {
            let trace_id = self.emitter.emit_span(&self.span_name);
            tally.emitted += 1;
            info!(
                user,
                "{trace_id} sent. otlpext counter:{} local counter:{}",
                self.emitter.counter().last_observed(),
                tally.emitted
            );
            tally.record(&trace_id);
        }

        tally
    }
}

/// Per virtual user results. Trace ids are kept as integers, not strings.
#[derive(Debug, Default)]
struct UserTally {
    emitted: u64,
    invalid: u64,
    trace_ids: HashSet<u128>,
}

impl UserTally {
    fn record(&mut self, trace_id: &str) {
        if trace_id == INVALID_TRACE_ID {
            self.invalid += 1;
            return;
        }
        match u128::from_str_radix(trace_id, 16) {
            Ok(id) => {
                self.trace_ids.insert(id);
            }
            Err(_) => warn!(trace_id, "emitter returned a malformed trace id"),
        }
    }
}
