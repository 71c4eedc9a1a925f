/*
 * Copyright 2026 Oxide Computer Company
 */

use std::fmt;
use std::time::Duration;

use actuated_common::{DateTimeExt, DurationExt};
use actuated_types::job::JobStatus;
use chrono::prelude::*;

/**
 * The estimate column for one job.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eta {
    /**
     * Queued jobs never get a countdown.
     */
    NoEta,
    /**
     * The job is running but there is no historical average to compare it
     * with.
     */
    Unknown,
    /**
     * Time left until the job reaches its historical average.
     */
    Remaining(Duration),
    /**
     * How far past its historical average the job has run.
     */
    Overrun(Duration),
}

impl fmt::Display for Eta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Eta::NoEta => Ok(()),
            Eta::Unknown => write!(f, "Running"),
            Eta::Remaining(d) => write!(f, "{}", d.render()),
            Eta::Overrun(d) => write!(f, "+{}", d.render()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Derived {
    /**
     * Time since the job started, rounded to whole seconds.
     */
    pub elapsed: Option<Duration>,
    pub eta: Eta,
    /**
     * Elapsed time as a fraction of the historical average.  Values above 1.0
     * mean the job has overrun.
     */
    pub progress: Option<f64>,
}

impl Derived {
    pub fn elapsed_text(&self) -> String {
        self.elapsed.map(|d| d.render()).unwrap_or_default()
    }

    pub fn eta_text(&self) -> String {
        self.eta.to_string()
    }
}

pub fn derive(job: &JobStatus, now: DateTime<Utc>) -> Derived {
    let started = job.started_at.filter(|t| !t.is_zero_instant());
    let elapsed = started.map(|t| t.age_at(now));

    if job.is_queued() {
        return Derived {
            elapsed: elapsed.map(|d| d.round_secs()),
            eta: Eta::NoEta,
            progress: None,
        };
    }

    let avg = job.average_runtime();
    let (eta, progress) = match elapsed {
        Some(elapsed) if !avg.is_zero() => {
            let eta = if elapsed <= avg {
                Eta::Remaining((avg - elapsed).round_secs())
            } else {
                Eta::Overrun((elapsed - avg).round_secs())
            };
            (eta, Some(elapsed.as_secs_f64() / avg.as_secs_f64()))
        }
        _ => (Eta::Unknown, None),
    };

    Derived { elapsed: elapsed.map(|d| d.round_secs()), eta, progress }
}
