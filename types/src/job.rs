/*
 * Copyright 2026 Oxide Computer Company
 */

use std::time::Duration;

use anyhow::Result;
use chrono::prelude::*;
use serde::{Deserialize, Serialize};

pub const STATUS_QUEUED: &str = "queued";
pub const STATUS_IN_PROGRESS: &str = "in_progress";

/**
 * One entry from the build queue, as reported by the job queue endpoint.
 */
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct JobStatus {
    pub job_id: i64,
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub workflow_name: String,
    pub job_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner_name: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(
        rename = "startedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(
        rename = "completedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,

    /**
     * The name of the server on which the runner VM was scheduled.
     */
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,

    /**
     * Historical average runtime for jobs of this name, in nanoseconds.  Zero
     * means there is no history yet.
     */
    #[serde(rename = "averageRuntime", default)]
    pub average_runtime_ns: i64,

    #[serde(
        rename = "queuedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub queued_at: Option<DateTime<Utc>>,
}

impl JobStatus {
    pub fn is_queued(&self) -> bool {
        self.status == STATUS_QUEUED
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == STATUS_IN_PROGRESS
    }

    /**
     * A negative average from the server is nonsense; treat it, like zero, as
     * no data.
     */
    pub fn average_runtime(&self) -> Duration {
        u64::try_from(self.average_runtime_ns)
            .map(Duration::from_nanos)
            .unwrap_or(Duration::ZERO)
    }

    pub fn url(&self) -> String {
        format!(
            "https://github.com/{}/{}/runs/{}",
            self.owner, self.repo, self.job_id
        )
    }
}

pub fn decode_jobs(body: &str) -> Result<Vec<JobStatus>> {
    Ok(serde_json::from_str(body)?)
}
