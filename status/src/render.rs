/*
 * Copyright 2026 Oxide Computer Company
 */

use std::io::Write;

use actuated_types::job::{decode_jobs, JobStatus};
use anyhow::Result;
use chrono::prelude::*;

use crate::bar::{render_bar, DEFAULT_WIDTH};
use crate::derive::{derive, Derived};
use crate::{json, table};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Layout {
    #[default]
    Compact,
    /**
     * Adds the job ID, runner, server, and labels.
     */
    Verbose,
    /**
     * A bordered table where the estimate cell carries a progress bar.
     */
    Progress,
}

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub layout: Layout,
    pub urls: bool,
    /**
     * Emit the response as (re-indented) JSON rather than a table.
     */
    pub json: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub total: usize,
    pub running: usize,
    pub queued: usize,
}

impl Counts {
    pub fn tally(&mut self, job: &JobStatus) {
        self.total += 1;
        if job.is_queued() {
            self.queued += 1;
        } else if job.is_in_progress() {
            self.running += 1;
        }
    }

    fn summary(&self) -> String {
        table::aligned([
            ["JOBS", "RUNNING", "QUEUED"].map(str::to_string).to_vec(),
            vec![
                self.total.to_string(),
                self.running.to_string(),
                self.queued.to_string(),
            ],
        ])
    }
}

fn header(opts: &Options) -> Vec<String> {
    let mut h = match opts.layout {
        Layout::Compact | Layout::Progress => {
            vec!["OWNER", "REPO", "JOB", "STATUS", "AGE", "ETA"]
        }
        Layout::Verbose => vec![
            "JOB ID", "OWNER", "REPO", "JOB", "RUNNER", "SERVER", "STATUS",
            "AGE", "ETA", "LABELS",
        ],
    };
    if opts.urls {
        h.push("URL");
    }

    h.into_iter().map(str::to_string).collect()
}

fn row(job: &JobStatus, d: &Derived, opts: &Options) -> Vec<String> {
    let mut r = match opts.layout {
        Layout::Compact => vec![
            job.owner.clone(),
            job.repo.clone(),
            job.job_name.clone(),
            job.status.clone(),
            d.elapsed_text(),
            d.eta_text(),
        ],
        Layout::Verbose => vec![
            job.job_id.to_string(),
            job.owner.clone(),
            job.repo.clone(),
            job.job_name.clone(),
            job.runner_name.clone().unwrap_or_default(),
            job.agent_name.clone().unwrap_or_default(),
            job.status.clone(),
            d.elapsed_text(),
            d.eta_text(),
            job.labels.join(","),
        ],
        Layout::Progress => {
            let cell = if let Some(fraction) = d.progress {
                format!("{}\n{}", d.eta, render_bar(fraction, DEFAULT_WIDTH))
            } else {
                d.eta_text()
            };

            vec![
                job.owner.clone(),
                job.repo.clone(),
                job.job_name.clone(),
                job.status.clone(),
                d.elapsed_text(),
                cell,
            ]
        }
    };
    if opts.urls {
        r.push(job.url());
    }

    r
}

/**
 * Lay out the job queue.  Rows appear in the order the server returned them;
 * the summary block is only included when there is at least one job.
 */
pub fn format_jobs(
    jobs: &[JobStatus],
    now: DateTime<Utc>,
    opts: &Options,
) -> String {
    let mut counts = Counts::default();
    let mut rows = vec![header(opts)];

    for job in jobs {
        counts.tally(job);
        rows.push(row(job, &derive(job, now), opts));
    }

    let mut out = match opts.layout {
        Layout::Compact | Layout::Verbose => table::aligned(rows),
        Layout::Progress => table::boxed(rows),
    };

    if counts.total > 0 {
        out.push('\n');
        out.push_str(&counts.summary());
    }

    out
}

/**
 * Render a job queue response body to the provided sink.  The output is
 * produced in full before anything is written, so a malformed body results
 * in an error and no output at all.
 */
pub fn render<W: Write>(
    w: &mut W,
    body: &str,
    now: DateTime<Utc>,
    opts: &Options,
) -> Result<()> {
    let out = if opts.json {
        json::pretty(body)?
    } else {
        format_jobs(&decode_jobs(body)?, now, opts)
    };

    w.write_all(out.as_bytes())?;
    w.flush()?;
    Ok(())
}
