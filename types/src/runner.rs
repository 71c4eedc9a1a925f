/*
 * Copyright 2026 Oxide Computer Company
 */

use serde::{Deserialize, Serialize};

pub const HOST_RUNNING: &str = "running";

/**
 * A server enrolled in the fleet, as reported by the runners endpoint when
 * asked for JSON output.
 */
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Host {
    pub name: String,
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub reachable: bool,
    #[serde(default)]
    pub status: String,
}

/**
 * Body of a successful repair request.
 */
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RepairResult {
    pub vms: u32,
}
