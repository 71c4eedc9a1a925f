/*
 * Copyright 2026 Oxide Computer Company
 */

use serde::{Deserialize, Serialize};

/**
 * An SSH session held open by a job through the SSH gateway.  The gateway
 * uses capitalised field names.
 */
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SshSession {
    pub connected_at: String,
    #[serde(default)]
    pub command: String,
    pub hostname: String,
    pub port: u16,
    pub actor: String,
    #[serde(default)]
    pub rx: u64,
    #[serde(default)]
    pub tx: u64,
    #[serde(default)]
    pub connections: u32,
}
