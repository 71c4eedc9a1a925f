/*
 * Copyright 2026 Oxide Computer Company
 */

pub mod job;
pub mod runner;
pub mod ssh;
