/*
 * Copyright 2026 Oxide Computer Company
 */

/*!
 * Presentation of fleet state for the command line.  Nothing in here talks
 * to the network: callers hand in decoded records along with the single
 * "now" to use for the whole pass.
 */

pub mod bar;
pub mod derive;
pub mod hosts;
pub mod json;
pub mod render;
pub mod sessions;
mod table;

pub use derive::{derive, Derived, Eta};
pub use render::{render, Counts, Layout, Options};
