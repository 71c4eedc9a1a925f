/*
 * Copyright 2026 Oxide Computer Company
 */

use tabled::builder::Builder;
use tabled::settings::{Padding, Style};
use tabled::Table;

fn build<R>(rows: R) -> Table
where
    R: IntoIterator<Item = Vec<String>>,
{
    let mut b = Builder::default();
    for row in rows {
        b.push_record(row);
    }
    b.build()
}

/**
 * Plain columns separated by whitespace.  Each column is as wide as its
 * widest cell plus one space; trailing blanks are removed from each line.
 */
pub(crate) fn aligned<R>(rows: R) -> String
where
    R: IntoIterator<Item = Vec<String>>,
{
    let mut t = build(rows);
    t.with(Style::empty()).with(Padding::new(0, 1, 0, 0));

    let mut out = String::new();
    for line in t.to_string().lines() {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/**
 * A fully bordered table with a rule between every row, so that cells
 * spanning more than one line remain readable.
 */
pub(crate) fn boxed<R>(rows: R) -> String
where
    R: IntoIterator<Item = Vec<String>>,
{
    let mut t = build(rows);
    t.with(Style::modern());

    let mut out = t.to_string();
    out.push('\n');
    out
}

/**
 * Pipe-separated columns with a rule under the header, and no top or bottom
 * border.
 */
pub(crate) fn piped<R>(rows: R) -> String
where
    R: IntoIterator<Item = Vec<String>>,
{
    let mut t = build(rows);
    t.with(Style::markdown());

    let mut out = t.to_string();
    out.push('\n');
    out
}
