/*
 * Copyright 2026 Oxide Computer Company
 */

pub const DEFAULT_WIDTH: usize = 10;

const FILLED: char = '█';
const EMPTY: char = '░';
const OVERFLOW: char = '+';

/**
 * Draw a bracketed progress bar for the given fraction of the historical
 * average runtime.  A width of zero selects the default width.  Once a job
 * has gone past its average the bar stays at full length, with the last cell
 * replaced by the overflow marker.
 */
pub fn render_bar(fraction: f64, width: usize) -> String {
    let width = if width == 0 { DEFAULT_WIDTH } else { width };

    /*
     * Negative values, and NaN, are drawn as an empty bar.
     */
    let fraction = if fraction > 0.0 { fraction } else { 0.0 };

    let mut out = String::new();
    out.push('[');
    if fraction > 1.0 {
        out.extend(std::iter::repeat(FILLED).take(width - 1));
        out.push(OVERFLOW);
    } else {
        let filled = ((fraction * width as f64).floor() as usize).min(width);
        out.extend(std::iter::repeat(FILLED).take(filled));
        out.extend(std::iter::repeat(EMPTY).take(width - filled));
    }
    out.push(']');

    out
}
