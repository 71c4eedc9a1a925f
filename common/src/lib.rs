/*
 * Copyright 2026 Oxide Computer Company
 */

use std::io::{IsTerminal, Read};
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::prelude::*;
use regex::Regex;
use serde::Deserialize;
use slog::{o, Drain, Logger};

pub fn read_toml<P: AsRef<Path>, T>(n: P) -> Result<T>
where
    for<'de> T: Deserialize<'de>,
{
    let mut f = std::fs::File::open(n.as_ref())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    Ok(toml::from_str(&buf)?)
}

fn debug_requested() -> bool {
    ["ACTUATED_DEBUG", "DEBUG"].iter().any(|n| {
        matches!(
            std::env::var(n).map(|v| v.to_ascii_lowercase()).as_deref(),
            Ok("yes") | Ok("1") | Ok("true")
        )
    })
}

/**
 * Build the logger for a command-line process.  Standard output belongs to
 * the command, so log records are always written to standard error.
 */
pub fn make_log(name: &'static str) -> Logger {
    let filter_level = if debug_requested() {
        slog::Level::Debug
    } else {
        slog::Level::Info
    };

    if std::io::stderr().is_terminal() {
        /*
         * Use a terminal-formatted logger for interactive processes.
         */
        let dec = slog_term::TermDecorator::new().stderr().build();
        let dr = Mutex::new(
            slog_term::FullFormat::new(dec).use_original_order().build(),
        )
        .filter_level(filter_level)
        .fuse();
        Logger::root(dr, o!("name" => name))
    } else {
        /*
         * Otherwise, emit bunyan-formatted records:
         */
        let dr = Mutex::new(
            slog_bunyan::with_name(name, std::io::stderr())
                .set_flush(true)
                .build(),
        )
        .filter_level(filter_level)
        .fuse();
        Logger::root(dr, o!())
    }
}

pub async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub trait DurationExt {
    /**
     * Round to the nearest whole second; exact halves round up.
     */
    fn round_secs(&self) -> Duration;

    /**
     * Render in the compact form used in tables, e.g., "42s", "2m0s", or
     * "1h0m5s".  Sub-second precision is discarded by rounding first.
     */
    fn render(&self) -> String;
}

impl DurationExt for Duration {
    fn round_secs(&self) -> Duration {
        let mut secs = self.as_secs();
        if self.subsec_nanos() >= 500_000_000 {
            secs = secs.saturating_add(1);
        }
        Duration::from_secs(secs)
    }

    fn render(&self) -> String {
        let mut out = String::new();
        let mut secs = self.round_secs().as_secs();
        let hours = secs / 3600;
        if hours > 0 {
            secs -= hours * 3600;
            out += &format!("{}h", hours);
        }
        let minutes = secs / 60;
        if minutes > 0 || hours > 0 {
            secs -= minutes * 60;
            out += &format!("{}m", minutes);
        }
        out += &format!("{}s", secs);

        out
    }
}

pub trait DateTimeExt {
    /**
     * How long ago was this, relative to the provided "now"?  Times in the
     * future have an age of zero.
     */
    fn age_at(&self, now: DateTime<Utc>) -> Duration;

    /**
     * The serialised form of an unset Go-style timestamp is the first
     * instant of year 1.  Treat that as no timestamp at all.
     */
    fn is_zero_instant(&self) -> bool;
}

impl DateTimeExt for DateTime<Utc> {
    fn age_at(&self, now: DateTime<Utc>) -> Duration {
        if let Ok(dur) = now.signed_duration_since(*self).to_std() {
            dur
        } else {
            Duration::from_secs(0)
        }
    }

    fn is_zero_instant(&self) -> bool {
        self.year() <= 1
            && self.ordinal() == 1
            && self.num_seconds_from_midnight() == 0
    }
}

/**
 * Parse a compact duration specification such as "15m", "1h30m", or "90s".
 * A bare number is taken as minutes.
 */
pub fn parse_duration(s: &str) -> Result<Duration> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"([0-9]+)(h|m|s)").unwrap());

    let s = s.trim();
    if s.is_empty() {
        bail!("empty duration");
    }

    if s.chars().all(|c| c.is_ascii_digit()) {
        return Ok(Duration::from_secs(s.parse::<u64>()? * 60));
    }

    let mut total = 0u64;
    let mut consumed = 0;
    for cap in re.captures_iter(s) {
        let whole = cap.get(0).unwrap();
        if whole.start() != consumed {
            bail!("invalid duration {s:?}");
        }
        consumed = whole.end();

        let n = cap[1].parse::<u64>()?;
        total += match &cap[2] {
            "h" => n * 3600,
            "m" => n * 60,
            _ => n,
        };
    }

    if consumed != s.len() {
        bail!("invalid duration {s:?}");
    }

    Ok(Duration::from_secs(total))
}

/**
 * Expand "$NAME" and "${NAME}" references using the provided lookup
 * function.  Unknown variables expand to the empty string.
 */
pub fn expand_vars<F>(s: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))",
        )
        .unwrap()
    })
    .replace_all(s, |cap: &regex::Captures| {
        let name = cap.get(1).or_else(|| cap.get(2)).unwrap().as_str();
        lookup(name).unwrap_or_default()
    })
    .to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn render_durations() {
        let data = [
            (0, 0, "0s"),
            (42, 0, "42s"),
            (41, 500_000_000, "42s"),
            (41, 499_999_999, "41s"),
            (120, 0, "2m0s"),
            (3605, 0, "1h0m5s"),
            (3 * 3600 + 61, 0, "3h1m1s"),
        ];

        for (secs, nanos, expect) in data {
            assert_eq!(Duration::new(secs, nanos).render(), expect);
        }
    }

    #[test]
    fn age_in_the_future_is_zero() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let later = now + chrono::TimeDelta::seconds(30);
        let earlier = now - chrono::TimeDelta::seconds(30);

        assert_eq!(later.age_at(now), Duration::ZERO);
        assert_eq!(earlier.age_at(now), Duration::from_secs(30));
    }

    #[test]
    fn zero_instant() -> Result<()> {
        let zero: DateTime<Utc> = "0001-01-01T00:00:00Z".parse()?;
        let real: DateTime<Utc> = "2024-05-01T12:00:00Z".parse()?;

        assert!(zero.is_zero_instant());
        assert!(!real.is_zero_instant());
        Ok(())
    }

    #[test]
    fn parse_durations() -> Result<()> {
        assert_eq!(parse_duration("15m")?, Duration::from_secs(900));
        assert_eq!(parse_duration("1h30m")?, Duration::from_secs(5400));
        assert_eq!(parse_duration("90s")?, Duration::from_secs(90));
        assert_eq!(parse_duration("20")?, Duration::from_secs(1200));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("1d").is_err());
        assert!(parse_duration("m5").is_err());
        assert!(parse_duration("5m junk").is_err());
        Ok(())
    }

    #[test]
    fn expansion() {
        let lookup = |n: &str| match n {
            "HOME" => Some("/home/ci".to_string()),
            _ => None,
        };

        assert_eq!(
            expand_vars("$HOME/.actuated/PAT", lookup),
            "/home/ci/.actuated/PAT"
        );
        assert_eq!(expand_vars("${HOME}/x", lookup), "/home/ci/x");
        assert_eq!(expand_vars("$NOPE/x", lookup), "/x");
        assert_eq!(expand_vars("plain", lookup), "plain");
    }
}
