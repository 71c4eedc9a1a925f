/*
 * Copyright 2026 Oxide Computer Company
 */

use anyhow::{Context, Result};

/**
 * Re-indent a JSON document for humans.  Object keys keep the order in which
 * the server sent them, and values are passed through untouched.  Numbers
 * keep their original text, even where they do not fit in a machine type.
 */
pub fn pretty(raw: &str) -> Result<String> {
    let v: serde_json::Value =
        serde_json::from_str(raw).context("response is not valid JSON")?;
    let mut out = serde_json::to_string_pretty(&v)?;
    out.push('\n');
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;

    const BODY: &str = r#"[{"owner":"openfaas","job_id":18842,"labels":["z","a"],"averageRuntime":100000000000,"startedAt":"2024-05-01T12:00:00Z","ratio":0.25,"extra":{"b":null,"a":true}}]"#;

    #[test]
    fn round_trip() -> Result<()> {
        let out = pretty(BODY)?;

        let direct: serde_json::Value = serde_json::from_str(BODY)?;
        let again: serde_json::Value = serde_json::from_str(&out)?;
        assert_eq!(direct, again);
        Ok(())
    }

    #[test]
    fn key_order_is_kept() -> Result<()> {
        let out = pretty(BODY)?;

        let owner = out.find("\"owner\": ").unwrap();
        let job_id = out.find("\"job_id\": ").unwrap();
        let b = out.find("\"b\": null").unwrap();
        let a = out.find("\"a\": true").unwrap();
        assert!(owner < job_id);
        assert!(b < a);
        Ok(())
    }

    #[test]
    fn number_text_is_kept() -> Result<()> {
        let out = pretty(
            r#"{"job_id":123456789012345678901234567890,"big":1e400,"r":0.10}"#,
        )?;

        assert_eq!(
            out,
            "{\n  \"job_id\": 123456789012345678901234567890,\n  \
            \"big\": 1e400,\n  \"r\": 0.10\n}\n"
        );
        Ok(())
    }

    #[test]
    fn two_space_indent() -> Result<()> {
        let out = pretty(r#"{"vms":2}"#)?;
        assert_eq!(out, "{\n  \"vms\": 2\n}\n");
        Ok(())
    }

    #[test]
    fn invalid() {
        assert!(pretty("{not json").is_err());
    }
}
