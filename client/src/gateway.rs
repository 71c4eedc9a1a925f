/*
 * Copyright 2026 Oxide Computer Company
 */

use actuated_types::ssh::SshSession;
use anyhow::{Context, Result};
use reqwest::header::ACCEPT;
use slog::{debug, Logger};

use crate::{Query, Reply, OK};

/**
 * Client for the SSH gateway, which lists the debug sessions currently
 * attached to runners.  The listing does not require credentials.
 */
pub struct Gateway {
    url: String,
    client: reqwest::Client,
    log: Logger,
}

impl Gateway {
    pub fn new(url: &str, log: &Logger) -> Result<Gateway> {
        Ok(Gateway {
            url: url.to_string(),
            client: crate::mk_reqwest_client()?,
            log: log.clone(),
        })
    }

    /**
     * The host name to use when connecting to sessions via this gateway.
     */
    pub fn host(&self) -> Result<String> {
        host_of(&self.url)
    }

    pub async fn sessions(&self) -> Result<Vec<SshSession>> {
        let url = Query::new().url(&self.url, "/list")?;
        debug!(self.log, "listing ssh sessions"; "url" => &url);

        let res = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let reply = Reply { status: res.status(), body: res.text().await? };
        let body = reply.expect(OK)?;

        serde_json::from_str(&body).context("decoding ssh session list")
    }
}

fn host_of(url: &str) -> Result<String> {
    let u = reqwest::Url::parse(url)
        .with_context(|| format!("invalid gateway URL {url:?}"))?;
    u.host_str()
        .map(str::to_string)
        .with_context(|| format!("gateway URL {url:?} has no host"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn gateway_host() -> Result<()> {
        assert_eq!(
            host_of("https://sshgw.actuated.dev")?,
            "sshgw.actuated.dev"
        );
        assert_eq!(host_of("http://10.0.0.1:8080/")?, "10.0.0.1");
        assert!(host_of("sshgw").is_err());
        Ok(())
    }
}
