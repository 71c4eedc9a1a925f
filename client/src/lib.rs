/*
 * Copyright 2026 Oxide Computer Company
 */

use std::time::Duration;

use anyhow::{bail, Result};
use chrono::prelude::*;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
pub use reqwest::StatusCode;
use slog::{debug, o, Logger};

pub mod github;
pub mod gateway;

/**
 * Status codes accepted from the endpoints that change the state of a host.
 */
pub const MUTATION_OK: &[u16] = &[200, 201, 202, 204];
pub const ACCEPTED: &[u16] = &[202];
pub const OK: &[u16] = &[200];

#[derive(Debug, thiserror::Error)]
#[error("unexpected status code: {status}, message: {body}")]
pub struct UnexpectedStatus {
    pub status: u16,
    pub body: String,
}

/**
 * The raw result of an API request.  Response bodies are passed through to
 * the user more often than they are decoded, so we hold on to the text.
 */
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
}

impl Reply {
    pub fn expect(self, ok: &[u16]) -> Result<String, UnexpectedStatus> {
        if ok.contains(&self.status.as_u16()) {
            Ok(self.body)
        } else {
            Err(UnexpectedStatus {
                status: self.status.as_u16(),
                body: self.body,
            })
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct Query(Vec<(&'static str, String)>);

impl Query {
    pub fn new() -> Query {
        Query::default()
    }

    pub fn set<S: ToString>(mut self, name: &'static str, value: S) -> Self {
        self.0.push((name, value.to_string()));
        self
    }

    pub fn maybe(self, name: &'static str, value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => self.set(name, v),
            _ => self,
        }
    }

    pub fn flag(self, name: &'static str, on: bool) -> Self {
        if on {
            self.set(name, "1")
        } else {
            self
        }
    }

    pub fn age(self, age: Duration) -> Self {
        self.set("age", format!("{}m", age.as_secs() / 60))
    }

    fn url(&self, base: &str, path: &str) -> Result<String> {
        let mut out = format!("{}{}", base.trim_end_matches('/'), path);
        if !self.0.is_empty() {
            out.push('?');
            out.push_str(&serde_urlencoded::to_string(&self.0)?);
        }
        Ok(out)
    }
}

/**
 * Render request headers for the debug log, without the credential.
 */
fn redacted(h: &HeaderMap) -> Vec<String> {
    h.iter()
        .map(|(n, v)| {
            if *n == AUTHORIZATION {
                format!("{n}: <redacted>")
            } else {
                format!("{n}: {}", v.to_str().unwrap_or("<binary>"))
            }
        })
        .collect()
}

pub(crate) fn mk_reqwest_client() -> Result<reqwest::Client> {
    Ok(reqwest::ClientBuilder::new()
        .timeout(Duration::from_secs(300))
        .tcp_keepalive(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(15))
        .build()?)
}

pub struct ClientBuilder {
    url: String,
    token: Option<String>,
    log: Option<Logger>,
}

impl ClientBuilder {
    pub fn new(url: &str) -> ClientBuilder {
        ClientBuilder { url: url.to_string(), token: None, log: None }
    }

    pub fn bearer_token<S: AsRef<str>>(&mut self, token: S) -> &mut Self {
        self.token = Some(token.as_ref().to_string());
        self
    }

    pub fn log(&mut self, log: &Logger) -> &mut Self {
        self.log = Some(log.clone());
        self
    }

    pub fn build(&mut self) -> Result<Client> {
        let log = self
            .log
            .clone()
            .unwrap_or_else(|| Logger::root(slog::Discard, o!()));

        Ok(Client {
            url: self.url.clone(),
            token: self.token.clone(),
            client: mk_reqwest_client()?,
            log,
        })
    }
}

#[derive(Clone)]
pub struct Client {
    url: String,
    token: Option<String>,
    client: reqwest::Client,
    log: Logger,
}

impl Client {
    async fn get(&self, path: &str, q: Query, json: bool) -> Result<Reply> {
        let Some(token) = self.token.as_deref() else {
            bail!("pat is required");
        };

        let url = q.url(&self.url, path)?;

        let mut headers = HeaderMap::new();
        if json {
            headers
                .insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))?,
        );

        debug!(self.log, "request";
            "url" => &url,
            "headers" => ?redacted(&headers));

        let res = self.client.get(&url).headers(headers).send().await?;
        let status = res.status();
        let body = res.text().await?;

        debug!(self.log, "response"; "url" => &url, "status" => %status);

        Ok(Reply { status, body })
    }

    pub async fn jobs(
        &self,
        owner: Option<&str>,
        staff: bool,
        json: bool,
    ) -> Result<Reply> {
        let q = Query::new().flag("staff", staff).maybe("owners", owner);
        self.get("/api/v1/job-queue", q, json).await
    }

    pub async fn increases(
        &self,
        owner: Option<&str>,
        start: NaiveDate,
        staff: bool,
        json: bool,
    ) -> Result<Reply> {
        let q = Query::new()
            .flag("staff", staff)
            .maybe("owner", owner)
            .set("startDate", start.format("%Y-%m-%d"));
        self.get("/api/v1/job-increases", q, json).await
    }

    pub async fn runners(
        &self,
        owner: Option<&str>,
        staff: bool,
        images: bool,
        json: bool,
    ) -> Result<Reply> {
        let q = Query::new()
            .flag("staff", staff)
            .flag("images", images)
            .maybe("owner", owner);
        self.get("/api/v1/runners", q, json).await
    }

    pub async fn repair(&self, owner: &str, staff: bool) -> Result<Reply> {
        let q = Query::new().flag("staff", staff).set("owner", owner);
        self.get("/api/v1/repair", q, false).await
    }

    pub async fn logs(
        &self,
        owner: &str,
        host: &str,
        id: Option<&str>,
        age: Duration,
        staff: bool,
    ) -> Result<Reply> {
        let q = Query::new()
            .set("owner", owner)
            .set("host", host)
            .age(age)
            .maybe("id", id)
            .flag("staff", staff);
        self.get("/api/v1/logs", q, false).await
    }

    pub async fn agent_logs(
        &self,
        owner: &str,
        host: &str,
        age: Duration,
        staff: bool,
    ) -> Result<Reply> {
        let q = Query::new()
            .set("owner", owner)
            .set("host", host)
            .age(age)
            .flag("staff", staff);
        self.get("/api/v1/service", q, false).await
    }

    pub async fn metering(
        &self,
        owner: &str,
        host: &str,
        id: &str,
        staff: bool,
    ) -> Result<Reply> {
        let q = Query::new()
            .set("owner", owner)
            .set("host", host)
            .maybe("id", Some(id))
            .flag("staff", staff);
        self.get("/api/v1/metering", q, false).await
    }

    pub async fn controller_logs(
        &self,
        output: &str,
        age: Duration,
    ) -> Result<Reply> {
        let q = Query::new().age(age).maybe("output", Some(output));
        self.get("/api/v1/controller/logs", q, false).await
    }

    pub async fn upgrade(
        &self,
        owner: &str,
        host: &str,
        force: bool,
        staff: bool,
    ) -> Result<Reply> {
        let q = Query::new()
            .set("owner", owner)
            .set("host", host)
            .flag("staff", staff)
            .flag("force", force);
        self.get("/api/v1/upgrade", q, false).await
    }

    pub async fn restart(
        &self,
        owner: &str,
        host: &str,
        reboot: bool,
        staff: bool,
    ) -> Result<Reply> {
        let q = Query::new()
            .set("owner", owner)
            .set("host", host)
            .flag("staff", staff)
            .flag("reboot", reboot);
        self.get("/api/v1/restart", q, false).await
    }

    pub async fn disable(
        &self,
        owner: &str,
        host: &str,
        staff: bool,
    ) -> Result<Reply> {
        let q = Query::new()
            .set("owner", owner)
            .set("host", host)
            .flag("staff", staff);
        self.get("/api/v1/disable", q, false).await
    }
}
