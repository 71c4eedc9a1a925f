/*
 * Copyright 2026 Oxide Computer Company
 */

use anyhow::{anyhow, bail, Context, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use slog::{info, Logger};

use crate::{Reply, OK};

const CLIENT_ID: &str = "8c5dc5d9750ff2a8396a";
const SCOPE: &str = "read:user,read:org,user:email";
const REDIRECT_URI: &str = "http://127.0.0.1:31111/oauth/callback";
const DEVICE_CODE_URL: &str = "https://github.com/login/device/code";
const ACCESS_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";
const AGENT: &str = concat!("actuated/", env!("CARGO_PKG_VERSION"));
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

const POLL_ATTEMPTS: u32 = 60;
const POLL_INTERVAL_MS: u64 = 5000;

#[derive(Debug, Deserialize)]
pub struct DeviceAuth {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub interval: u64,
}

#[derive(Debug, PartialEq, Eq)]
enum Poll {
    Pending,
    Token(String),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

fn parse_poll(body: &str) -> Result<Poll> {
    let tr: TokenResponse = serde_urlencoded::from_str(body)
        .context("decoding access token response")?;

    match (tr.access_token, tr.error.as_deref()) {
        (Some(t), _) if !t.is_empty() => Ok(Poll::Token(t)),
        (_, Some("authorization_pending")) => Ok(Poll::Pending),
        (_, Some(e)) => bail!("device authorisation failed: {e}"),
        (_, None) => bail!("something went wrong"),
    }
}

#[derive(Deserialize)]
struct User {
    login: String,
}

/**
 * Determine the GitHub login of the owner of a personal access token.
 */
pub async fn whoami(token: &str) -> Result<String> {
    let res = crate::mk_reqwest_client()?
        .get(USER_URL)
        .header(USER_AGENT, AGENT)
        .header(ACCEPT, "application/vnd.github+json")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .send()
        .await?;
    let reply = Reply { status: res.status(), body: res.text().await? };
    let body = reply.expect(OK)?;

    let u: User =
        serde_json::from_str(&body).context("decoding GitHub user")?;
    Ok(u.login)
}

pub async fn device_code() -> Result<DeviceAuth> {
    let form = serde_urlencoded::to_string([
        ("client_id", CLIENT_ID),
        ("redirect_uri", REDIRECT_URI),
        ("scope", SCOPE),
    ])?;

    let res = crate::mk_reqwest_client()?
        .post(DEVICE_CODE_URL)
        .header(ACCEPT, "application/json")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(form)
        .send()
        .await?;
    let reply = Reply { status: res.status(), body: res.text().await? };
    let body = reply.expect(OK)?;

    serde_json::from_str(&body).context("decoding device code response")
}

/**
 * Wait for the user to approve the device code in their browser, and return
 * the resultant access token.
 */
pub async fn wait_for_token(log: &Logger, auth: &DeviceAuth) -> Result<String> {
    let client = crate::mk_reqwest_client()?;
    let form = serde_urlencoded::to_string([
        ("client_id", CLIENT_ID),
        ("device_code", auth.device_code.as_str()),
        ("grant_type", GRANT_TYPE),
    ])?;

    for _ in 0..POLL_ATTEMPTS {
        let res = client
            .post(ACCESS_TOKEN_URL)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form.clone())
            .send()
            .await?;
        let body = res.text().await?;

        match parse_poll(&body)? {
            Poll::Token(t) => return Ok(t),
            Poll::Pending => {
                info!(log, "waiting for authorisation...");
                actuated_common::sleep_ms(POLL_INTERVAL_MS).await;
            }
        }
    }

    Err(anyhow!("timed out waiting for authorisation"))
}
