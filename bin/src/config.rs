/*
 * Copyright 2026 Oxide Computer Company
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use actuated_common::{expand_vars, read_toml};
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

pub const DEFAULT_SSHGW: &str = "https://sshgw.actuated.dev";

#[derive(Deserialize, Clone, Default)]
pub struct Config {
    pub default_profile: Option<String>,
    #[serde(default)]
    pub profile: HashMap<String, FileProfile>,
}

#[derive(Deserialize, Clone, Default)]
pub struct FileProfile {
    pub url: Option<String>,
    pub token: Option<String>,
    pub token_file: Option<String>,
    pub sshgw: Option<String>,
    #[serde(default)]
    pub urls: bool,
}

/**
 * Token sources given on the command line.
 */
#[derive(Default)]
pub struct TokenArgs {
    pub value: Option<String>,
    pub file: Option<String>,
}

pub struct Profile {
    pub name: Option<String>,
    pub url: Option<String>,
    pub token: Option<String>,
    pub sshgw: String,
    pub urls: bool,
}

impl Profile {
    pub fn url(&self) -> Result<&str> {
        self.url.as_deref().ok_or_else(|| {
            anyhow!(
                "no server URL; set ACTUATED_URL or \"url\" in the profile"
            )
        })
    }
}

/**
 * The environment, as seen by profile resolution.
 */
pub trait Env {
    fn var(&self, n: &str) -> Option<String>;

    fn read(&self, p: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(p)?)
    }
}

pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn var(&self, n: &str) -> Option<String> {
        std::env::var(n).ok().filter(|v| !v.is_empty())
    }
}

fn read_token<E: Env>(env: &E, file: &str) -> Result<String> {
    let path = PathBuf::from(expand_vars(file, |n| env.var(n)));
    let t = env
        .read(&path)
        .with_context(|| anyhow!("reading token file {:?}", path))?;
    Ok(t.trim().to_string())
}

fn select_profile<'a>(
    requested: Option<&'a str>,
    env_profile: Option<&'a str>,
    c: &'a Config,
) -> (&'a str, &'static str) {
    if let Some(profile) = requested {
        (profile, "-p argument")
    } else if let Some(profile) = env_profile {
        (profile, "ACTUATED_PROFILE environment variable")
    } else if let Some(profile) = c.default_profile.as_deref() {
        (profile, "\"default_profile\" in config.toml")
    } else {
        ("default", "fallback default")
    }
}

/**
 * Combine the configuration file (if there was one), the command line, and
 * the environment into the profile for this invocation.
 */
pub fn resolve<E: Env>(
    env: &E,
    config: Option<(&Path, Config)>,
    requested: Option<&str>,
    tok: &TokenArgs,
) -> Result<Profile> {
    let env_profile = env.var("ACTUATED_PROFILE");
    let explicit = requested.is_some() || env_profile.is_some();

    let (name, fp) = match &config {
        Some((path, c)) => {
            let (name, src) =
                select_profile(requested, env_profile.as_deref(), c);
            match c.profile.get(name) {
                Some(fp) => (Some(name.to_string()), fp.clone()),
                None if explicit => bail!(
                    "profile \"{}\" (from {}) not found in configuration \
                    file {:?}",
                    name,
                    src,
                    path
                ),
                None => (None, FileProfile::default()),
            }
        }
        None if explicit => {
            let empty = Config::default();
            let (name, src) =
                select_profile(requested, env_profile.as_deref(), &empty);
            bail!(
                "profile \"{}\" (from {}) requested, but there is no \
                configuration file",
                name,
                src
            );
        }
        None => (None, FileProfile::default()),
    };

    let url = env.var("ACTUATED_URL").or(fp.url.clone());

    let value = tok.value.as_deref().filter(|t| !t.is_empty());
    let file = tok.file.as_deref().filter(|f| !f.is_empty());

    let token = if let Some(t) = value {
        Some(t.to_string())
    } else if let Some(f) = file {
        Some(read_token(env, f)?)
    } else if let Some(t) = env.var("ACTUATED_TOKEN") {
        Some(t.trim().to_string())
    } else if let Some(t) = fp.token.clone() {
        Some(t)
    } else if let Some(f) = fp.token_file.as_deref() {
        Some(read_token(env, f)?)
    } else {
        /*
         * Fall back to the file written by "actuated auth", if it exists.
         */
        read_token(env, "$HOME/.actuated/PAT").ok()
    };

    let sshgw = fp
        .sshgw
        .clone()
        .or_else(|| env.var("ACTUATED_SSHGW"))
        .unwrap_or_else(|| DEFAULT_SSHGW.to_string());

    Ok(Profile {
        name,
        url,
        token: token.filter(|t| !t.is_empty()),
        sshgw,
        urls: fp.urls,
    })
}

pub fn config_path() -> Result<PathBuf> {
    let mut path = dirs_next::config_dir()
        .ok_or_else(|| anyhow!("could not find config directory"))?;
    path.push("actuated");
    path.push("config.toml");
    Ok(path)
}

pub fn load(requested: Option<&str>, tok: &TokenArgs) -> Result<Profile> {
    let path = config_path()?;

    let c: Option<Config> = if path.exists() {
        Some(
            read_toml(&path)
                .with_context(|| anyhow!("reading file {:?}", path))?,
        )
    } else {
        None
    };

    resolve(&ProcessEnv, c.map(|c| (path.as_path(), c)), requested, tok)
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct FakeEnv {
        vars: HashMap<String, String>,
        files: HashMap<PathBuf, String>,
    }

    impl FakeEnv {
        fn with_var(mut self, n: &str, v: &str) -> Self {
            self.vars.insert(n.to_string(), v.to_string());
            self
        }

        fn with_file(mut self, p: &str, body: &str) -> Self {
            self.files.insert(PathBuf::from(p), body.to_string());
            self
        }
    }

    impl Env for FakeEnv {
        fn var(&self, n: &str) -> Option<String> {
            self.vars.get(n).cloned()
        }

        fn read(&self, p: &Path) -> Result<String> {
            self.files.get(p).cloned().ok_or_else(|| anyhow!("no such file"))
        }
    }

    fn config() -> Result<Config> {
        Ok(toml::from_str(
            r#"
            default_profile = "work"

            [profile.work]
            url = "https://work.example.com"
            token_file = "$HOME/.work-token"
            urls = true

            [profile.lab]
            url = "https://lab.example.com"
            token = "lab-token"
            sshgw = "https://gw.lab.example.com"
            "#,
        )?)
    }

    fn path() -> &'static Path {
        Path::new("/etc/actuated/config.toml")
    }

    #[test]
    fn default_profile_from_file() -> Result<()> {
        let env = FakeEnv::default()
            .with_var("HOME", "/home/ci")
            .with_file("/home/ci/.work-token", "  ghp_work\n");

        let cfg = Some((path(), config()?));
        let p = resolve(&env, cfg, None, &TokenArgs::default())?;
        assert_eq!(p.name.as_deref(), Some("work"));
        assert_eq!(p.url()?, "https://work.example.com");
        assert_eq!(p.token.as_deref(), Some("ghp_work"));
        assert_eq!(p.sshgw, DEFAULT_SSHGW);
        assert!(p.urls);
        Ok(())
    }

    #[test]
    fn profile_selection_order() -> Result<()> {
        let env = FakeEnv::default().with_var("ACTUATED_PROFILE", "lab");
        let cfg = Some((path(), config()?));
        let p = resolve(&env, cfg, None, &TokenArgs::default())?;
        assert_eq!(p.name.as_deref(), Some("lab"));
        assert_eq!(p.sshgw, "https://gw.lab.example.com");
        assert!(!p.urls);

        let e = resolve(
            &env,
            Some((path(), config()?)),
            Some("nope"),
            &TokenArgs::default(),
        )
        .err()
        .map(|e| e.to_string())
        .unwrap_or_default();
        assert!(e.contains("profile \"nope\" (from -p argument) not found"));
        Ok(())
    }

    #[test]
    fn environment_and_arguments_win() -> Result<()> {
        let env = FakeEnv::default()
            .with_var("ACTUATED_URL", "http://localhost:8080")
            .with_var("ACTUATED_TOKEN", "env-token")
            .with_var("ACTUATED_SSHGW", "https://gw.example.com")
            .with_file("/tmp/pat", "file-token\n");

        let cfg = Some((path(), config()?));
        let p = resolve(&env, cfg, Some("lab"), &TokenArgs::default())?;
        assert_eq!(p.url()?, "http://localhost:8080");
        assert_eq!(p.token.as_deref(), Some("env-token"));
        assert_eq!(p.sshgw, "https://gw.lab.example.com");

        let tok = TokenArgs { value: None, file: Some("/tmp/pat".into()) };
        let p = resolve(&env, None, None, &tok)?;
        assert_eq!(p.token.as_deref(), Some("file-token"));
        assert_eq!(p.sshgw, "https://gw.example.com");

        let tok = TokenArgs {
            value: Some("arg-token".into()),
            file: Some("/tmp/pat".into()),
        };
        let p = resolve(&env, None, None, &tok)?;
        assert_eq!(p.token.as_deref(), Some("arg-token"));
        Ok(())
    }

    #[test]
    fn no_configuration_at_all() -> Result<()> {
        let env = FakeEnv::default().with_var("HOME", "/home/ci");
        let p = resolve(&env, None, None, &TokenArgs::default())?;
        assert!(p.name.is_none());
        assert!(p.url().is_err());
        assert!(p.token.is_none());

        let env = env.with_file("/home/ci/.actuated/PAT", "ghp_saved");
        let p = resolve(&env, None, None, &TokenArgs::default())?;
        assert_eq!(p.token.as_deref(), Some("ghp_saved"));

        assert!(resolve(&env, None, Some("work"), &TokenArgs::default())
            .is_err());
        Ok(())
    }

    #[test]
    fn missing_token_file_is_an_error() {
        let env = FakeEnv::default();
        let tok = TokenArgs { value: None, file: Some("/nope".into()) };
        assert!(resolve(&env, None, None, &tok).is_err());
    }
}
