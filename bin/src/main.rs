/*
 * Copyright 2026 Oxide Computer Company
 */

use std::io::Write;
use std::time::Instant;

use actuated_client::{
    gateway::Gateway, github, Client, ClientBuilder, ACCEPTED, MUTATION_OK,
    OK,
};
use actuated_common::*;
use actuated_status::{hosts, json, sessions, Layout, Options};
use actuated_types::runner::{Host, RepairResult};
use anyhow::{anyhow, bail, Context, Result};
use chrono::prelude::*;
use hiercmd::prelude::*;
use slog::{info, Logger};

mod config;

const DEFAULT_AGE: &str = "15m";
const DEFAULT_INCREASE_DAYS: i64 = 30;

const BANNER: &str = "
░█▀█░█▀▀░▀█▀░█░█░█▀█░▀█▀░█▀▀░█▀▄
░█▀█░█░░░░█░░█░█░█▀█░░█░░█▀▀░█░█
░▀░▀░▀▀▀░░▀░░▀▀▀░▀░▀░░▀░░▀▀▀░▀▀░
";

#[derive(Default)]
struct Stuff {
    client: Option<Client>,
    profile: Option<config::Profile>,
    log: Option<Logger>,
}

impl Stuff {
    fn profile(&self) -> Result<&config::Profile> {
        self.profile.as_ref().ok_or_else(|| anyhow!("no profile"))
    }

    fn client(&self) -> Result<&Client> {
        match self.client.as_ref() {
            Some(c) => Ok(c),
            None => {
                /*
                 * The client is only missing if the profile has no URL, so
                 * report that.
                 */
                self.profile()?.url()?;
                bail!("no client");
            }
        }
    }

    fn log(&self) -> Result<&Logger> {
        self.log.as_ref().ok_or_else(|| anyhow!("no logger"))
    }

    fn token(&self) -> Result<&str> {
        self.profile()?
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("pat is required"))
    }
}

/**
 * Write a response body to stdout, re-indented if it is JSON.
 */
fn emit(body: &str, pretty: bool) -> Result<()> {
    let out = if pretty {
        json::pretty(body)?
    } else {
        format!("{}\n", body.trim_end())
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(out.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn one_arg<'a>(args: &'a [String], what: &str) -> Result<&'a str> {
    match args {
        [arg] if !arg.trim().is_empty() => Ok(arg.trim()),
        _ => bail!("specify the {what} as an argument"),
    }
}

fn opt_owner(owner: Option<String>) -> Option<String> {
    owner
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
}

fn age(age: Option<String>) -> Result<std::time::Duration> {
    let age = age.unwrap_or_else(|| DEFAULT_AGE.into());
    parse_duration(&age).with_context(|| anyhow!("parsing --age {age:?}"))
}

async fn do_jobs(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("[OWNER]"));

    l.optflag("v", "verbose", "show additional columns in the output");
    l.optflag("j", "json", "request output in JSON format");
    l.optflag("u", "urls", "include the URL of each job in the output");
    l.optflag("P", "progress", "show a progress bar for running jobs");
    l.optflag("s", "staff", "list jobs for all customers");
    l.mutually_exclusive(&[("v", "verbose"), ("P", "progress")]);

    let a = args!(l);
    if a.args().len() > 1 {
        bad_args!(l, "specify at most one owner");
    }
    let owner = a.args().first().map(|o| o.trim());

    let s = l.context();
    let opts = Options {
        layout: if a.opts().opt_present("v") {
            Layout::Verbose
        } else if a.opts().opt_present("P") {
            Layout::Progress
        } else {
            Layout::Compact
        },
        urls: a.opts().opt_present("u") || s.profile()?.urls,
        json: a.opts().opt_present("j"),
    };

    let body = s
        .client()?
        .jobs(owner, a.opts().opt_present("s"), opts.json)
        .await?
        .expect(OK)?;

    let mut stdout = std::io::stdout().lock();
    actuated_status::render(&mut stdout, &body, Utc::now(), &opts)
}

async fn do_runners(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("[OWNER]"));

    l.optflag("j", "json", "request output in JSON format");
    l.optflag("", "images", "show the rootfs and kernel image of each host");
    l.optflag("s", "staff", "list runners for all customers");

    let a = args!(l);
    if a.args().len() > 1 {
        bad_args!(l, "specify at most one owner");
    }
    let owner = a.args().first().map(|o| o.trim());
    let json = a.opts().opt_present("j");

    let body = l
        .context()
        .client()?
        .runners(
            owner,
            a.opts().opt_present("s"),
            a.opts().opt_present("images"),
            json,
        )
        .await?
        .expect(OK)?;

    emit(&body, json)
}

async fn do_repair(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("OWNER"));

    l.optflag("s", "staff", "act as staff");

    let a = args!(l);
    let owner = one_arg(&a.args()[..], "owner")?;

    let reply =
        l.context().client()?.repair(owner, a.opts().opt_present("s")).await?;
    let status = reply.status.as_u16();
    let body = reply.expect(MUTATION_OK)?;

    println!("Repair requested for {owner}, status: {status}");
    if !body.trim().is_empty() {
        let rr: RepairResult = serde_json::from_str(&body)
            .context("decoding repair response")?;
        println!("Requeued VMs: {}", rr.vms);
    }

    Ok(())
}

async fn do_restart(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("HOST"));

    l.reqopt("o", "owner", "owner of the host", "OWNER");
    l.optflag("r", "reboot", "reboot the machine rather than the service");
    l.optflag("s", "staff", "act as staff");

    let a = args!(l);
    let host = one_arg(&a.args()[..], "host")?;
    let Some(owner) = opt_owner(a.opts().opt_str("o")) else {
        bad_args!(l, "owner is required");
    };

    let reply = l
        .context()
        .client()?
        .restart(
            &owner,
            host,
            a.opts().opt_present("r"),
            a.opts().opt_present("s"),
        )
        .await?;
    let status = reply.status.as_u16();
    let body = reply.expect(MUTATION_OK)?;

    println!("Restart requested for {owner}, status: {status}");
    if !body.trim().is_empty() {
        println!("Response: {}", body.trim_end());
    }

    Ok(())
}

async fn do_disable(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("HOST"));

    l.reqopt("o", "owner", "owner of the host", "OWNER");
    l.optflag("s", "staff", "act as staff");

    let a = args!(l);
    let host = one_arg(&a.args()[..], "host")?;
    let Some(owner) = opt_owner(a.opts().opt_str("o")) else {
        bad_args!(l, "owner is required");
    };

    let reply = l
        .context()
        .client()?
        .disable(&owner, host, a.opts().opt_present("s"))
        .await?;
    let status = reply.status.as_u16();
    let body = reply.expect(MUTATION_OK)?;

    println!("Disable requested for {owner}, status: {status}");
    if !body.trim().is_empty() {
        println!("Response: {}", body.trim_end());
    }

    Ok(())
}

async fn upgrade_one(
    c: &Client,
    h: &Host,
    force: bool,
    staff: bool,
) -> Result<()> {
    let start = Instant::now();
    let reply = c.upgrade(&h.customer, &h.name, force, staff).await?;
    let status = reply.status.as_u16();
    let body = reply.expect(MUTATION_OK)?;

    println!(
        "Upgrade: {} ({}): {} ({}ms)",
        h.name,
        h.customer,
        status,
        start.elapsed().as_millis()
    );
    if !body.trim().is_empty() {
        println!("Response: {}", body.trim_end());
    }

    Ok(())
}

async fn do_upgrade(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("[HOST]"));

    l.optopt("o", "owner", "owner of the host(s)", "OWNER");
    l.optflag("a", "all", "upgrade every host rather than a named host");
    l.optflag("f", "force", "upgrade even if the agent is up to date");
    l.optflag("s", "staff", "act as staff");

    let a = args!(l);
    let all = a.opts().opt_present("a");
    let force = a.opts().opt_present("f");
    let staff = a.opts().opt_present("s");
    let owner = opt_owner(a.opts().opt_str("o"));

    let named = if all {
        if !a.args().is_empty() {
            bad_args!(l, "--all and a host name are mutually exclusive");
        }
        None
    } else {
        match &a.args()[..] {
            [host] if !host.trim().is_empty() => Some(host.trim().to_string()),
            _ => bad_args!(l, "specify the host as an argument, or --all"),
        }
    };

    let c = l.context().client()?;

    let targets = if let Some(host) = named.as_deref() {
        vec![hosts::named_host(host, owner.as_deref().unwrap_or(""))]
    } else {
        let body = c
            .runners(owner.as_deref(), staff, true, true)
            .await?
            .expect(OK)?;
        let list: Vec<Host> =
            serde_json::from_str(&body).context("decoding runner list")?;
        hosts::upgrade_candidates(list)?
    };

    let mut fo = hosts::FanOut::default();
    for h in targets.iter() {
        println!("Upgrading: {} ({})", h.name, h.customer);

        let t = hosts::triage(h);
        if let Some(why) = t.describe(h) {
            println!("{why}");
            fo.skip(h);
        } else {
            let res = upgrade_one(c, h, force, staff).await;
            if let Err(e) = &res {
                eprintln!("ERROR: {} ({}): {e}", h.name, h.customer);
            }
            fo.record(h, &res);
        }
        println!();
    }

    fo.finish()
}

async fn do_logs(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("HOST"));

    l.reqopt("o", "owner", "owner of the host", "OWNER");
    l.optopt("a", "age", "age of logs to fetch (default 15m)", "AGE");
    l.optopt("", "id", "fetch the logs of a specific runner VM", "ID");
    l.optflag("s", "staff", "act as staff");

    let a = args!(l);
    let host = one_arg(&a.args()[..], "host")?;
    let Some(owner) = opt_owner(a.opts().opt_str("o")) else {
        bad_args!(l, "owner is required");
    };
    if a.opts().opt_present("a") && a.opts().opt_present("id") {
        bad_args!(l, "--age can't be used with --id");
    }
    let id = a.opts().opt_str("id");
    let since = age(a.opts().opt_str("a"))?;

    let body = l
        .context()
        .client()?
        .logs(&owner, host, id.as_deref(), since, a.opts().opt_present("s"))
        .await?
        .expect(ACCEPTED)?;

    emit(&body, false)
}

async fn do_agent_logs(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("HOST"));

    l.reqopt("o", "owner", "owner of the host", "OWNER");
    l.optopt("a", "age", "age of logs to fetch (default 15m)", "AGE");
    l.optflag("s", "staff", "act as staff");

    let a = args!(l);
    let host = one_arg(&a.args()[..], "host")?;
    let Some(owner) = opt_owner(a.opts().opt_str("o")) else {
        bad_args!(l, "owner is required");
    };
    let since = age(a.opts().opt_str("a"))?;

    let body = l
        .context()
        .client()?
        .agent_logs(&owner, host, since, a.opts().opt_present("s"))
        .await?
        .expect(ACCEPTED)?;

    emit(&body, false)
}

async fn do_metering(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("HOST"));

    l.reqopt("o", "owner", "owner of the host", "OWNER");
    l.reqopt("", "id", "runner VM to fetch metering data for", "ID");
    l.optflag("s", "staff", "act as staff");

    let a = args!(l);
    let host = one_arg(&a.args()[..], "host")?;
    let Some(owner) = opt_owner(a.opts().opt_str("o")) else {
        bad_args!(l, "owner is required");
    };
    let Some(id) = a.opts().opt_str("id").filter(|i| !i.trim().is_empty())
    else {
        bad_args!(l, "id is required");
    };

    let body = l
        .context()
        .client()?
        .metering(&owner, host, id.trim(), a.opts().opt_present("s"))
        .await?
        .expect(&[200, 202])?;

    emit(&body, true)
}

async fn do_increases(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("[OWNER]"));

    l.optopt("d", "days", "number of days to look back (default 30)", "DAYS");
    l.optflag("j", "json", "request output in JSON format");
    l.optflag("s", "staff", "act as staff");

    let a = args!(l);
    if a.args().len() > 1 {
        bad_args!(l, "specify at most one owner");
    }
    let owner = a.args().first().map(|o| o.trim());
    let days = match a.opts().opt_str("d") {
        Some(d) => d
            .parse::<i64>()
            .ok()
            .filter(|d| *d > 0)
            .ok_or_else(|| anyhow!("invalid number of days {d:?}"))?,
        None => DEFAULT_INCREASE_DAYS,
    };
    let json = a.opts().opt_present("j");

    let start = (Utc::now() - chrono::TimeDelta::days(days)).date_naive();

    let body = l
        .context()
        .client()?
        .increases(owner, start, a.opts().opt_present("s"), json)
        .await?
        .expect(OK)?;

    emit(&body, json)
}

async fn do_controller_logs(mut l: Level<Stuff>) -> Result<()> {
    l.optopt("a", "age", "age of logs to fetch (default 15m)", "AGE");
    l.optopt("o", "output", "output format (default \"cat\")", "FORMAT");

    let a = no_args!(l);
    let output = a.opts().opt_str("o").unwrap_or_else(|| "cat".into());

    let body = l
        .context()
        .client()?
        .controller_logs(&output, age(a.opts().opt_str("a"))?)
        .await?
        .expect(OK)?;

    emit(&body, false)
}

async fn do_controller(mut l: Level<Stuff>) -> Result<()> {
    l.cmd("logs", "fetch logs from the controller", cmd!(do_controller_logs))?;

    sel!(l).run().await
}

/**
 * Fetch the SSH sessions belonging to the user that owns our token.
 */
async fn my_sessions(
    s: &Stuff,
) -> Result<(Gateway, Vec<actuated_types::ssh::SshSession>)> {
    let login = github::whoami(s.token()?).await?;
    let gw = Gateway::new(&s.profile()?.sshgw, s.log()?)?;
    let all = gw.sessions().await?;

    Ok((gw, sessions::sessions_for(all, &login)))
}

async fn do_ssh_list(mut l: Level<Stuff>) -> Result<()> {
    l.optflag("j", "json", "emit the session list as JSON");

    let a = no_args!(l);

    let (_, mine) = my_sessions(l.context()).await?;

    let out = if a.opts().opt_present("j") {
        format!("{}\n", serde_json::to_string_pretty(&mine)?)
    } else {
        sessions::format_sessions(&mine, Utc::now())
    };

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(out.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

async fn do_ssh_connect(mut l: Level<Stuff>) -> Result<()> {
    l.usage_args(Some("[HOSTNAME|NUMBER]"));

    l.optflag("", "print", "print the ssh command rather than running it");

    let a = args!(l);
    if a.args().len() > 1 {
        bad_args!(l, "specify at most one host");
    }
    let target = a.args().first().map(|t| t.trim());

    let (gw, mine) = my_sessions(l.context()).await?;
    let session = sessions::resolve(&mine, target)?;
    let args = sessions::ssh_args(session, &gw.host()?);

    if a.opts().opt_present("print") {
        println!("ssh {}", args.join(" "));
        return Ok(());
    }

    info!(l.context().log()?, "connecting to {}", session.hostname);

    let status = std::process::Command::new("ssh")
        .args(&args)
        .status()
        .context("running ssh")?;
    if !status.success() {
        bail!("ssh exited with {status}");
    }

    Ok(())
}

async fn do_ssh(mut l: Level<Stuff>) -> Result<()> {
    l.cmda("list", "ls", "list your SSH sessions", cmd!(do_ssh_list))?;
    l.cmda("connect", "c", "connect to an SSH session", cmd!(do_ssh_connect))?;

    sel!(l).run().await
}

async fn do_auth(mut l: Level<Stuff>) -> Result<()> {
    no_args!(l);

    let log = l.context().log()?;

    let auth = github::device_code().await?;
    println!("Please visit: {}", auth.verification_uri);
    println!("and enter the code: {}", auth.user_code);

    let token = github::wait_for_token(log, &auth).await?;

    let mut path = dirs_next::home_dir()
        .ok_or_else(|| anyhow!("could not find home directory"))?;
    path.push(".actuated");
    std::fs::create_dir_all(&path)
        .with_context(|| anyhow!("creating {:?}", path))?;
    path.push("PAT");

    write_private(&path, &token)
        .with_context(|| anyhow!("writing {:?}", path))?;

    println!("Access token written to: {}", path.display());
    Ok(())
}

fn write_private(path: &std::path::Path, contents: &str) -> Result<()> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    /*
     * The mode is only applied on creation, so tighten an existing file too.
     */
    f.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    f.write_all(contents.as_bytes())?;
    f.flush()?;
    Ok(())
}

async fn do_version(mut l: Level<Stuff>) -> Result<()> {
    no_args!(l);

    print!("{BANNER}");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "Git Commit: {}",
        option_env!("ACTUATED_GIT_COMMIT").unwrap_or("unknown")
    );
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    sigpipe::reset();

    let mut l = Level::new("actuated", Stuff::default());
    l.optopt("p", "profile", "server and authentication profile", "PROFILE");
    l.optopt("t", "token", "file to read the access token from", "FILE");
    l.optopt("", "token-value", "access token", "TOKEN");

    l.cmd("jobs", "list the job queue", cmd!(do_jobs))?;
    l.cmd("runners", "list runners", cmd!(do_runners))?;
    l.cmd("repair", "requeue jobs for an owner", cmd!(do_repair))?;
    l.cmd("restart", "restart the agent on a host", cmd!(do_restart))?;
    l.cmd("upgrade", "upgrade the agent on hosts", cmd!(do_upgrade))?;
    l.cmd("disable", "disable the agent on a host", cmd!(do_disable))?;
    l.cmd("logs", "fetch VM logs from a host", cmd!(do_logs))?;
    l.cmd("agent-logs", "fetch agent logs from a host", cmd!(do_agent_logs))?;
    l.cmd("metering", "fetch metering data for a VM", cmd!(do_metering))?;
    l.cmd("increases", "report build time increases", cmd!(do_increases))?;
    l.cmd("ssh", "SSH debug sessions", cmd!(do_ssh))?;
    l.cmd("auth", "obtain an access token from GitHub", cmd!(do_auth))?;
    l.cmda("version", "v", "print the version", cmd!(do_version))?;
    l.hcmd("controller", "controller functions", cmd!(do_controller))?;

    let a = args!(l);

    let log = make_log("actuated");

    let tok = config::TokenArgs {
        value: a.opts().opt_str("token-value"),
        file: a.opts().opt_str("t"),
    };
    let profile = config::load(a.opts().opt_str("p").as_deref(), &tok)?;

    if let Some(url) = profile.url.as_deref() {
        let mut cb = ClientBuilder::new(url);
        cb.log(&log);
        if let Some(token) = profile.token.as_deref() {
            cb.bearer_token(token);
        }
        l.context_mut().client = Some(cb.build()?);
    }

    l.context_mut().profile = Some(profile);
    l.context_mut().log = Some(log);

    sel!(l).run().await
}
