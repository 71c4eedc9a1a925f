/*
 * Copyright 2026 Oxide Computer Company
 */

use actuated_common::{DateTimeExt, DurationExt};
use actuated_types::ssh::SshSession;
use anyhow::{bail, Result};
use chrono::prelude::*;

use crate::table;

/**
 * Keep only the sessions opened by the given GitHub user, newest first.
 */
pub fn sessions_for(sessions: Vec<SshSession>, login: &str) -> Vec<SshSession> {
    let mut mine = sessions
        .into_iter()
        .filter(|s| s.actor == login)
        .collect::<Vec<_>>();

    mine.sort_by(|a, b| b.connected_at.cmp(&a.connected_at));
    mine
}

/**
 * Pick the session to connect to.  With no target, the newest session wins.
 * Otherwise the target may be an exact hostname or the 1-based number shown
 * in the list output; failing both, the first hostname that begins with the
 * target is used.
 */
pub fn resolve<'a>(
    sessions: &'a [SshSession],
    target: Option<&str>,
) -> Result<&'a SshSession> {
    if sessions.is_empty() {
        bail!("no sessions found");
    }

    let Some(target) = target.filter(|t| !t.is_empty()) else {
        return Ok(&sessions[0]);
    };
    let index = target.parse::<usize>().ok();

    if let Some(found) = sessions
        .iter()
        .enumerate()
        .find(|(i, s)| s.hostname == target || index == Some(i + 1))
        .map(|(_, s)| s)
    {
        return Ok(found);
    }

    if let Some(found) =
        sessions.iter().find(|s| s.hostname.starts_with(target))
    {
        return Ok(found);
    }

    bail!("no session found for hostname {target}");
}

/**
 * Arguments to pass to ssh(1) to reach the session through the gateway.
 */
pub fn ssh_args(session: &SshSession, gateway_host: &str) -> Vec<String> {
    vec![
        "-p".to_string(),
        session.port.to_string(),
        format!("runner@{gateway_host}"),
        "-o".to_string(),
        "StrictHostKeyChecking=no".to_string(),
        "-o".to_string(),
        "UserKnownHostsFile=/dev/null".to_string(),
    ]
}

pub fn format_sessions(sessions: &[SshSession], now: DateTime<Utc>) -> String {
    let mut rows = vec![["No.", "Actor", "Hostname", "RX", "TX", "Connected"]
        .map(str::to_string)
        .to_vec()];

    for (i, s) in sessions.iter().enumerate() {
        let connected = DateTime::parse_from_rfc3339(&s.connected_at)
            .map(|t| t.with_timezone(&Utc).age_at(now).render())
            .unwrap_or_default();

        rows.push(vec![
            (i + 1).to_string(),
            s.actor.clone(),
            s.hostname.clone(),
            s.rx.to_string(),
            s.tx.to_string(),
            connected,
        ]);
    }

    table::piped(rows)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::derive::test::now;

    fn session(host: &str, actor: &str, at: &str, port: u16) -> SshSession {
        SshSession {
            connected_at: at.to_string(),
            command: String::new(),
            hostname: host.to_string(),
            port,
            actor: actor.to_string(),
            rx: 1024,
            tx: 2048,
            connections: 1,
        }
    }

    fn fleet() -> Vec<SshSession> {
        vec![
            session("old-runner", "alexellis", "2024-05-01T10:00:00Z", 2201),
            session("theirs", "someone", "2024-05-01T11:30:00Z", 2202),
            session("new-runner", "alexellis", "2024-05-01T11:59:00Z", 2203),
            session("mid-box", "alexellis", "2024-05-01T11:00:00Z", 2204),
        ]
    }

    #[test]
    fn filtered_and_newest_first() {
        let mine = sessions_for(fleet(), "alexellis");
        let hosts =
            mine.iter().map(|s| s.hostname.as_str()).collect::<Vec<_>>();
        assert_eq!(hosts, ["new-runner", "mid-box", "old-runner"]);
    }

    #[test]
    fn resolution() -> Result<()> {
        let mine = sessions_for(fleet(), "alexellis");

        assert_eq!(resolve(&mine, None)?.hostname, "new-runner");
        assert_eq!(resolve(&mine, Some(""))?.hostname, "new-runner");
        assert_eq!(resolve(&mine, Some("old-runner"))?.hostname, "old-runner");
        assert_eq!(resolve(&mine, Some("2"))?.hostname, "mid-box");
        assert_eq!(resolve(&mine, Some("mid"))?.hostname, "mid-box");
        assert_eq!(resolve(&mine, Some("new"))?.hostname, "new-runner");

        let e = resolve(&mine, Some("nowhere")).unwrap_err();
        assert_eq!(e.to_string(), "no session found for hostname nowhere");

        let e = resolve(&mine, Some("9")).unwrap_err();
        assert_eq!(e.to_string(), "no session found for hostname 9");
        Ok(())
    }

    #[test]
    fn exact_match_beats_earlier_prefix() -> Result<()> {
        let mine = vec![
            session("runner-10", "a", "2024-05-01T11:00:00Z", 1),
            session("runner-1", "a", "2024-05-01T10:00:00Z", 2),
        ];

        assert_eq!(resolve(&mine, Some("runner-1"))?.port, 2);
        Ok(())
    }

    #[test]
    fn nothing_to_resolve() {
        let e = resolve(&[], None).unwrap_err();
        assert_eq!(e.to_string(), "no sessions found");
    }

    #[test]
    fn ssh_command_line() {
        let s =
            session("new-runner", "alexellis", "2024-05-01T11:59:00Z", 2203);
        assert_eq!(
            ssh_args(&s, "sshgw.actuated.dev").join(" "),
            "-p 2203 runner@sshgw.actuated.dev -o StrictHostKeyChecking=no \
            -o UserKnownHostsFile=/dev/null"
        );
    }

    #[test]
    fn session_table() {
        let mine = sessions_for(fleet(), "alexellis");
        let out = format_sessions(&mine, now());
        let lines = out.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with('|'));
        assert!(lines[0].contains("Hostname"));
        assert!(lines[1].contains("---"));
        assert!(lines[2].contains("new-runner"));
        assert!(lines[2].contains("1m0s"));
        assert!(lines[4].contains("2h0m0s"));
    }
}
