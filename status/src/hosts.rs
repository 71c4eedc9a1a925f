/*
 * Copyright 2026 Oxide Computer Company
 */

use actuated_types::runner::{Host, HOST_RUNNING};
use anyhow::{bail, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Triage {
    Upgrade,
    Unreachable,
    NotRunning(String),
}

/**
 * Decide whether an upgrade request should be sent to this host at all.
 */
pub fn triage(h: &Host) -> Triage {
    if !h.reachable {
        Triage::Unreachable
    } else if h.status != HOST_RUNNING {
        Triage::NotRunning(h.status.clone())
    } else {
        Triage::Upgrade
    }
}

impl Triage {
    pub fn describe(&self, h: &Host) -> Option<String> {
        match self {
            Triage::Upgrade => None,
            Triage::Unreachable => Some(format!(
                "Can't upgrade: {} ({}), not reachable",
                h.name, h.customer
            )),
            Triage::NotRunning(status) => Some(format!(
                "Can't upgrade: {} ({}), status: {}",
                h.name, h.customer, status
            )),
        }
    }
}

/**
 * The target of an explicit "upgrade HOST" request.  The caller has named
 * the host, so we assume it can be reached.
 */
pub fn named_host(name: &str, customer: &str) -> Host {
    Host {
        name: name.to_string(),
        customer: customer.to_string(),
        reachable: true,
        status: HOST_RUNNING.to_string(),
    }
}

/**
 * Tracks the outcome of a sequential pass over a host list.  A failure for
 * one host does not stop the pass; the pass as a whole fails at the end if
 * any host failed.
 */
#[derive(Debug, Default)]
pub struct FanOut {
    pub upgraded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl FanOut {
    pub fn skip(&mut self, h: &Host) {
        self.skipped.push(h.name.clone());
    }

    pub fn record<T, E: std::fmt::Display>(
        &mut self,
        h: &Host,
        res: &std::result::Result<T, E>,
    ) {
        match res {
            Ok(_) => self.upgraded.push(h.name.clone()),
            Err(e) => self.failed.push((h.name.clone(), e.to_string())),
        }
    }

    pub fn finish(self) -> Result<()> {
        if self.failed.is_empty() {
            return Ok(());
        }

        let names =
            self.failed.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>();
        bail!(
            "upgrade failed for {} of {} host(s): {}",
            self.failed.len(),
            self.failed.len() + self.upgraded.len() + self.skipped.len(),
            names.join(", ")
        );
    }
}

/**
 * Hosts taken from the runner list for "upgrade --all".  An empty list is an
 * error, as the request can have had no effect.
 */
pub fn upgrade_candidates(hosts: Vec<Host>) -> Result<Vec<Host>> {
    if hosts.is_empty() {
        bail!("no hosts found");
    }
    Ok(hosts)
}

#[cfg(test)]
mod test {
    use super::*;

    fn host(name: &str, reachable: bool, status: &str) -> Host {
        Host {
            name: name.to_string(),
            customer: "openfaas".to_string(),
            reachable,
            status: status.to_string(),
        }
    }

    #[test]
    fn triage_hosts() {
        assert_eq!(triage(&host("a", true, "running")), Triage::Upgrade);
        assert_eq!(triage(&host("b", false, "running")), Triage::Unreachable);
        assert_eq!(
            triage(&host("c", true, "draining")),
            Triage::NotRunning("draining".to_string())
        );

        let h = host("b", false, "running");
        assert_eq!(
            triage(&h).describe(&h).unwrap(),
            "Can't upgrade: b (openfaas), not reachable"
        );
        let h = host("c", true, "draining");
        assert_eq!(
            triage(&h).describe(&h).unwrap(),
            "Can't upgrade: c (openfaas), status: draining"
        );
    }

    #[test]
    fn named_hosts_are_attempted() {
        assert_eq!(triage(&named_host("peppi-1", "")), Triage::Upgrade);
    }

    #[test]
    fn failures_do_not_stop_the_pass() {
        let hosts = vec![
            host("a", true, "running"),
            host("b", true, "running"),
            host("c", false, "running"),
            host("d", true, "running"),
        ];

        let mut visited = Vec::new();
        let mut fo = FanOut::default();
        for h in hosts.iter() {
            if triage(h) != Triage::Upgrade {
                fo.skip(h);
                continue;
            }
            visited.push(h.name.clone());
            let res: std::result::Result<(), String> = if h.name == "b" {
                Err("unexpected status code: 500".to_string())
            } else {
                Ok(())
            };
            fo.record(h, &res);
        }

        assert_eq!(visited, ["a", "b", "d"]);
        assert_eq!(fo.upgraded, ["a", "d"]);
        assert_eq!(fo.skipped, ["c"]);

        let e = fo.finish().unwrap_err();
        assert_eq!(e.to_string(), "upgrade failed for 1 of 4 host(s): b");
    }

    #[test]
    fn clean_pass() {
        let mut fo = FanOut::default();
        let h = host("a", true, "running");
        fo.record(&h, &std::result::Result::<(), String>::Ok(()));
        assert!(fo.finish().is_ok());
    }

    #[test]
    fn empty_list() {
        assert_eq!(
            upgrade_candidates(Vec::new()).unwrap_err().to_string(),
            "no hosts found"
        );
        assert_eq!(
            upgrade_candidates(vec![host("a", true, "running")])
                .unwrap()
                .len(),
            1
        );
    }
}
