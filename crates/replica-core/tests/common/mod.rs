//! Helpers for driving the runner against real `/bin/sh` processes.

#![allow(dead_code)]

use replica_core::{Job, Notification};

/// A job whose "tool" is `sh -c <script> sh`: the runner's trailing
/// `-o <path> <target>` arrive as `$1 $2 $3`.
pub fn sh_job(script: &str, target: &str, template: &str) -> Job {
    Job::new(
        target,
        vec!["-c".to_string(), script.to_string(), "sh".to_string()],
        template,
    )
}

pub fn output_lines(events: &[Notification]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|n| match n {
            Notification::OutputLine(l) => Some(l.as_str()),
            _ => None,
        })
        .collect()
}

pub fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}
