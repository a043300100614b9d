//! `replica download <links>` – run one download batch in the foreground.
//!
//! The runner works on its own thread; this task only renders its
//! notifications. Ctrl-C asks the runner to stop after the current
//! download and waits for it before returning.

use std::future::Future;
use std::io;

use anyhow::{bail, Context, Result};
use replica_core::config::ReplicaConfig;
use replica_core::request::{DownloadRequest, MediaFormat, Quality};
use replica_core::runner::StopHandle;
use replica_core::{JobRunner, Notification, RunOptions};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::cli::DownloadArgs;

/// How the notification stream ended.
#[derive(Debug, PartialEq, Eq)]
enum RunEnd {
    Finished { succeeded: u32, failed: u32 },
    ToolUnavailable(String),
    Cancelled,
}

pub async fn run_download(saved: &ReplicaConfig, args: &DownloadArgs) -> Result<()> {
    let settings = args.effective_settings(saved);
    let format: MediaFormat = args.format.parse()?;
    let quality: Quality = args.quality.parse()?;
    let request = DownloadRequest::new(
        &args.links.join(","),
        format,
        quality,
        settings.skip_cert_check,
        &settings.save_dir,
    )?;

    std::fs::create_dir_all(&request.save_dir)
        .with_context(|| format!("creating {}", request.save_dir.display()))?;

    let jobs = request.jobs();
    println!(
        "Downloading {} link(s) as {} to {}",
        jobs.len(),
        format,
        request.save_dir.display()
    );
    tracing::info!(
        links = jobs.len(),
        %format,
        %quality,
        skip_cert_check = settings.skip_cert_check,
        "download requested"
    );

    let options = RunOptions {
        program: settings.tool_path.clone(),
        stream_output: settings.show_output,
    };
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let handle = JobRunner::with_system_launcher(jobs, options).start(tx)?;
    let end = render(rx, handle.stopper(), tokio::signal::ctrl_c()).await;

    let tally = tokio::task::spawn_blocking(move || handle.join())
        .await
        .context("waiting for download worker")??;
    tracing::debug!(?tally, ?end, "run ended");

    match end {
        RunEnd::Finished { succeeded, failed } => {
            if let Some(msg) = summary_message(succeeded, failed) {
                println!("{msg}");
            }
            if failed > 0 {
                bail!("{failed} of {} download(s) failed", succeeded + failed);
            }
            Ok(())
        }
        RunEnd::ToolUnavailable(msg) => {
            bail!("{msg} (install yt-dlp and make sure it is on PATH, or set tool_path)")
        }
        RunEnd::Cancelled => {
            println!(
                "Stopped: {} succeeded, {} failed before cancel.",
                tally.succeeded, tally.failed
            );
            Ok(())
        }
    }
}

/// Print notifications until the run ends. The first `interrupt` requests a stop.
///
/// `interrupt` is created once and kept across iterations: a Ctrl-C that
/// lands while a notification is being printed is still seen on the next
/// poll.
async fn render<F>(
    mut rx: UnboundedReceiver<Notification>,
    stopper: StopHandle,
    interrupt: F,
) -> RunEnd
where
    F: Future<Output = io::Result<()>>,
{
    tokio::pin!(interrupt);
    let mut end = None;
    let mut cancelled = false;
    loop {
        let next = if cancelled {
            rx.recv().await
        } else {
            tokio::select! {
                n = rx.recv() => n,
                signal = &mut interrupt => {
                    if let Err(e) = signal {
                        tracing::warn!("listening for Ctrl-C: {}", e);
                    }
                    eprintln!("Stopping after the current download...");
                    stopper.stop();
                    cancelled = true;
                    continue;
                }
            }
        };
        let Some(notification) = next else {
            break;
        };
        if let Some(e) = print_notification(notification) {
            end = Some(e);
        }
    }
    end.unwrap_or(RunEnd::Cancelled)
}

fn print_notification(notification: Notification) -> Option<RunEnd> {
    match notification {
        Notification::Progress(text) => {
            eprintln!("{text}");
            None
        }
        Notification::OutputLine(line) => {
            println!("{line}");
            None
        }
        Notification::Finished { succeeded, failed } => {
            Some(RunEnd::Finished { succeeded, failed })
        }
        Notification::Error(msg) => {
            eprintln!("error: {msg}");
            Some(RunEnd::ToolUnavailable(msg))
        }
    }
}

/// End-of-run summary; `None` when nothing ran.
fn summary_message(succeeded: u32, failed: u32) -> Option<String> {
    let total = succeeded + failed;
    if succeeded > 0 {
        let mut msg = format!("Download finished: {succeeded}/{total} file(s) downloaded successfully");
        if failed > 0 {
            msg.push_str(&format!(", {failed}/{total} failed"));
        }
        msg.push('.');
        Some(msg)
    } else if failed > 0 {
        Some(format!("All downloads failed ({failed}/{total})."))
    } else {
        None
    }
}
