//! The loop executed on the run's worker thread.

use std::io;

use super::launcher::{LaunchError, ProcessExit};
use super::notify::{Notification, NotificationSink};
use super::stamp::{stamp_template, Stamper};
use super::{JobRunner, Tally};

const RULE: &str = "==================================================";

enum JobOutcome {
    Exited(ProcessExit),
    /// Launched, but reading its output or waiting for it failed.
    Broken(io::Error),
    /// The tool could not be started; ends the run.
    Unavailable(LaunchError),
}

struct Emitter<'a, S> {
    sink: &'a S,
    stream: bool,
}

impl<S: NotificationSink> Emitter<'_, S> {
    fn progress(&self, text: String) {
        self.sink.notify(Notification::Progress(text));
    }

    fn output(&self, text: String) {
        if self.stream {
            self.sink.notify(Notification::OutputLine(text));
        }
    }
}

pub(super) fn run_queue<S: NotificationSink>(runner: &JobRunner, sink: &S) -> Tally {
    let total = runner.jobs.len();
    let program = runner.options.program.as_str();
    let emit = Emitter {
        sink,
        stream: runner.options.stream_output,
    };
    let mut tally = Tally::default();
    let mut stamper = Stamper::new();

    tracing::info!(jobs = total, program, "run started");

    for (index, job) in runner.jobs.iter().enumerate() {
        let position = index + 1;
        if runner.stop.is_stopped() {
            tracing::info!(
                position,
                succeeded = tally.succeeded,
                failed = tally.failed,
                "run stopped before job"
            );
            return tally;
        }

        emit.progress(format!("downloading {position}/{total}: {}", job.target));

        let output_path = stamp_template(&job.output_template, &stamper.next_stamp());
        let args = job.command_args(&output_path);
        tracing::debug!(position, target_url = %job.target, output = %output_path, "job started");
        emit.output(format!(
            "{RULE}\nstarting download of: {}\ncommand: {} {}\n{RULE}",
            job.target,
            program,
            args.join(" ")
        ));

        match execute(runner, program, &args, &emit) {
            JobOutcome::Exited(exit) if exit.success() => {
                tally.succeeded += 1;
                tracing::debug!(position, "job succeeded");
                emit.output(format!("done: {} downloaded successfully", job.target));
            }
            JobOutcome::Exited(exit) => {
                tally.failed += 1;
                tracing::warn!(position, code = exit.code, target_url = %job.target, "job failed");
                emit.output(format!(
                    "error downloading {}: exit code {}",
                    job.target, exit.code
                ));
                emit.output(format!("error details: {}", exit.stderr.trim_end()));
            }
            JobOutcome::Broken(e) => {
                tally.failed += 1;
                tracing::warn!(position, target_url = %job.target, "job output failed: {}", e);
                emit.output(format!("error downloading {}: {}", job.target, e));
            }
            JobOutcome::Unavailable(e) => {
                tally.failed += 1;
                tracing::error!(position, "{}", e);
                let message = e.to_string();
                emit.output(format!("error: {message}"));
                sink.notify(Notification::Error(message));
                return tally;
            }
        }
    }

    if runner.stop.is_stopped() {
        // stop() raced with the last job; the caller asked for silence.
        return tally;
    }

    let summary = format!(
        "done: {}/{total} downloads succeeded, {}/{total} failed",
        tally.succeeded, tally.failed
    );
    tracing::info!(
        succeeded = tally.succeeded,
        failed = tally.failed,
        "run finished"
    );
    emit.output(format!("{RULE}\n{summary}\n{RULE}"));
    emit.progress(summary);
    sink.notify(Notification::Finished {
        succeeded: tally.succeeded,
        failed: tally.failed,
    });
    tally
}

fn execute<S: NotificationSink>(
    runner: &JobRunner,
    program: &str,
    args: &[String],
    emit: &Emitter<'_, S>,
) -> JobOutcome {
    let mut process = match runner.launcher.launch(program, args) {
        Ok(p) => p,
        Err(e) => return JobOutcome::Unavailable(e),
    };

    let mut read_error = None;
    loop {
        match process.next_line() {
            Ok(Some(line)) => emit.output(line),
            Ok(None) => break,
            Err(e) => {
                read_error = Some(e);
                break;
            }
        }
    }

    // Always reap the child, even when its output broke off.
    match (process.wait(), read_error) {
        (Ok(exit), None) => JobOutcome::Exited(exit),
        (Ok(_), Some(e)) | (Err(e), _) => JobOutcome::Broken(e),
    }
}
