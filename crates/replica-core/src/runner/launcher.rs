//! Process-launch seam: start the external tool, read its stdout line by
//! line, capture stderr and collect the exit status.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

use thiserror::Error;

/// The executable could not be started at all.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("external tool not found: {program}")]
    NotFound { program: String },
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    fn from_spawn(program: &str, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            LaunchError::NotFound {
                program: program.to_string(),
            }
        } else {
            LaunchError::Spawn {
                program: program.to_string(),
                source: err,
            }
        }
    }
}

/// How a launched process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code; -1 when the process was terminated by a signal.
    pub code: i32,
    /// Everything the process wrote to stderr.
    pub stderr: String,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// A process started by a [`Launcher`].
pub trait RunningProcess: Send {
    /// Next stdout line without its terminator; `None` at end of stream.
    /// `\n`, `\r\n` and a lone `\r` all end a line.
    fn next_line(&mut self) -> io::Result<Option<String>>;

    /// Wait for termination. Unread stdout is discarded.
    fn wait(self: Box<Self>) -> io::Result<ProcessExit>;
}

pub trait Launcher: Send + Sync + 'static {
    fn launch(&self, program: &str, args: &[String])
        -> Result<Box<dyn RunningProcess>, LaunchError>;
}

/// Launches real OS processes with piped stdout/stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<Box<dyn RunningProcess>, LaunchError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| LaunchError::from_spawn(program, e))?;
        tracing::debug!(program, pid = child.id(), "process started");

        // stderr is drained on its own thread so a chatty tool cannot fill
        // the pipe while we block on stdout.
        let stderr_drain = match child.stderr.take() {
            Some(mut stderr) => {
                let spawned = thread::Builder::new()
                    .name("replica-stderr".to_string())
                    .spawn(move || {
                        let mut buf = Vec::new();
                        if let Err(e) = stderr.read_to_end(&mut buf) {
                            tracing::debug!("stderr read: {}", e);
                        }
                        String::from_utf8_lossy(&buf).into_owned()
                    });
                match spawned {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(LaunchError::Spawn {
                            program: program.to_string(),
                            source: e,
                        });
                    }
                }
            }
            None => None,
        };

        let stdout = child.stdout.take().map(BufReader::new);
        Ok(Box::new(SystemProcess {
            child,
            stdout,
            stderr_drain,
            after_cr: false,
        }))
    }
}

struct SystemProcess {
    child: Child,
    stdout: Option<BufReader<ChildStdout>>,
    stderr_drain: Option<JoinHandle<String>>,
    /// The previous line ended in `\r`; a `\n` right after it is part of
    /// the same terminator.
    after_cr: bool,
}

impl RunningProcess for SystemProcess {
    fn next_line(&mut self) -> io::Result<Option<String>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };
        // yt-dlp redraws its progress with `\r`; each redraw is returned as
        // soon as it arrives instead of waiting for the next `\n`.
        let mut buf = Vec::new();
        loop {
            let available = match stdout.fill_buf() {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if available.is_empty() {
                self.after_cr = false;
                if buf.is_empty() {
                    return Ok(None);
                }
                break;
            }
            if self.after_cr {
                self.after_cr = false;
                if available[0] == b'\n' {
                    stdout.consume(1);
                    continue;
                }
            }
            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                Some(end) => {
                    self.after_cr = available[end] == b'\r';
                    buf.extend_from_slice(&available[..end]);
                    stdout.consume(end + 1);
                    break;
                }
                None => {
                    let len = available.len();
                    buf.extend_from_slice(available);
                    stdout.consume(len);
                }
            }
        }
        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }

    fn wait(mut self: Box<Self>) -> io::Result<ProcessExit> {
        if let Some(mut stdout) = self.stdout.take() {
            if let Err(e) = io::copy(&mut stdout, &mut io::sink()) {
                tracing::debug!("discarding stdout: {}", e);
            }
        }
        let status = self.child.wait()?;
        let stderr = self
            .stderr_drain
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        Ok(ProcessExit {
            code: status.code().unwrap_or(-1),
            stderr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn missing_program_is_not_found() {
        let err = SystemLauncher
            .launch("replica-test-definitely-missing-tool", &[])
            .err()
            .expect("launch must fail");
        assert!(matches!(err, LaunchError::NotFound { .. }));
        assert!(err.to_string().starts_with("external tool not found"));
    }

    #[test]
    fn spawn_error_keeps_other_kinds() {
        let err = LaunchError::from_spawn(
            "yt-dlp",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, LaunchError::Spawn { .. }));
        assert_eq!(err.to_string(), "failed to launch yt-dlp: denied");
    }

    #[cfg(unix)]
    #[test]
    fn reads_lines_then_exit_and_stderr() {
        let args: Vec<String> = vec![
            "-c".into(),
            "printf 'one\\r\\ntwo\\n'; echo bad >&2; exit 4".into(),
        ];
        let mut p = SystemLauncher.launch("sh", &args).unwrap();
        assert_eq!(p.next_line().unwrap().as_deref(), Some("one"));
        assert_eq!(p.next_line().unwrap().as_deref(), Some("two"));
        assert_eq!(p.next_line().unwrap(), None);
        let exit = p.wait().unwrap();
        assert_eq!(exit.code, 4);
        assert!(!exit.success());
        assert_eq!(exit.stderr.trim(), "bad");
    }

    #[cfg(unix)]
    #[test]
    fn carriage_return_updates_arrive_one_by_one() {
        let args: Vec<String> = vec![
            "-c".into(),
            "printf '[download] 10%%\\r'; sleep 2; printf '[download] 100%%\\n'".into(),
        ];
        let started = Instant::now();
        let mut p = SystemLauncher.launch("sh", &args).unwrap();
        assert_eq!(p.next_line().unwrap().as_deref(), Some("[download] 10%"));
        assert!(
            started.elapsed() < Duration::from_millis(1500),
            "first update waited for the next newline: {:?}",
            started.elapsed()
        );
        assert_eq!(p.next_line().unwrap().as_deref(), Some("[download] 100%"));
        assert_eq!(p.next_line().unwrap(), None);
        assert!(p.wait().unwrap().success());
    }

    #[cfg(unix)]
    #[test]
    fn crlf_split_across_writes_is_one_terminator() {
        let args: Vec<String> = vec![
            "-c".into(),
            "printf 'a\\r'; sleep 1; printf '\\nb\\r\\rc'".into(),
        ];
        let mut p = SystemLauncher.launch("sh", &args).unwrap();
        let mut lines = Vec::new();
        while let Some(line) = p.next_line().unwrap() {
            lines.push(line);
        }
        assert_eq!(lines, vec!["a", "b", "", "c"]);
        assert!(p.wait().unwrap().success());
    }

    #[cfg(unix)]
    #[test]
    fn wait_discards_unread_stdout() {
        let args: Vec<String> = vec!["-c".into(), "seq 1 20000".into()];
        let p = SystemLauncher.launch("sh", &args).unwrap();
        let exit = p.wait().unwrap();
        assert!(exit.success());
    }
}
