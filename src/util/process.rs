//! Subprocess execution utilities.
//!
//! Every external tool (toolchains, hooks) runs through [`ProcessBuilder`]
//! under a [`Cancellation`], so a timeout or an explicit cancel reaches any
//! running child process.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared cancellation signal with an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A signal that only fires when [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Cancellation::default()
    }

    /// A signal that also fires once `timeout` has elapsed.
    pub fn with_timeout(timeout: Duration) -> Self {
        Cancellation {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Fire the signal for every clone.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check whether the signal fired or the deadline passed.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Result of a finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    /// Interleaved stdout and stderr
    pub combined: String,
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    env_clear: bool,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            env_clear: false,
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set several environment variables.
    pub fn envs<'a, I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Do not inherit the parent environment; only variables set on the
    /// builder are passed.
    pub fn env_clear(mut self) -> Self {
        self.env_clear = true;
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if self.env_clear {
            cmd.env_clear();
        }
        cmd.envs(&self.env);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Run to completion under `cancel`, capturing combined output.
    ///
    /// The child is killed as soon as `cancel` fires.
    pub fn exec(&self, cancel: &Cancellation) -> Result<ProcessOutput> {
        self.exec_streaming(cancel, |_| {})
    }

    /// Like [`exec`](Self::exec), also handing every output line to
    /// `on_line` as soon as it is read.
    pub fn exec_streaming<F>(&self, cancel: &Cancellation, on_line: F) -> Result<ProcessOutput>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        if cancel.is_cancelled() {
            bail!("`{}` was not started: cancelled", self.display_command());
        }

        let mut child = self
            .build_command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        let combined = Arc::new(Mutex::new(Vec::new()));
        let on_line: Arc<dyn Fn(&str) + Send + Sync> = Arc::new(on_line);
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(pump(stdout, Arc::clone(&combined), Arc::clone(&on_line)));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(pump(stderr, Arc::clone(&combined), Arc::clone(&on_line)));
        }

        let status = loop {
            if let Some(status) = child
                .try_wait()
                .with_context(|| format!("failed to wait for `{}`", self.program.display()))?
            {
                break status;
            }
            if cancel.is_cancelled() {
                // The child may exit between the check and the kill.
                let _ = child.kill();
                let _ = child.wait();
                for reader in readers {
                    let _ = reader.join();
                }
                bail!("`{}` was cancelled", self.display_command());
            }
            thread::sleep(POLL_INTERVAL);
        };

        for reader in readers {
            let _ = reader.join();
        }
        let bytes = std::mem::take(&mut *combined.lock().unwrap_or_else(PoisonError::into_inner));

        Ok(ProcessOutput {
            status,
            combined: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// Run and require success, returning the combined output.
    pub fn exec_and_check(&self, cancel: &Cancellation) -> Result<String> {
        self.check(self.exec(cancel)?)
    }

    /// Turn a non-zero exit into an error carrying the output.
    pub fn check(&self, output: ProcessOutput) -> Result<String> {
        if !output.status.success() {
            bail!(
                "`{}` failed with exit code {:?}\n{}",
                self.display_command(),
                output.status.code(),
                output.combined.trim_end()
            );
        }
        Ok(output.combined)
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

fn pump<R>(
    source: R,
    sink: Arc<Mutex<Vec<u8>>>,
    on_line: Arc<dyn Fn(&str) + Send + Sync>,
) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut source = BufReader::new(source);
        let mut line = Vec::new();
        loop {
            line.clear();
            match source.read_until(b'\n', &mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    on_line(String::from_utf8_lossy(&line).trim_end());
                    sink.lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .extend_from_slice(&line);
                }
            }
        }
    })
}

/// Split a command line into words using shell quoting rules.
pub fn split_command(line: &str) -> Result<Vec<String>> {
    Ok(shell_words::split(line)?)
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
