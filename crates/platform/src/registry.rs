//! Registry of live helper processes

use async_trait::async_trait;
use repofetch_errors::{Error, PlatformError};
use repofetch_events::{AppEvent, EventEmitter, EventSender, ProcessEvent};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::process::{CommandOutput, HelperCommand, ProcessOperations};

/// Owned handle over every helper process spawned during a run
///
/// Clones share the same registry. Each spawned child is tracked by a
/// [`HelperGuard`] for as long as it runs; `terminate_all` kills every
/// tracked child and refuses further spawns.
#[derive(Clone)]
pub struct ProcessRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    cancel: CancellationToken,
    active: Mutex<HashMap<u64, String>>,
    next_id: AtomicU64,
    tx: Option<EventSender>,
}

/// Registration of one live helper, removed on drop
pub struct HelperGuard {
    id: u64,
    token: CancellationToken,
    registry: Arc<RegistryInner>,
}

impl HelperGuard {
    /// Token cancelled when the registry tears down its helpers
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for HelperGuard {
    fn drop(&mut self) {
        self.registry
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl ProcessRegistry {
    /// Create a registry whose helpers die when `parent` is cancelled
    #[must_use]
    pub fn new(parent: &CancellationToken, tx: Option<EventSender>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                cancel: parent.child_token(),
                active: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
                tx,
            }),
        }
    }

    /// Register a helper about to run
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` once the registry has been torn down.
    pub fn register(&self, helper: &str) -> Result<HelperGuard, Error> {
        if self.inner.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, helper.to_string());
        Ok(HelperGuard {
            id,
            token: self.inner.cancel.child_token(),
            registry: Arc::clone(&self.inner),
        })
    }

    /// Number of helpers currently running
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Kill every running helper and refuse new ones
    ///
    /// Returns how many helpers were running.
    pub fn terminate_all(&self) -> usize {
        let count = self.active_count();
        self.inner.cancel.cancel();
        if count > 0 {
            self.emit(AppEvent::Process(ProcessEvent::Terminated { count }));
        }
        count
    }

    /// Run a helper to completion, capturing stdout and stderr
    ///
    /// # Errors
    ///
    /// Returns `PlatformError::SpawnFailed` if the process cannot start and
    /// `Error::Cancelled` if the registry is torn down while it runs; the
    /// child is killed in that case.
    pub async fn run(&self, cmd: &HelperCommand) -> Result<CommandOutput, Error> {
        let helper = cmd.helper_name();
        let guard = self.register(&helper)?;
        let start = Instant::now();

        self.emit(AppEvent::Process(ProcessEvent::Spawned {
            helper: helper.clone(),
            command: cmd.display_masked(),
        }));

        let mut command = Command::new(cmd.program());
        command
            .args(cmd.get_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = cmd.get_current_dir() {
            command.current_dir(dir);
        }
        for (key, value) in cmd.get_env_vars() {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|e| PlatformError::SpawnFailed {
            helper: helper.clone(),
            message: e.to_string(),
        })?;

        let output = tokio::select! {
            result = collect_output(&mut child) => result.map_err(|e| PlatformError::SpawnFailed {
                helper: helper.clone(),
                message: e.to_string(),
            })?,
            () = guard.token().cancelled() => {
                // dropping the child kills it
                return Err(Error::Cancelled);
            }
        };

        self.emit(AppEvent::Process(ProcessEvent::Exited {
            helper,
            code: output.status.code(),
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        }));
        drop(guard);
        Ok(output)
    }
}

async fn collect_output(child: &mut Child) -> std::io::Result<CommandOutput> {
    let mut stdout_pipe = child.stdout.take();
    let mut stderr_pipe = child.stderr.take();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let read_stdout = async {
        if let Some(pipe) = stdout_pipe.as_mut() {
            pipe.read_to_end(&mut stdout).await?;
        }
        Ok::<_, std::io::Error>(())
    };
    let read_stderr = async {
        if let Some(pipe) = stderr_pipe.as_mut() {
            pipe.read_to_end(&mut stderr).await?;
        }
        Ok::<_, std::io::Error>(())
    };

    let (out_res, err_res, status) = tokio::join!(read_stdout, read_stderr, child.wait());
    out_res?;
    err_res?;
    Ok(CommandOutput {
        status: status?,
        stdout,
        stderr,
    })
}

impl EventEmitter for ProcessRegistry {
    fn event_sender(&self) -> Option<&EventSender> {
        self.inner.tx.as_ref()
    }
}

#[async_trait]
impl ProcessOperations for ProcessRegistry {
    async fn execute_command(&self, cmd: HelperCommand) -> Result<CommandOutput, Error> {
        self.run(&cmd).await
    }

    fn which(&self, program: &str, fallback_dirs: &[PathBuf]) -> Result<PathBuf, Error> {
        crate::lookup::resolve_program(program, fallback_dirs)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sh(script: &str) -> HelperCommand {
        let mut cmd = HelperCommand::new("/bin/sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let registry = ProcessRegistry::new(&CancellationToken::new(), None);
        let output = registry
            .run(&sh("echo out; echo err >&2"))
            .await
            .unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err");
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn non_zero_exit_becomes_helper_failed() {
        let registry = ProcessRegistry::new(&CancellationToken::new(), None);
        let output = registry
            .run(&sh("echo 'repo base unreadable' >&2; exit 3"))
            .await
            .unwrap();
        let err = output.check("sh").unwrap_err();
        match err {
            Error::Platform(PlatformError::HelperFailed {
                helper,
                code,
                stderr,
            }) => {
                assert_eq!(helper, "sh");
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "repo base unreadable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn terminate_all_kills_running_helper() {
        let registry = ProcessRegistry::new(&CancellationToken::new(), None);
        let runner = registry.clone();
        let handle = tokio::spawn(async move { runner.run(&sh("sleep 30")).await });

        for _ in 0..100 {
            if registry.active_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(registry.terminate_all(), 1);

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(registry.active_count(), 0);
    }

    #[tokio::test]
    async fn spawn_after_teardown_is_refused() {
        let parent = CancellationToken::new();
        let (tx, mut rx) = repofetch_events::channel();
        let registry = ProcessRegistry::new(&parent, Some(tx));
        parent.cancel();
        let result = registry.run(&sh("true")).await;
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let registry = ProcessRegistry::new(&CancellationToken::new(), None);
        let cmd = HelperCommand::new("/nonexistent/repofetch-helper");
        let err = registry.run(&cmd).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::SpawnFailed { .. })
        ));
        assert_eq!(registry.active_count(), 0);
    }
}
