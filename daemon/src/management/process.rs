use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, Command};
use tokio::select;
use tokio::sync::{mpsc, Mutex, Notify};

use warden_protocol::management::instance::InstanceNotification;

use super::command::ServerCommand;
use crate::error::Result;

lazy_static! {
    /// The managed server's startup-complete announcement: timestamp
    /// prefix, server thread tag, and the elapsed-seconds wording. May
    /// appear on stdout or stderr depending on the server's log config.
    static ref READY_PATTERN: Regex = Regex::new(
        r#"\[\d{1,2}:\d{1,2}:\d{1,2}\] \[Server thread/INFO\]: Done \(\d+\.\d+s\)! For help, type "help""#
    )
    .expect("failed to compile READY_PATTERN regex");
}

/// Flags shared between the instance facade and the per-process tasks.
///
/// `running` flips on at launch and off in the exit watcher; `ready`
/// flips on at the first readiness match and off on exit. Callers only
/// ever read them.
#[derive(Debug, Default)]
pub struct RuntimeState {
    pub running: AtomicBool,
    pub ready: AtomicBool,
}

pub struct ProcessStartInfo {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

/// A live supervised child: the stdin command pipe plus the handle used
/// to escalate a shutdown. Scanning and exit handling run on detached
/// tasks so no caller ever blocks on subprocess I/O.
#[derive(Debug)]
pub struct InstanceProcess {
    pid: u32,
    stdin: Mutex<ChildStdin>,
    kill_notify: Arc<Notify>,
}

impl InstanceProcess {
    pub fn spawn(
        instance_id: u32,
        start_info: ProcessStartInfo,
        state: Arc<RuntimeState>,
        exit_notify: Arc<Notify>,
        event_tx: mpsc::UnboundedSender<InstanceNotification>,
    ) -> Result<Self> {
        let mut child = Command::new(&start_info.program)
            .args(&start_info.args)
            .current_dir(&start_info.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let pid = child.id().unwrap_or(0);
        let stdin = child.stdin.take().unwrap();
        let stdout = child.stdout.take().unwrap();
        let stderr = child.stderr.take().unwrap();

        state.running.store(true, Ordering::SeqCst);
        state.ready.store(false, Ordering::SeqCst);

        let kill_notify = Arc::new(Notify::new());

        // one scanner per stream, both feeding the same readiness matcher
        tokio::spawn(scan_stream(
            instance_id,
            "stdout",
            stdout,
            state.clone(),
            event_tx.clone(),
        ));
        tokio::spawn(scan_stream(
            instance_id,
            "stderr",
            stderr,
            state.clone(),
            event_tx.clone(),
        ));

        // the exit watcher owns the child
        tokio::spawn({
            let kill_notify = kill_notify.clone();
            async move {
                let status = select! {
                    status = child.wait() => status,
                    _ = kill_notify.notified() => {
                        warn!("instance {instance_id}: killing pid {pid}");
                        if let Err(err) = child.kill().await {
                            warn!("instance {instance_id}: could not kill pid {pid}: {err}");
                        }
                        child.wait().await
                    }
                };

                state.running.store(false, Ordering::SeqCst);
                state.ready.store(false, Ordering::SeqCst);
                exit_notify.notify_waiters();

                let code = status.as_ref().ok().and_then(|status| status.code());
                match &status {
                    Ok(status) => info!("instance {instance_id} exited: {status}"),
                    Err(err) => warn!("instance {instance_id}: wait failed: {err}"),
                }
                let _ = event_tx.send(InstanceNotification::stopped(instance_id, code));
            }
        });

        Ok(Self {
            pid,
            stdin: Mutex::new(stdin),
            kill_notify,
        })
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Renders one command and writes it as a newline-terminated line to
    /// the child's stdin. Fire-and-forget; ordering follows call order
    /// since all writers share this one pipe.
    pub async fn send(&self, command: &ServerCommand) -> Result<()> {
        let mut stdin = self.stdin.lock().await;
        stdin.write_all(format!("{command}\n").as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    /// Requests a forcible kill of the child.
    pub fn kill(&self) {
        self.kill_notify.notify_one();
    }
}

async fn scan_stream<R>(
    instance_id: u32,
    stream: &'static str,
    reader: R,
    state: Arc<RuntimeState>,
    event_tx: mpsc::UnboundedSender<InstanceNotification>,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("instance {instance_id} {stream}: {line}");
        scan_line(instance_id, &line, &state, &event_tx);
    }
}

/// Matches one output line against the readiness announcement. The first
/// match since launch flips `ready` and reports it exactly once.
fn scan_line(
    instance_id: u32,
    line: &str,
    state: &RuntimeState,
    event_tx: &mpsc::UnboundedSender<InstanceNotification>,
) {
    if READY_PATTERN.is_match(line.trim_end()) && !state.ready.swap(true, Ordering::SeqCst) {
        info!("instance {instance_id} is ready");
        let _ = event_tx.send(InstanceNotification::ready(instance_id));
    }
}
