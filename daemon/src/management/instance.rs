use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Local;
use log::{debug, info, warn};
use tokio::sync::{mpsc, Mutex, Notify};

use warden_protocol::management::instance::{InstanceDescriptor, InstanceNotification, Member};

use super::command::ServerCommand;
use super::member_lists::{plan_live_commands, ListKind, PersistedEntry};
use super::process::{InstanceProcess, ProcessStartInfo, RuntimeState};
use super::properties::ServerProperties;
use crate::config::LaunchConfig;
use crate::error::{InstanceError, Result};
use crate::storage::files::Storage;

pub const EULA_FILE: &str = "eula.txt";
pub const PROPERTIES_FILE: &str = "server.properties";
pub const PROVISIONED_FILE: &str = "provisioned.txt";

/// The managed binary refuses to boot until this agreement file exists.
const EULA_CONTENT: &str = "eula=true";

/// One supervised server: working directory, configuration files, and
/// the optional live process. The facade the fleet layer talks to.
///
/// Descriptors are passed in fresh on every call; nothing from them is
/// cached here. On-disk documents are reread on every cycle, since the
/// files are authoritative between calls.
#[derive(Debug)]
pub struct ServerInstance {
    id: u32,
    storage: Storage,
    launch: LaunchConfig,
    state: Arc<RuntimeState>,
    exit_notify: Arc<Notify>,
    process: Mutex<Option<Arc<InstanceProcess>>>,
    event_tx: mpsc::UnboundedSender<InstanceNotification>,
}

impl ServerInstance {
    pub fn new(
        id: u32,
        storage: Storage,
        launch: LaunchConfig,
        event_tx: mpsc::UnboundedSender<InstanceNotification>,
    ) -> Self {
        Self {
            id,
            storage,
            launch,
            state: Arc::new(RuntimeState::default()),
            exit_notify: Arc::new(Notify::new()),
            process: Mutex::new(None),
            event_tx,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Cheap synchronous liveness query, no I/O.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Whether the readiness announcement has been seen since the
    /// current launch.
    pub fn is_ready(&self) -> bool {
        self.state.ready.load(Ordering::SeqCst)
    }

    fn dir(&self) -> PathBuf {
        self.storage.instance_dir(self.id)
    }

    /// Creates the working directory with its seed files: the agreement
    /// file, `server.properties` from the descriptor, and a provisioning
    /// timestamp marker. Fails with `AlreadyExists` when the directory is
    /// already there; `init` performs that check.
    pub async fn provision(&self, descriptor: &InstanceDescriptor) -> Result<()> {
        let dir = self.dir();
        if let Err(err) = tokio::fs::create_dir(&dir).await {
            return Err(match err.kind() {
                std::io::ErrorKind::AlreadyExists => InstanceError::AlreadyExists(dir),
                _ => err.into(),
            });
        }

        tokio::fs::write(dir.join(EULA_FILE), EULA_CONTENT).await?;
        self.write_properties(descriptor).await?;
        tokio::fs::write(dir.join(PROVISIONED_FILE), Local::now().to_rfc2822()).await?;

        info!("instance {}: provisioned {}", self.id, dir.display());
        Ok(())
    }

    /// Applies the descriptor's configuration entries onto the on-disk
    /// properties document and rewrites it. Keys the descriptor does not
    /// name keep their current value.
    pub async fn write_properties(&self, descriptor: &InstanceDescriptor) -> Result<()> {
        let path = self.storage.instance_file(self.id, PROPERTIES_FILE);
        let mut props = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => ServerProperties::parse(&raw),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => ServerProperties::default(),
            Err(err) => return Err(err.into()),
        };
        props.apply(&descriptor.properties);
        tokio::fs::write(&path, props.compile()).await?;
        Ok(())
    }

    /// Verifies the artifact and the working directory, provisioning the
    /// latter on first contact. Idempotent; safe before every start. The
    /// artifact check comes first and a failure mutates nothing.
    pub async fn init(&self, descriptor: &InstanceDescriptor) -> Result<()> {
        self.artifact_path(descriptor).await?;

        if !tokio::fs::try_exists(&self.dir()).await? {
            info!("instance {}: no working directory yet, provisioning", self.id);
            self.provision(descriptor).await?;
        }
        Ok(())
    }

    async fn artifact_path(&self, descriptor: &InstanceDescriptor) -> Result<PathBuf> {
        let path = self
            .storage
            .artifact_path(&descriptor.artifact)
            .ok_or_else(|| InstanceError::MissingArtifact(descriptor.artifact.clone()))?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(InstanceError::MissingArtifact(descriptor.artifact.clone()));
        }
        Ok(path)
    }

    /// Launches the server binary in the instance directory. Returns as
    /// soon as the child is spawned; readiness and exit are observed
    /// asynchronously through notifications.
    pub async fn start(&self, descriptor: &InstanceDescriptor) -> Result<()> {
        let artifact = std::path::absolute(self.artifact_path(descriptor).await?)?;

        let start_info = ProcessStartInfo {
            program: self.launch.java_path.clone(),
            args: vec![
                self.launch.java_heap.clone(),
                "-jar".to_string(),
                artifact.to_string_lossy().to_string(),
                "nogui".to_string(),
            ],
            working_dir: self.dir(),
        };

        info!("instance {}: starting {}", self.id, descriptor.artifact);
        let process = InstanceProcess::spawn(
            self.id,
            start_info,
            self.state.clone(),
            self.exit_notify.clone(),
            self.event_tx.clone(),
        )?;
        *self.process.lock().await = Some(Arc::new(process));
        Ok(())
    }

    async fn live_process(&self) -> Result<Arc<InstanceProcess>> {
        let process = self.process.lock().await.clone();
        match process {
            Some(process) if self.is_running() => Ok(process),
            _ => Err(InstanceError::NotRunning),
        }
    }

    /// Sends one typed command down the live stdin pipe.
    pub async fn send_command(&self, command: &ServerCommand) -> Result<()> {
        self.live_process().await?.send(command).await
    }

    /// Asks the server to shut down via its own console command, then
    /// arms the grace timer: a process still alive once it expires is
    /// forcibly killed.
    pub async fn stop(&self) -> Result<()> {
        let process = self.live_process().await?;
        process.send(&ServerCommand::Stop).await?;
        info!("instance {}: stop requested", self.id);

        let id = self.id;
        let grace = self.launch.stop_grace();
        let state = self.state.clone();
        let exit_notify = self.exit_notify.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = exit_notify.notified() => {}
                _ = tokio::time::sleep(grace) => {
                    if state.running.load(Ordering::SeqCst) {
                        warn!("instance {id}: still alive after {grace:?}, escalating");
                        process.kill();
                    }
                }
            }
        });
        Ok(())
    }

    /// Brings one or both member lists in line with the descriptor.
    /// `None` reconciles the allow-list first, then the operators, since
    /// operator grants assume allow-listed membership.
    pub async fn reconcile_lists(
        &self,
        descriptor: &InstanceDescriptor,
        kind: Option<ListKind>,
    ) -> Result<()> {
        match kind {
            Some(kind) => self.reconcile_list(descriptor, kind).await,
            None => {
                self.reconcile_list(descriptor, ListKind::AllowList).await?;
                self.reconcile_list(descriptor, ListKind::Operators).await
            }
        }
    }

    async fn reconcile_list(&self, descriptor: &InstanceDescriptor, kind: ListKind) -> Result<()> {
        let desired: &[Member] = match kind {
            ListKind::AllowList => &descriptor.allow_list,
            ListKind::Operators => &descriptor.operators,
        };
        let file = self.storage.instance_file(self.id, kind.file_name());

        if self.is_running() {
            // Live path: diff the on-disk snapshot against the descriptor
            // and drive the difference through the console. The server
            // rewrites its own file as it processes the commands, so the
            // snapshot may lag; duplicate commands are harmless no-ops.
            let persisted_names = match tokio::fs::read_to_string(&file).await {
                Ok(raw) => {
                    let entries: Vec<PersistedEntry> = serde_json::from_str(&raw)
                        .map_err(|source| InstanceError::MalformedList {
                            file: file.clone(),
                            source,
                        })?;
                    entries.into_iter().map(|entry| entry.name).collect()
                }
                // the server has not written the file yet this lifetime
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
                Err(err) => return Err(err.into()),
            };
            let desired_names: Vec<String> =
                desired.iter().map(|member| member.name.clone()).collect();

            let commands = plan_live_commands(kind, &persisted_names, &desired_names);
            debug!(
                "instance {}: reconciling {} live, {} command(s)",
                self.id,
                kind.file_name(),
                commands.len()
            );
            for command in &commands {
                self.send_command(command).await?;
            }
        } else {
            // Stopped path: the server only reads this file at startup, a
            // wholesale overwrite is safe and needs no diffing.
            let content = kind
                .serialize(desired)
                .map_err(|source| InstanceError::MalformedList {
                    file: file.clone(),
                    source,
                })?;
            tokio::fs::write(&file, content).await?;
            debug!("instance {}: rewrote {}", self.id, kind.file_name());
        }
        Ok(())
    }
}
