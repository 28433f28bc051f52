use std::sync::Arc;
use std::time::Duration;

use log::warn;
use scc::HashMap;
use tokio::sync::mpsc;

use warden_protocol::management::instance::{InstanceDescriptor, InstanceNotification};

use super::instance::ServerInstance;
use crate::config::LaunchConfig;
use crate::error::Result;
use crate::storage::files::Storage;

/// Registry of supervised instances, one object per id for the lifetime
/// of the daemon.
///
/// The single-object-per-id invariant is what serializes provisioning
/// and reconciliation for an instance; the directory existence check in
/// `provision` stays as a second line of defense against a stale tree.
pub struct InstanceManager {
    storage: Storage,
    launch: LaunchConfig,
    // ahash keyed registry, shared with every control-surface caller
    instances: HashMap<u32, Arc<ServerInstance>, ahash::RandomState>,
    event_tx: mpsc::UnboundedSender<InstanceNotification>,
}

impl InstanceManager {
    pub fn new(
        storage: Storage,
        launch: LaunchConfig,
    ) -> (Self, mpsc::UnboundedReceiver<InstanceNotification>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        (
            Self {
                storage,
                launch,
                instances: HashMap::default(),
                event_tx,
            },
            event_rx,
        )
    }

    /// Returns the instance registered under the descriptor's id,
    /// creating it on first sight. Validation happens here, before any
    /// side effect.
    pub async fn acquire(&self, descriptor: &InstanceDescriptor) -> Result<Arc<ServerInstance>> {
        descriptor.validate()?;

        if let Some(existing) = self
            .instances
            .read_async(&descriptor.id, |_, instance| instance.clone())
            .await
        {
            return Ok(existing);
        }

        let instance = Arc::new(ServerInstance::new(
            descriptor.id,
            self.storage.clone(),
            self.launch.clone(),
            self.event_tx.clone(),
        ));
        match self
            .instances
            .insert_async(descriptor.id, instance.clone())
            .await
        {
            Ok(()) => Ok(instance),
            // lost a registration race; the winner's object is the one
            Err(_) => Ok(self
                .instances
                .read_async(&descriptor.id, |_, instance| instance.clone())
                .await
                .unwrap_or(instance)),
        }
    }

    pub async fn get(&self, id: u32) -> Option<Arc<ServerInstance>> {
        self.instances
            .read_async(&id, |_, instance| instance.clone())
            .await
    }

    /// Requests a graceful stop of every running instance.
    pub async fn stop_all(&self) {
        let mut running = Vec::new();
        self.instances
            .scan_async(|_, instance| {
                if instance.is_running() {
                    running.push(instance.clone());
                }
            })
            .await;

        for instance in running {
            if let Err(err) = instance.stop().await {
                warn!("instance {}: stop failed: {}", instance.id(), err);
            }
        }
    }

    /// Waits until no instance is running, or until the deadline passes.
    pub async fn wait_idle(&self, timeout: Duration) {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let mut any_running = false;
            self.instances
                .scan_async(|_, instance| any_running |= instance.is_running())
                .await;
            if !any_running || tokio::time::Instant::now() >= deadline {
                return;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }
}
