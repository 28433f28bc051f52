use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};

use warden_protocol::management::instance::{InstanceDescriptor, Manifest};

use crate::config::AppConfig;
use crate::error::Result;
use crate::management::manager::InstanceManager;
use crate::storage::file::{Config, FileIoWithBackup};
use crate::storage::files::Storage;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const MANIFEST_FILE: &str = "manifest.json";

struct ManifestFile;
impl FileIoWithBackup for ManifestFile {}
impl Config for ManifestFile {
    type ConfigType = Manifest;
}

fn load_manifest() -> anyhow::Result<Manifest> {
    if Path::new(MANIFEST_FILE).is_file() {
        ManifestFile::load_config(MANIFEST_FILE)
    } else {
        Ok(Manifest::default())
    }
}

/// Registers, initializes, reconciles and launches one instance. List
/// files are written before the launch so the server picks them up when
/// it reads them at startup.
async fn boot_instance(manager: &InstanceManager, descriptor: &InstanceDescriptor) -> Result<()> {
    let instance = manager.acquire(descriptor).await?;
    instance.init(descriptor).await?;
    instance.write_properties(descriptor).await?;
    instance.reconcile_lists(descriptor, None).await?;
    instance.start(descriptor).await
}

pub async fn run_app() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    debug!("config loaded: {}", serde_json::to_string_pretty(&config)?);

    let storage = Storage::new(&config.root);
    storage.init_dirs().await?;

    let (manager, mut events) = InstanceManager::new(storage, config.launch.clone());
    let manager = Arc::new(manager);

    // surface readiness/exit transitions in the log until a fleet
    // transport is wired up
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event.exit_code {
                Some(code) => info!("instance {} -> {:?} (exit code {})", event.id, event.state, code),
                None => info!("instance {} -> {:?}", event.id, event.state),
            }
        }
    });

    let manifest = load_manifest()?;
    info!(
        "warden {} supervising {} instance(s)",
        VERSION,
        manifest.instances.len()
    );
    for descriptor in &manifest.instances {
        if let Err(err) = boot_instance(&manager, descriptor).await {
            error!("instance {}: boot failed: {}", descriptor.id, err);
        }
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    manager.stop_all().await;
    manager
        .wait_idle(config.launch.stop_grace() + Duration::from_secs(5))
        .await;
    info!("Bye.");
    Ok(())
}
