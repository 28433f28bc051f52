use std::path::{Path, PathBuf};

/// On-disk layout owned by the daemon: one shared artifact directory,
/// read-only after provisioning, plus one working directory per instance
/// id under the instances root.
#[derive(Debug, Clone)]
pub struct Storage {
    artifacts_root: PathBuf,
    instances_root: PathBuf,
}

impl Storage {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref();
        Self {
            artifacts_root: root.join("artifacts"),
            instances_root: root.join("instances"),
        }
    }

    pub async fn init_dirs(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.artifacts_root).await?;
        tokio::fs::create_dir_all(&self.instances_root).await
    }

    pub fn instance_dir(&self, id: u32) -> PathBuf {
        self.instances_root.join(id.to_string())
    }

    pub fn instance_file(&self, id: u32, name: &str) -> PathBuf {
        self.instance_dir(id).join(name)
    }

    /// Resolves an artifact file name inside the artifact root, or `None`
    /// when the name fails sanitization.
    pub fn artifact_path(&self, name: &str) -> Option<PathBuf> {
        sanitize_file_name(name).map(|name| self.artifacts_root.join(name))
    }
}

/// Accepts a bare file name only. Separators, parent references and empty
/// names would let a descriptor escape the artifact directory.
pub fn sanitize_file_name(name: &str) -> Option<&str> {
    let name = name.trim();
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    if name.contains('/') || name.contains('\\') || name.contains('\0') {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_accepts_plain_file_names() {
        assert_eq!(sanitize_file_name("server-1.8.9.jar"), Some("server-1.8.9.jar"));
        assert_eq!(sanitize_file_name("  spigot.jar "), Some("spigot.jar"));
    }

    #[test]
    fn sanitize_rejects_traversal() {
        assert_eq!(sanitize_file_name(".."), None);
        assert_eq!(sanitize_file_name("../etc/passwd"), None);
        assert_eq!(sanitize_file_name("jars/../../server.jar"), None);
        assert_eq!(sanitize_file_name("a\\b.jar"), None);
        assert_eq!(sanitize_file_name(""), None);
    }

    #[test]
    fn storage_paths_are_keyed_by_id() {
        let storage = Storage::new("warden");
        assert_eq!(storage.instance_dir(42), PathBuf::from("warden/instances/42"));
        assert_eq!(
            storage.instance_file(42, "eula.txt"),
            PathBuf::from("warden/instances/42/eula.txt")
        );
        assert_eq!(
            storage.artifact_path("server.jar"),
            Some(PathBuf::from("warden/artifacts/server.jar"))
        );
        assert_eq!(storage.artifact_path("../server.jar"), None);
    }
}
