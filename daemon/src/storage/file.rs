use std::path::Path;

use serde::{Deserialize, Serialize};

pub trait FileIoWithBackup {
    /// Writes content to a file, copying any existing file to `<name>.bak`
    /// first.
    fn write_with_backup<P: AsRef<Path>>(path: P, content: &str) -> Result<(), std::io::Error> {
        let path = path.as_ref();

        if path.exists() {
            std::fs::copy(path, path.with_extension("bak"))?;
        }

        std::fs::write(path, content)
    }
}

/// JSON config files loaded at startup, saved with a backup.
pub trait Config: FileIoWithBackup {
    type ConfigType: Serialize + for<'de> Deserialize<'de>;

    fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<Self::ConfigType> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self::ConfigType = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn save_config<P: AsRef<Path>>(path: P, config: &Self::ConfigType) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(config)?;
        Self::write_with_backup(path.as_ref(), &content)?;
        Ok(())
    }

    /// Loads the file when present, otherwise persists and returns the
    /// supplied default.
    fn load_config_or_default<P: AsRef<Path>, F: FnOnce() -> Self::ConfigType>(
        path: P,
        default: F,
    ) -> anyhow::Result<Self::ConfigType> {
        match std::fs::metadata(path.as_ref()) {
            Ok(metadata) if metadata.is_file() => Self::load_config(path),
            _ => {
                let config = default();
                Self::save_config(path, &config)?;
                Ok(config)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
    struct Sample {
        name: String,
        count: u32,
    }

    struct SampleFile;
    impl FileIoWithBackup for SampleFile {}
    impl Config for SampleFile {
        type ConfigType = Sample;
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");

        let sample = Sample {
            name: "warden".to_string(),
            count: 3,
        };
        SampleFile::save_config(&path, &sample).unwrap();
        assert_eq!(SampleFile::load_config(&path).unwrap(), sample);
    }

    #[test]
    fn save_keeps_a_backup_of_the_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");

        SampleFile::save_config(&path, &Sample::default()).unwrap();
        SampleFile::save_config(
            &path,
            &Sample {
                name: "next".to_string(),
                count: 1,
            },
        )
        .unwrap();

        let backup = path.with_extension("bak");
        assert_eq!(SampleFile::load_config(&backup).unwrap(), Sample::default());
    }

    #[test]
    fn load_or_default_writes_the_default_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");

        let loaded = SampleFile::load_config_or_default(&path, Sample::default).unwrap();
        assert_eq!(loaded, Sample::default());
        assert!(path.is_file());
    }
}
