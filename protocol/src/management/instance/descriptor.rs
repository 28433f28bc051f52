use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// One identity on an access-control list: a stable unique id plus the
/// display name the managed server addresses the player by.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub uuid: Uuid,
    pub name: String,
}

/// Desired state of a single supervised server.
///
/// The fleet layer supplies a fresh descriptor on every call; the daemon
/// never caches one. `id` must stay stable across calls since list
/// reconciliation diffs against state keyed by it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceDescriptor {
    pub id: u32,
    /// File name of the server jar inside the shared artifact directory.
    pub artifact: String,
    /// `server.properties` entries to enforce. Keys absent here are left
    /// untouched in an existing file.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub allow_list: Vec<Member>,
    /// Not required to be a subset of `allow_list`; the fleet layer decides.
    #[serde(default)]
    pub operators: Vec<Member>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("instance id must be a positive integer")]
    ZeroId,
    #[error("artifact file name is empty")]
    EmptyArtifact,
}

impl InstanceDescriptor {
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.id == 0 {
            return Err(DescriptorError::ZeroId);
        }
        if self.artifact.trim().is_empty() {
            return Err(DescriptorError::EmptyArtifact);
        }
        Ok(())
    }
}

/// The set of instances a daemon should bring up at boot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    #[serde(default)]
    pub instances: Vec<InstanceDescriptor>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use std::sync::LazyLock;

    use pretty_assertions::assert_eq;
    use serde_json::Value;

    use super::*;

    static DESCRIPTOR: LazyLock<InstanceDescriptor> = LazyLock::new(|| InstanceDescriptor {
        id: 42,
        artifact: "server-1.8.9.jar".to_string(),
        properties: BTreeMap::from([
            ("gamemode".to_string(), "1".to_string()),
            ("motd".to_string(), "A warden server".to_string()),
        ]),
        allow_list: vec![Member {
            uuid: Uuid::from_str("069a79f4-44e9-4726-a5be-fca90e38aaf5").unwrap(),
            name: "alice".to_string(),
        }],
        operators: vec![Member {
            uuid: Uuid::from_str("853c80ef-3c37-49fd-aa49-938b674adae6").unwrap(),
            name: "bob".to_string(),
        }],
    });

    const DESCRIPTOR_TEXT: &str = r#"{
        "id": 42,
        "artifact": "server-1.8.9.jar",
        "properties": {
            "gamemode": "1",
            "motd": "A warden server"
        },
        "allow_list": [
            { "uuid": "069a79f4-44e9-4726-a5be-fca90e38aaf5", "name": "alice" }
        ],
        "operators": [
            { "uuid": "853c80ef-3c37-49fd-aa49-938b674adae6", "name": "bob" }
        ]
    }"#;

    #[test]
    fn descriptor_deserialize() {
        let deserialized: InstanceDescriptor = serde_json::from_str(DESCRIPTOR_TEXT).unwrap();
        assert_eq!(*DESCRIPTOR, deserialized);
    }

    #[test]
    fn descriptor_serialize() {
        let serialized = serde_json::to_string_pretty(&*DESCRIPTOR).unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(serialized.as_str()).unwrap(),
            serde_json::from_str::<Value>(DESCRIPTOR_TEXT).unwrap()
        );
    }

    #[test]
    fn descriptor_lists_default_to_empty() {
        let descriptor: InstanceDescriptor =
            serde_json::from_str(r#"{ "id": 1, "artifact": "server.jar" }"#).unwrap();
        assert!(descriptor.properties.is_empty());
        assert!(descriptor.allow_list.is_empty());
        assert!(descriptor.operators.is_empty());
    }

    #[test]
    fn validate_rejects_zero_id() {
        let mut descriptor = DESCRIPTOR.clone();
        descriptor.id = 0;
        assert_eq!(descriptor.validate(), Err(DescriptorError::ZeroId));
    }

    #[test]
    fn validate_rejects_blank_artifact() {
        let mut descriptor = DESCRIPTOR.clone();
        descriptor.artifact = "  ".to_string();
        assert_eq!(descriptor.validate(), Err(DescriptorError::EmptyArtifact));
    }

    #[test]
    fn validate_accepts_operator_not_on_allow_list() {
        // operators are deliberately not constrained to allow-listed members
        assert_eq!(DESCRIPTOR.validate(), Ok(()));
    }
}
