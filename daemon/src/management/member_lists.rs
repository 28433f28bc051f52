use serde::{Deserialize, Serialize};
use uuid::Uuid;

use warden_protocol::management::instance::Member;

use super::command::ServerCommand;

/// Permission level stamped into every `ops.json` record at write time.
/// Descriptors never carry it.
const OP_LEVEL: u8 = 4;

/// The two access-control lists a managed server reads at its own
/// startup. Each kind binds its on-disk file and its add/remove console
/// commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    AllowList,
    Operators,
}

impl ListKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ListKind::AllowList => "whitelist.json",
            ListKind::Operators => "ops.json",
        }
    }

    pub fn add_command(self, name: &str) -> ServerCommand {
        match self {
            ListKind::AllowList => ServerCommand::AllowlistAdd(name.to_string()),
            ListKind::Operators => ServerCommand::Grant(name.to_string()),
        }
    }

    pub fn remove_command(self, name: &str) -> ServerCommand {
        match self {
            ListKind::AllowList => ServerCommand::AllowlistRemove(name.to_string()),
            ListKind::Operators => ServerCommand::Revoke(name.to_string()),
        }
    }

    /// Serializes the desired members as this kind's on-disk records.
    pub fn serialize(self, members: &[Member]) -> serde_json::Result<String> {
        match self {
            ListKind::AllowList => {
                let records: Vec<AllowlistRecord> =
                    members.iter().map(AllowlistRecord::from).collect();
                serde_json::to_string(&records)
            }
            ListKind::Operators => {
                let records: Vec<OperatorRecord> =
                    members.iter().map(OperatorRecord::from).collect();
                serde_json::to_string(&records)
            }
        }
    }
}

/// One `whitelist.json` record.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllowlistRecord {
    pub uuid: Uuid,
    pub name: String,
}

impl From<&Member> for AllowlistRecord {
    fn from(member: &Member) -> Self {
        Self {
            uuid: member.uuid,
            name: member.name.clone(),
        }
    }
}

/// One `ops.json` record.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperatorRecord {
    pub uuid: Uuid,
    pub name: String,
    pub level: u8,
}

impl From<&Member> for OperatorRecord {
    fn from(member: &Member) -> Self {
        Self {
            uuid: member.uuid,
            name: member.name.clone(),
            level: OP_LEVEL,
        }
    }
}

/// Minimal view of a persisted record: only the name takes part in
/// reconciliation, whatever else the server wrote rides along ignored.
#[derive(Debug, Deserialize)]
pub struct PersistedEntry {
    pub name: String,
}

/// Set difference by name. `to_remove` keeps persisted order, `to_add`
/// keeps desired order; the two are disjoint by construction.
pub fn diff_by_name(persisted: &[String], desired: &[String]) -> (Vec<String>, Vec<String>) {
    let to_remove = persisted
        .iter()
        .filter(|name| !desired.contains(name))
        .cloned()
        .collect();
    let to_add = desired
        .iter()
        .filter(|name| !persisted.contains(name))
        .cloned()
        .collect();
    (to_remove, to_add)
}

/// Commands that bring a live server's list in line with `desired`:
/// removals first in persisted order, then additions in desired order.
pub fn plan_live_commands(
    kind: ListKind,
    persisted: &[String],
    desired: &[String],
) -> Vec<ServerCommand> {
    let (to_remove, to_add) = diff_by_name(persisted, desired);
    to_remove
        .iter()
        .map(|name| kind.remove_command(name))
        .chain(to_add.iter().map(|name| kind.add_command(name)))
        .collect()
}
