use std::fmt;

/// The closed set of console commands the daemon issues to a managed
/// server. Variants carry their payload as data and are rendered to wire
/// text only at the stdin boundary.
///
/// Delivery is at-least-once; every command here is idempotent on the
/// server side, so duplicates are harmless.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerCommand {
    /// Graceful shutdown request.
    Stop,
    AllowlistAdd(String),
    AllowlistRemove(String),
    /// Grant operator status.
    Grant(String),
    /// Revoke operator status.
    Revoke(String),
    /// Free-form passthrough from the fleet layer.
    Raw(String),
}

impl fmt::Display for ServerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerCommand::Stop => f.write_str("stop"),
            ServerCommand::AllowlistAdd(name) => write!(f, "whitelist add {name}"),
            ServerCommand::AllowlistRemove(name) => write!(f, "whitelist remove {name}"),
            ServerCommand::Grant(name) => write!(f, "op {name}"),
            ServerCommand::Revoke(name) => write!(f, "deop {name}"),
            ServerCommand::Raw(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_render_to_console_syntax() {
        assert_eq!(ServerCommand::Stop.to_string(), "stop");
        assert_eq!(
            ServerCommand::AllowlistAdd("alice".to_string()).to_string(),
            "whitelist add alice"
        );
        assert_eq!(
            ServerCommand::AllowlistRemove("alice".to_string()).to_string(),
            "whitelist remove alice"
        );
        assert_eq!(ServerCommand::Grant("bob".to_string()).to_string(), "op bob");
        assert_eq!(ServerCommand::Revoke("bob".to_string()).to_string(), "deop bob");
        assert_eq!(
            ServerCommand::Raw("say hello".to_string()).to_string(),
            "say hello"
        );
    }
}
