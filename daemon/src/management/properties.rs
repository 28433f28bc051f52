use std::collections::BTreeMap;

use chrono::Local;

const HEADER_GENERATED: &str = "# DO NOT MODIFY. This file is auto generated by warden.";
const HEADER_OVERWRITTEN: &str = "# Any changes will be overwritten on next launch.";

/// The managed binary expects CRLF regardless of host platform.
const LINE_ENDING: &str = "\r\n";

/// In-memory view of a `server.properties` document.
///
/// The format is opaque `key=value` text; neither keys nor values are
/// validated here. Parsing tolerates noise, compiling never fails.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServerProperties {
    props: BTreeMap<String, String>,
}

impl ServerProperties {
    /// Parses raw properties text. Lines without a `=` are skipped, the
    /// first `=` splits key from value (values may contain further `=`),
    /// both sides are trimmed, and the last occurrence of a duplicated
    /// key wins.
    pub fn parse(raw: &str) -> Self {
        let mut props = BTreeMap::new();
        for line in raw.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            props.insert(key.trim().to_string(), value.trim().to_string());
        }
        Self { props }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.props.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.props.get(key).map(String::as_str)
    }

    /// Layers every entry of `overrides` onto the document. Keys absent
    /// from `overrides` keep their current value.
    pub fn apply(&mut self, overrides: &BTreeMap<String, String>) {
        for (key, value) in overrides {
            self.set(key.clone(), value.clone());
        }
    }

    /// Serializes the document: a three-line provenance header stamped
    /// with the wall-clock compile time, then one `key=value` line per
    /// entry in key order, all joined with CRLF.
    pub fn compile(&self) -> String {
        let mut lines = vec![
            HEADER_GENERATED.to_string(),
            HEADER_OVERWRITTEN.to_string(),
            format!("# Last modified: {}", Local::now().to_rfc2822()),
        ];
        lines.extend(self.props.iter().map(|(key, value)| format!("{key}={value}")));
        lines.join(LINE_ENDING)
    }
}
