use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Users,
    Groups,
    Resources,
    Locations,
}

impl RecordType {
    pub const ALL: [RecordType; 4] = [
        RecordType::Users,
        RecordType::Groups,
        RecordType::Resources,
        RecordType::Locations,
    ];

    /// The path segment under which records of this type are exposed
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Groups => "groups",
            Self::Resources => "resources",
            Self::Locations => "locations",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users" => Ok(Self::Users),
            "groups" => Ok(Self::Groups),
            "resources" => Ok(Self::Resources),
            "locations" => Ok(Self::Locations),
            _ => bail!("unknown record type {}", s),
        }
    }
}

/// A user, group or bookable resource known to the directory.
/// `guid` is the identity; `short_name` is only an alias, unique within its type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub guid: String,
    pub short_name: String,
    pub record_type: RecordType,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled_for_calendaring: bool,
}

impl DirectoryRecord {
    pub fn new(guid: &str, short_name: &str, record_type: RecordType) -> Self {
        Self {
            guid: guid.to_string(),
            short_name: short_name.to_string(),
            record_type,
            full_name: None,
            enabled_for_calendaring: true,
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_type_segments() {
        for t in RecordType::ALL {
            assert_eq!(t.as_str().parse::<RecordType>().unwrap(), t);
        }
        assert!("__uids__".parse::<RecordType>().is_err());
    }

    #[test]
    fn calendaring_enabled_by_default() {
        let rec: DirectoryRecord = toml::from_str(
            r#"
guid = "abc-123"
short_name = "alice"
record_type = "users"
"#,
        )
        .unwrap();
        assert!(rec.enabled_for_calendaring);
        assert_eq!(rec.record_type, RecordType::Users);
        assert_eq!(rec, DirectoryRecord::new("abc-123", "alice", RecordType::Users));
    }
}
