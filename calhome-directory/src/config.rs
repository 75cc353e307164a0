use std::io::Read;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use calhome_dav::acltypes::{Ace, Acl, Principal, Privilege};
use calhome_dav::types::Href;

use crate::record::{DirectoryRecord, RecordType};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub directory: Option<DirectoryConfig>,
    #[serde(default)]
    pub calendars: CalendarConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "driver")]
pub enum DirectoryConfig {
    Static(StaticDirectoryConfig),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StaticDirectoryConfig {
    /// Collection holding the principal resources, eg. `/principals/`
    #[serde(default = "default_principals_url")]
    pub principals_url: String,
    /// Restrict the record types exposed, defaults to all of them
    pub record_types: Option<Vec<RecordType>>,
    #[serde(default)]
    pub records: Vec<DirectoryRecord>,
    /// A TOML file holding a `RecordList`, merged after the inline records
    pub records_file: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RecordList {
    #[serde(default)]
    pub records: Vec<DirectoryRecord>,
}

/// Everything that shapes the calendar home tree and its ACLs
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CalendarConfig {
    /// Canonical URL of the tree root, must end with a '/'
    pub base_url: String,
    pub enable_principal_listings: bool,
    pub enable_drop_box: bool,
    pub free_busy_url: FreeBusyUrlConfig,
    pub enable_proxy_principals: bool,
    /// Byte limit of a calendar home; absent or 0 means unlimited
    pub user_quota: Option<u64>,
    /// Principals granted read access to every home
    pub read_principals: Vec<String>,
    /// Principals granted every privilege on every home
    pub admin_principals: Vec<String>,
    pub scheduling: SchedulingConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct FreeBusyUrlConfig {
    pub enabled: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SchedulingConfig {
    pub caldav: CalDavSchedulingConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct CalDavSchedulingConfig {
    /// Point the inbox's default scheduling calendar at the provisioned calendar
    pub default_calendar_provisioned: bool,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            enable_principal_listings: false,
            enable_drop_box: false,
            free_busy_url: FreeBusyUrlConfig::default(),
            enable_proxy_principals: false,
            user_quota: Some(100 * 1024 * 1024),
            read_principals: vec![],
            admin_principals: vec![],
            scheduling: SchedulingConfig::default(),
        }
    }
}

impl CalendarConfig {
    /// Protected, inheritable read access for `read_principals`
    pub fn read_aces(&self) -> Vec<Ace> {
        self.read_principals
            .iter()
            .map(|p| {
                Ace::grant(
                    Principal::Href(Href(p.clone())),
                    [Privilege::Read, Privilege::ReadCurrentUserPrivilegeSet],
                )
                .protected()
                .inheritable()
            })
            .collect()
    }

    /// Protected, inheritable full access for `admin_principals`
    pub fn admin_aces(&self) -> Vec<Ace> {
        self.admin_principals
            .iter()
            .map(|p| {
                Ace::grant(Principal::Href(Href(p.clone())), [Privilege::All])
                    .protected()
                    .inheritable()
            })
            .collect()
    }

    /// Fixed ACL of the dispatching collections (root, record types, uids)
    pub fn provisioning_resource_acl(&self) -> Acl {
        let mut acl = Acl(vec![Ace::grant(
            Principal::Authenticated,
            [Privilege::Read, Privilege::ReadCurrentUserPrivilegeSet],
        )
        .protected()]);
        acl.extend(self.admin_aces());
        acl
    }

    /// `None` means unlimited
    pub fn default_quota(&self) -> Option<u64> {
        self.user_quota.filter(|q| *q > 0)
    }
}

pub fn read_config<T: serde::de::DeserializeOwned>(config_file: PathBuf) -> Result<T> {
    let mut file = std::fs::OpenOptions::new()
        .read(true)
        .open(config_file.as_path())?;

    let mut config = String::new();
    file.read_to_string(&mut config)?;

    Ok(toml::from_str(&config)?)
}

fn default_principals_url() -> String {
    "/principals/".into()
}

fn default_base_url() -> String {
    "/calendars/".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_config() {
        let src = r#"
[directory]
driver = "Static"
principals_url = "/principals/"
record_types = ["users", "groups"]

[[directory.records]]
guid = "abc-123"
short_name = "alice"
record_type = "users"

[calendars]
base_url = "/calendars/"
enable_principal_listings = true
enable_proxy_principals = true
user_quota = 0
admin_principals = ["/principals/__uids__/admin/"]

[calendars.free_busy_url]
enabled = true

[calendars.scheduling.caldav]
default_calendar_provisioned = true
"#;
        let config: Config = toml::from_str(src).unwrap();
        let DirectoryConfig::Static(dir) = config.directory.unwrap();
        assert_eq!(dir.records.len(), 1);
        assert_eq!(dir.record_types, Some(vec![RecordType::Users, RecordType::Groups]));

        let cal = config.calendars;
        assert!(cal.enable_principal_listings);
        assert!(!cal.enable_drop_box);
        assert!(cal.free_busy_url.enabled);
        assert!(cal.scheduling.caldav.default_calendar_provisioned);
        assert_eq!(cal.default_quota(), None);
        assert_eq!(cal.admin_aces().len(), 1);
    }

    #[test]
    fn empty_calendar_section_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.directory.is_none());
        assert_eq!(config.calendars, CalendarConfig::default());
        assert_eq!(config.calendars.default_quota(), Some(100 * 1024 * 1024));
    }

    #[test]
    fn provisioning_acl_starts_with_authenticated_read() {
        let cal = CalendarConfig {
            admin_principals: vec!["/principals/__uids__/admin/".into()],
            ..CalendarConfig::default()
        };
        let acl = cal.provisioning_resource_acl();
        assert_eq!(acl.len(), 2);
        assert_eq!(acl.0[0].principal, Principal::Authenticated);
        assert!(acl.0[0].protected && !acl.0[0].inheritable);
        assert!(acl.0[1].grants(Privilege::All));
    }
}
