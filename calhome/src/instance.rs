use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;

use calhome_collections::provisioning::HomeProvisioningRoot;
use calhome_collections::storage::in_memory::MemDb;
use calhome_directory::config::*;
use calhome_directory::record::{DirectoryRecord, RecordType};
use calhome_directory::static_provider::StaticDirectory;
use calhome_directory::ArcDirectory;

/// Everything needed to serve a calendar home tree
pub struct Instance {
    config: watch::Sender<CalendarConfig>,
    directory: Arc<StaticDirectory>,
    storage: Arc<MemDb>,
    tree: Arc<HomeProvisioningRoot>,
}

impl Instance {
    pub fn from_config(config: Config) -> Result<Self> {
        let directory = match config.directory {
            Some(DirectoryConfig::Static(conf)) => {
                StaticDirectory::new(conf).context("static directory could not be loaded")?
            }
            None => bail!("configuration fault: a [directory] section is required"),
        };
        let directory = Arc::new(directory);
        let storage = MemDb::new();

        let base_url = config.calendars.base_url.clone();
        let (tx, rx) = watch::channel(config.calendars);
        let tree = HomeProvisioningRoot::new(
            directory.clone() as ArcDirectory,
            &base_url,
            rx,
            storage.clone(),
        )
        .context("calendar home tree could not be built")?;

        Ok(Self {
            config: tx,
            directory,
            storage,
            tree,
        })
    }

    pub fn tree(&self) -> &Arc<HomeProvisioningRoot> {
        &self.tree
    }

    pub fn directory(&self) -> &Arc<StaticDirectory> {
        &self.directory
    }

    pub fn storage(&self) -> &Arc<MemDb> {
        &self.storage
    }

    /// Apply a new configuration. The next request sees it;
    /// homes already built keep their children.
    pub fn reload(&self, config: CalendarConfig) -> Result<()> {
        if config.base_url != self.config.borrow().base_url {
            bail!("base_url can't be changed without a restart");
        }
        self.config.send_replace(config);
        tracing::info!("calendar configuration reloaded");
        Ok(())
    }

    /// Read the directory records again
    pub fn reload_directory(&self) -> Result<()> {
        self.directory.reload()
    }
}

/// A small directory with one record of each type, NOT INTENDED FOR PRODUCTION
pub fn dev_config() -> Config {
    let mut room = DirectoryRecord::new("f0e1d2c3-0004", "room1", RecordType::Locations);
    room.full_name = Some("Meeting Room 1".into());
    let mut bob = DirectoryRecord::new("f0e1d2c3-0005", "bob", RecordType::Users);
    bob.enabled_for_calendaring = false;

    Config {
        directory: Some(DirectoryConfig::Static(StaticDirectoryConfig {
            principals_url: "/principals/".into(),
            record_types: None,
            records: vec![
                DirectoryRecord::new("f0e1d2c3-0001", "alice", RecordType::Users),
                bob,
                DirectoryRecord::new("f0e1d2c3-0002", "staff", RecordType::Groups),
                DirectoryRecord::new("f0e1d2c3-0003", "projector", RecordType::Resources),
                room,
            ],
            records_file: None,
        })),
        calendars: CalendarConfig {
            enable_principal_listings: true,
            enable_drop_box: true,
            free_busy_url: FreeBusyUrlConfig { enabled: true },
            enable_proxy_principals: true,
            admin_principals: vec!["/principals/__uids__/admin/".into()],
            scheduling: SchedulingConfig {
                caldav: CalDavSchedulingConfig {
                    default_calendar_provisioned: true,
                },
            },
            ..CalendarConfig::default()
        },
    }
}
