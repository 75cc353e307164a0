#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::watch;

use calhome_collections::provisioning::HomeProvisioningRoot;
use calhome_collections::storage::in_memory::MemDb;
use calhome_directory::config::CalendarConfig;
use calhome_directory::record::{DirectoryRecord, RecordType};
use calhome_directory::static_provider::StaticDirectory;

pub const ALICE_GUID: &str = "abc-123";
pub const ALICE_PRINCIPAL: &str = "/principals/__uids__/abc-123/";

/// A tree over a directory holding alice, plus whatever `records` adds
pub struct Fixture {
    pub tree: Arc<HomeProvisioningRoot>,
    pub storage: Arc<MemDb>,
    pub directory: Arc<StaticDirectory>,
    pub config: watch::Sender<CalendarConfig>,
}

pub fn fixture(config: CalendarConfig, records: Vec<DirectoryRecord>) -> Fixture {
    let mut all = vec![DirectoryRecord::new(ALICE_GUID, "alice", RecordType::Users)];
    all.extend(records);

    let directory = Arc::new(StaticDirectory::from_records("/principals/", all).unwrap());
    let storage = MemDb::new();
    let (tx, rx) = watch::channel(config);
    let tree =
        HomeProvisioningRoot::new(directory.clone(), "/calendars/", rx, storage.clone()).unwrap();

    Fixture {
        tree,
        storage,
        directory,
        config: tx,
    }
}

pub fn listing() -> CalendarConfig {
    CalendarConfig {
        enable_principal_listings: true,
        ..CalendarConfig::default()
    }
}
