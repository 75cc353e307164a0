pub mod config;
pub mod record;
pub mod static_provider;

// A directory is composed of 3 things:
// - The records it knows about (record)
// - A way to look them up (DirectoryService)
// - A weak way back to the calendar homes provisioned from it (CalendarHomes)
use std::sync::{Arc, Weak};

use crate::record::{DirectoryRecord, RecordType};

/// Records handed out by the directory are shared, never copied
pub type ArcRecord = Arc<DirectoryRecord>;

/// A lazy enumeration of records. Asking the directory again restarts it.
pub type RecordIter = Box<dyn Iterator<Item = ArcRecord> + Send>;

/// The contract the provisioning tree requires from an identity directory
pub trait DirectoryService: Send + Sync {
    /// Record types this directory knows, in a stable order
    fn record_types(&self) -> Vec<RecordType>;

    /// Every record of the given type
    fn list_records(&self, record_type: RecordType) -> RecordIter;

    fn record_with_short_name(&self, record_type: RecordType, short_name: &str) -> Option<ArcRecord>;

    fn record_with_guid(&self, guid: &str) -> Option<ArcRecord>;

    /// Canonical URL of the principal resource standing for this record
    fn principal_url(&self, record: &DirectoryRecord) -> String;

    /// Register the calendar home tree built on top of this directory.
    /// The directory only keeps a weak handle: the tree owns the directory, not the reverse.
    fn set_calendar_homes(&self, homes: Weak<dyn CalendarHomes>);

    /// The registered tree, if it is still alive
    fn calendar_homes(&self) -> Option<Arc<dyn CalendarHomes>>;

    /// Where the calendar home of this record lives, if a tree is registered
    fn calendar_home_url(&self, record: &DirectoryRecord) -> Option<String> {
        self.calendar_homes()
            .and_then(|homes| homes.calendar_home_url(record))
    }
}
pub type ArcDirectory = Arc<dyn DirectoryService>;

/// What a directory can ask the calendar home tree
pub trait CalendarHomes: Send + Sync {
    fn calendar_home_url(&self, record: &DirectoryRecord) -> Option<String>;
}
