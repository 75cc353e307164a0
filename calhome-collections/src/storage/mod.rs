/*
 * The storage side of the tree is supplied by the deployment: it knows how
 * to build a collection for a given role and where its dead properties live.
 * The provisioning engine only relies on the two traits below, and checks
 * the declared role of everything it gets back.
 */

pub mod in_memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use calhome_dav::caltypes::{DeadProperty, PropertyName};
use calhome_directory::record::DirectoryRecord;

/// What a collection is for. Checked by the tree after each provisioning call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    CalendarHome,
    ScheduleInbox,
    ScheduleOutbox,
    DropBoxHome,
    FreeBusyUrl,
    Calendar,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CalendarHome => "calendar home",
            Self::ScheduleInbox => "schedule inbox",
            Self::ScheduleOutbox => "schedule outbox",
            Self::DropBoxHome => "drop box home",
            Self::FreeBusyUrl => "free-busy URL",
            Self::Calendar => "calendar",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("not found")]
    NotFound,
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// A storage-backed collection
#[async_trait]
pub trait Collection: Send + Sync {
    fn url(&self) -> &str;
    fn role(&self) -> Role;

    /// Ensure the backing collection exists. Calling it again is a no-op.
    async fn provision(&self) -> Result<(), StorageError>;
    /// Whether the backing collection exists (for a calendar: was created as a calendar)
    async fn exists(&self) -> Result<bool, StorageError>;
    /// Create this collection as a genuine calendar collection
    async fn create_calendar_collection(&self) -> Result<(), StorageError>;

    async fn write_property(&self, prop: DeadProperty) -> Result<(), StorageError>;
    async fn read_property(&self, name: PropertyName) -> Result<Option<DeadProperty>, StorageError>;
    async fn has_property(&self, name: PropertyName) -> Result<bool, StorageError> {
        Ok(self.read_property(name).await?.is_some())
    }
}
pub type ArcCollection = Arc<dyn Collection>;

/// Builds the collections the tree asks for.
/// Must hand back the same backing state when asked twice for the same URL.
pub trait Provisioner: Send + Sync {
    /// The collection backing a calendar home
    fn provision_home(&self, record: &DirectoryRecord, url: &str) -> Result<ArcCollection, StorageError>;
    /// The child `name` of the home located at `home_url`
    fn provision_child(&self, home_url: &str, name: &str) -> Result<ArcCollection, StorageError>;
}
pub type ArcProvisioner = Arc<dyn Provisioner>;
