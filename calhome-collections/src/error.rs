use thiserror::Error;

use crate::storage::StorageError;

pub type Result<T> = std::result::Result<T, ProvisioningError>;

#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Unknown short name, unknown guid or unresolved segment: a routing miss
    #[error("{0} not found")]
    NotFound(String),
    /// The operation exists but is denied here, eg. listing a non-listable collection
    #[error("{0}: forbidden")]
    Forbidden(String),
    /// The tree can't be built or used as configured; don't serve requests with it
    #[error("configuration fault: {0}")]
    Configuration(String),
    /// Creating the default calendar failed, nothing has been wired on the inbox
    #[error("provisioning of {url} aborted: {source}")]
    SequenceAbort {
        url: String,
        #[source]
        source: StorageError,
    },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("invalid value for property {name}: {value}")]
    InvalidProperty { name: String, value: String },
}

impl ProvisioningError {
    /// Fatal errors are raised when the tree is wrongly assembled, not by a bad request
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }
}
