pub mod error;
pub mod provisioning;
pub mod storage;

pub use error::{ProvisioningError, Result};
