use std::sync::{Arc, Weak};

use calhome_dav::acltypes::Acl;
use calhome_directory::record::RecordType;
use calhome_directory::ArcDirectory;

use super::acl::provisioning_acl;
use super::root::HomeProvisioningRoot;
use super::*;

/// Provisions the calendar homes of one record type, addressed by short name
pub struct TypeProvisioningNode {
    me: Weak<TypeProvisioningNode>,
    root: Weak<HomeProvisioningRoot>,
    directory: ArcDirectory,
    record_type: RecordType,
    url: String,
    config: ConfigHandle,
}

impl TypeProvisioningNode {
    pub(crate) fn new(
        root: Weak<HomeProvisioningRoot>,
        directory: ArcDirectory,
        record_type: RecordType,
        url: String,
        config: ConfigHandle,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            root,
            directory,
            record_type,
            url,
            config,
        })
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    /// Short names of the calendaring-enabled records of this type,
    /// only when principal listings are enabled
    pub fn short_names(&self) -> Result<ShortNames> {
        if !self.config.borrow().enable_principal_listings {
            return Err(ProvisioningError::Forbidden(format!(
                "listing {}",
                self.url
            )));
        }
        Ok(ShortNames {
            directory: self.directory.clone(),
            record_type: self.record_type,
        })
    }
}

impl ProvisioningNode for TypeProvisioningNode {
    fn url(&self) -> &str {
        &self.url
    }

    fn resolve_child(&self, short_name: &str) -> Result<Node> {
        if short_name.is_empty() {
            return upgrade(&self.me, &self.url).map(Node::RecordType);
        }
        let record = self
            .directory
            .record_with_short_name(self.record_type, short_name)
            .ok_or_else(|| not_found(&self.url, short_name))?;

        let root = self.root.upgrade().ok_or_else(|| {
            ProvisioningError::Configuration(format!("{} outlived its tree", self.url))
        })?;
        root.home_for_record(record).map(Node::Home)
    }

    fn list_children(&self) -> Result<Vec<String>> {
        Ok(self.short_names()?.iter().collect())
    }

    fn access_control_list(&self) -> Acl {
        provisioning_acl(&self.config.borrow())
    }
}

/// A finite listing that reads the directory lazily.
/// Each call to `iter` starts over from the current directory content.
pub struct ShortNames {
    directory: ArcDirectory,
    record_type: RecordType,
}

impl ShortNames {
    pub fn iter(&self) -> impl Iterator<Item = String> {
        self.directory
            .list_records(self.record_type)
            .filter(|record| record.enabled_for_calendaring)
            .map(|record| record.short_name.clone())
    }
}
