use std::sync::{Arc, Weak};

use calhome_dav::acltypes::Acl;
use calhome_directory::record::DirectoryRecord;
use calhome_directory::{ArcDirectory, ArcRecord, CalendarHomes};

use super::acl::provisioning_acl;
use super::home::CalendarHome;
use super::type_node::TypeProvisioningNode;
use super::uid_node::UidProvisioningNode;
use super::*;
use crate::storage::ArcProvisioner;

/// Root of the calendar home namespace.
/// Has one child per directory record type plus the `__uids__` collection.
pub struct HomeProvisioningRoot {
    me: Weak<HomeProvisioningRoot>,
    url: String,
    directory: ArcDirectory,
    config: ConfigHandle,
    record_types: Vec<Arc<TypeProvisioningNode>>,
    uids: Arc<UidProvisioningNode>,
}

impl HomeProvisioningRoot {
    /// Build the tree skeleton. `url` is the canonical URL of the root and must end with a '/'.
    /// Registers a weak handle to the tree on the directory.
    pub fn new(
        directory: ArcDirectory,
        url: &str,
        config: ConfigHandle,
        provisioner: ArcProvisioner,
    ) -> Result<Arc<Self>> {
        if !url.ends_with('/') {
            return Err(ProvisioningError::Configuration(format!(
                "collection URL must end in '/': {}",
                url
            )));
        }

        let types = directory.record_types();
        tracing::info!(url=%url, record_types=?types, "building calendar home tree");

        let root = Arc::new_cyclic(|me: &Weak<Self>| {
            let record_types = types
                .iter()
                .map(|t| {
                    TypeProvisioningNode::new(
                        me.clone(),
                        directory.clone(),
                        *t,
                        join_url(url, t.as_str()),
                        config.clone(),
                    )
                })
                .collect();
            let uids = UidProvisioningNode::new(
                directory.clone(),
                join_url(url, UIDS_RESOURCE_NAME),
                config.clone(),
                provisioner,
            );

            Self {
                me: me.clone(),
                url: url.to_string(),
                directory: directory.clone(),
                config,
                record_types,
                uids,
            }
        });

        let homes: Weak<dyn CalendarHomes> = Arc::downgrade(&root) as Weak<dyn CalendarHomes>;
        root.directory.set_calendar_homes(homes);

        Ok(root)
    }

    pub fn directory(&self) -> &ArcDirectory {
        &self.directory
    }

    pub fn record_type_node(&self, name: &str) -> Option<&Arc<TypeProvisioningNode>> {
        self.record_types
            .iter()
            .find(|n| n.record_type().as_str() == name)
    }

    pub fn uids(&self) -> &Arc<UidProvisioningNode> {
        &self.uids
    }

    /// The calendar home of a record, always reached through `__uids__`
    pub fn home_for_record(&self, record: ArcRecord) -> Result<Arc<CalendarHome>> {
        self.uids.home_for_record(record)
    }

    pub fn principal_for_record(&self, record: &DirectoryRecord) -> String {
        self.directory.principal_url(record)
    }

    /// Locate the node at `path`, an absolute path below this root
    pub fn locate(self: &Arc<Self>, path: &str) -> Result<Node> {
        let base = self.url.trim_end_matches('/');
        let relative = match path.strip_prefix(base) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
            _ => return Err(ProvisioningError::NotFound(path.to_string())),
        };
        Node::Root(self.clone()).walk(relative)
    }
}

impl ProvisioningNode for HomeProvisioningRoot {
    fn url(&self) -> &str {
        &self.url
    }

    fn resolve_child(&self, name: &str) -> Result<Node> {
        if name.is_empty() {
            return upgrade(&self.me, &self.url).map(Node::Root);
        }
        if name == UIDS_RESOURCE_NAME {
            return Ok(Node::Uids(self.uids.clone()));
        }
        self.record_type_node(name)
            .map(|n| Node::RecordType(n.clone()))
            .ok_or_else(|| not_found(&self.url, name))
    }

    fn list_children(&self) -> Result<Vec<String>> {
        Ok(self
            .record_types
            .iter()
            .map(|n| n.record_type().as_str().to_string())
            .chain(std::iter::once(UIDS_RESOURCE_NAME.to_string()))
            .collect())
    }

    fn access_control_list(&self) -> Acl {
        provisioning_acl(&self.config.borrow())
    }
}

impl CalendarHomes for HomeProvisioningRoot {
    fn calendar_home_url(&self, record: &DirectoryRecord) -> Option<String> {
        let record = self.directory.record_with_guid(&record.guid)?;
        let guid = record.guid.clone();
        match self.home_for_record(record) {
            Ok(home) => Some(home.url().to_string()),
            Err(e) => {
                tracing::warn!(guid=%guid, err=%e, "no calendar home for record");
                None
            }
        }
    }
}
