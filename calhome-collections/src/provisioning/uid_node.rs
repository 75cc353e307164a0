use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use calhome_dav::acltypes::Acl;
use calhome_directory::{ArcDirectory, ArcRecord};

use super::acl::provisioning_acl;
use super::home::CalendarHome;
use super::*;
use crate::storage::ArcProvisioner;

/// Holds the home of one guid once it has been built.
/// Locked for the whole construction so a guid is materialized at most once.
type HomeSlot = Arc<Mutex<Option<Arc<CalendarHome>>>>;

/// Provisions calendar homes addressed by directory guid, the canonical location of a home
pub struct UidProvisioningNode {
    me: Weak<UidProvisioningNode>,
    directory: ArcDirectory,
    url: String,
    config: ConfigHandle,
    provisioner: ArcProvisioner,
    homes: Mutex<HashMap<String, HomeSlot>>,
}

impl UidProvisioningNode {
    pub(crate) fn new(
        directory: ArcDirectory,
        url: String,
        config: ConfigHandle,
        provisioner: ArcProvisioner,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            directory,
            url,
            config,
            provisioner,
            homes: Mutex::new(HashMap::new()),
        })
    }

    /// The home of this record, built on first access and then kept for the life of the tree
    pub fn home_for_record(&self, record: ArcRecord) -> Result<Arc<CalendarHome>> {
        let slot = {
            let mut homes = self.homes.lock().unwrap_or_else(|e| e.into_inner());
            homes.entry(record.guid.clone()).or_default().clone()
        };

        let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(home) = slot.as_ref() {
            tracing::trace!(guid=%record.guid, "calendar home cache hit");
            return Ok(home.clone());
        }

        let home = CalendarHome::new(
            &self.url,
            record,
            self.directory.as_ref(),
            self.config.clone(),
            self.provisioner.clone(),
        )?;
        tracing::debug!(guid=%home.record().guid, url=%home.url(), "calendar home materialized");
        *slot = Some(home.clone());

        Ok(home)
    }

    /// How many homes have been materialized so far
    pub fn materialized(&self) -> usize {
        let slots: Vec<HomeSlot> = self
            .homes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        slots
            .iter()
            .filter(|slot| slot.lock().unwrap_or_else(|e| e.into_inner()).is_some())
            .count()
    }
}

impl ProvisioningNode for UidProvisioningNode {
    fn url(&self) -> &str {
        &self.url
    }

    fn resolve_child(&self, guid: &str) -> Result<Node> {
        if guid.is_empty() {
            return upgrade(&self.me, &self.url).map(Node::Uids);
        }
        let record = self
            .directory
            .record_with_guid(guid)
            .ok_or_else(|| not_found(&self.url, guid))?;
        self.home_for_record(record).map(Node::Home)
    }

    fn list_children(&self) -> Result<Vec<String>> {
        // Enumerating guids would leak the whole directory
        Err(ProvisioningError::Forbidden(format!("listing {}", self.url)))
    }

    fn access_control_list(&self) -> Acl {
        provisioning_acl(&self.config.borrow())
    }
}
