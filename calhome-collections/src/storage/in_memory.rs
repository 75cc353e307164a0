use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use calhome_dav::caltypes::{DeadProperty, PropertyName};
use calhome_directory::record::DirectoryRecord;

use crate::provisioning::join_url;
use crate::storage::*;

/// Everything lives in this process memory and is lost on exit.
/// Also carries a few knobs to simulate a misbehaving backend.
#[derive(Default)]
pub struct MemDb {
    collections: Mutex<HashMap<String, Arc<MemCollection>>>,
    role_overrides: Mutex<HashMap<String, Role>>,
    faults: Arc<MemFaults>,
}

#[derive(Default)]
struct MemFaults {
    fail_calendar_creation: AtomicBool,
    fail_calendar_lookup: AtomicBool,
}

impl MemDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every following calendar creation fail (or succeed again)
    pub fn fail_calendar_creation(&self, fail: bool) {
        self.faults
            .fail_calendar_creation
            .store(fail, Ordering::SeqCst);
    }

    /// Make every following calendar existence check fail (or succeed again)
    pub fn fail_calendar_lookup(&self, fail: bool) {
        self.faults
            .fail_calendar_lookup
            .store(fail, Ordering::SeqCst);
    }

    /// Hand out children named `name` with the given role instead of the usual one
    pub fn override_role(&self, name: &str, role: Role) {
        self.role_overrides
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), role);
    }

    /// The collection stored at `url`, if it was ever provisioned
    pub fn collection(&self, url: &str) -> Option<Arc<MemCollection>> {
        self.collections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.collections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The collection at `url` seen with `role`. The backing state of a URL is
    /// kept across calls, the role is the one asked for now.
    fn get_or_insert(&self, url: String, role: Role) -> Arc<MemCollection> {
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = collections.get(&url) {
            if existing.role == role {
                return existing.clone();
            }
            tracing::trace!(url=%url, old=%existing.role, new=%role, "in-memory collection role changed");
            let moved = Arc::new(MemCollection {
                url: url.clone(),
                role,
                state: existing.state.clone(),
                writes: existing.writes.clone(),
                faults: self.faults.clone(),
            });
            collections.insert(url, moved.clone());
            return moved;
        }

        tracing::trace!(url=%url, role=%role, "new in-memory collection");
        let created = Arc::new(MemCollection {
            url: url.clone(),
            role,
            state: Arc::new(Mutex::new(MemState::default())),
            writes: Arc::new(AtomicUsize::new(0)),
            faults: self.faults.clone(),
        });
        collections.insert(url, created.clone());
        created
    }

    fn role_for_child(&self, name: &str) -> Role {
        if let Some(role) = self
            .role_overrides
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
        {
            return *role;
        }

        match name {
            "inbox" => Role::ScheduleInbox,
            "outbox" => Role::ScheduleOutbox,
            "dropbox" => Role::DropBoxHome,
            "freebusy" => Role::FreeBusyUrl,
            _ => Role::Calendar,
        }
    }
}

impl Provisioner for MemDb {
    fn provision_home(&self, _record: &DirectoryRecord, url: &str) -> Result<ArcCollection, StorageError> {
        Ok(self.get_or_insert(url.to_string(), Role::CalendarHome))
    }

    fn provision_child(&self, home_url: &str, name: &str) -> Result<ArcCollection, StorageError> {
        let role = self.role_for_child(name);
        Ok(self.get_or_insert(join_url(home_url, name), role))
    }
}

#[derive(Default)]
struct MemState {
    provisioned: bool,
    calendar: bool,
    props: BTreeMap<PropertyName, DeadProperty>,
}

pub struct MemCollection {
    url: String,
    role: Role,
    state: Arc<Mutex<MemState>>,
    writes: Arc<AtomicUsize>,
    faults: Arc<MemFaults>,
}

impl MemCollection {
    /// How many property writes hit this collection
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn is_calendar(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).calendar
    }

    pub fn property(&self, name: PropertyName) -> Option<DeadProperty> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .props
            .get(&name)
            .cloned()
    }
}

#[async_trait]
impl Collection for MemCollection {
    fn url(&self) -> &str {
        &self.url
    }

    fn role(&self) -> Role {
        self.role
    }

    async fn provision(&self) -> Result<(), StorageError> {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).provisioned = true;
        Ok(())
    }

    async fn exists(&self) -> Result<bool, StorageError> {
        if self.role == Role::Calendar && self.faults.fail_calendar_lookup.load(Ordering::SeqCst) {
            return Err(StorageError::Internal(format!("can't look up {}", self.url)));
        }
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(match self.role {
            Role::Calendar => state.calendar,
            _ => state.provisioned,
        })
    }

    async fn create_calendar_collection(&self) -> Result<(), StorageError> {
        // let concurrent tasks run, as a real backend would
        tokio::task::yield_now().await;

        if self.faults.fail_calendar_creation.load(Ordering::SeqCst) {
            return Err(StorageError::Internal(format!(
                "refusing to create {}",
                self.url
            )));
        }
        if self.role != Role::Calendar {
            return Err(StorageError::Internal(format!(
                "{} is a {}, not a calendar",
                self.url, self.role
            )));
        }

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.calendar {
            return Err(StorageError::AlreadyExists(self.url.clone()));
        }
        state.provisioned = true;
        state.calendar = true;
        Ok(())
    }

    async fn write_property(&self, prop: DeadProperty) -> Result<(), StorageError> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.provisioned {
            return Err(StorageError::NotFound);
        }
        state.props.insert(prop.name(), prop);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_property(&self, name: PropertyName) -> Result<Option<DeadProperty>, StorageError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.provisioned {
            return Ok(None);
        }
        Ok(state.props.get(&name).cloned())
    }
}
