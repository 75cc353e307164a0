use std::sync::{Arc, RwLock, Weak};

use calhome_dav::acltypes::Acl;
use calhome_dav::caltypes::{DeadProperty, PropertyName, Transparency};
use calhome_dav::types::Href;
use calhome_directory::{ArcRecord, DirectoryService};

use super::acl::home_acl;
use super::*;
use crate::storage::{ArcCollection, ArcProvisioner, Role, StorageError};

pub const INBOX: &str = "inbox";
pub const OUTBOX: &str = "outbox";
pub const DROPBOX: &str = "dropbox";
pub const FREEBUSY: &str = "freebusy";
pub const CALENDAR: &str = "calendar";

/// The calendar home of one directory record
pub struct CalendarHome {
    me: Weak<CalendarHome>,
    record: ArcRecord,
    url: String,
    principal_url: String,
    config: ConfigHandle,
    provisioner: ArcProvisioner,
    collection: ArcCollection,
    /// Decided once at construction, never changes afterwards
    children: Vec<(&'static str, ArcCollection)>,
    calendar: RwLock<Option<ArcCollection>>,
    provisioning: tokio::sync::Mutex<()>,
}

impl CalendarHome {
    /// Build the home of `record` below `parent_url`, along with its required children
    pub(crate) fn new(
        parent_url: &str,
        record: ArcRecord,
        directory: &dyn DirectoryService,
        config: ConfigHandle,
        provisioner: ArcProvisioner,
    ) -> Result<Arc<Self>> {
        let url = join_url(parent_url, &record.guid);
        let principal_url = directory.principal_url(&record);

        let collection = provisioner.provision_home(&record, &url)?;
        expect_role(&collection, Role::CalendarHome)?;

        let mut required = vec![(INBOX, Role::ScheduleInbox), (OUTBOX, Role::ScheduleOutbox)];
        {
            let config = config.borrow();
            if config.enable_drop_box {
                required.push((DROPBOX, Role::DropBoxHome));
            }
            if config.free_busy_url.enabled {
                required.push((FREEBUSY, Role::FreeBusyUrl));
            }
        }

        let mut children = Vec::with_capacity(required.len());
        for (name, role) in required {
            let child = provisioner.provision_child(&url, name)?;
            expect_role(&child, role)?;
            children.push((name, child));
        }

        Ok(Arc::new_cyclic(|me| Self {
            me: me.clone(),
            record,
            url,
            principal_url,
            config,
            provisioner,
            collection,
            children,
            calendar: RwLock::new(None),
            provisioning: tokio::sync::Mutex::new(()),
        }))
    }

    pub fn record(&self) -> &ArcRecord {
        &self.record
    }

    /// URL of the principal owning this home
    pub fn owner(&self) -> Href {
        Href(self.principal_url.clone())
    }

    /// The storage collection backing the home itself
    pub fn collection(&self) -> &ArcCollection {
        &self.collection
    }

    /// Names of the children fixed at construction
    pub fn required_children(&self) -> Vec<&'static str> {
        self.children.iter().map(|(name, _)| *name).collect()
    }

    pub fn child(&self, name: &str) -> Option<ArcCollection> {
        if name == CALENDAR {
            return self.calendar();
        }
        self.children
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| c.clone())
    }

    /// The default calendar, once provisioned
    pub fn calendar(&self) -> Option<ArcCollection> {
        self.calendar
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Make sure the backing collection of the home exists
    pub async fn provision(&self) -> Result<()> {
        self.collection.provision().await?;
        Ok(())
    }

    /// Create the default calendar and wire it to the inbox.
    ///
    /// Steps run in order and each waits for the previous one:
    /// provision the home, get the `calendar` child, create it as a calendar
    /// collection, then mark it opaque and point the inbox free-busy-set
    /// (and optionally the default scheduling calendar) at it.
    /// If the creation fails, the inbox is left untouched.
    ///
    /// Running it again once it succeeded changes nothing.
    pub async fn provision_default_calendars(&self) -> Result<Arc<Self>> {
        let this = upgrade(&self.me, &self.url)?;
        let _running = self.provisioning.lock().await;
        if self.calendar().is_some() {
            tracing::trace!(url=%self.url, "default calendar already provisioned");
            return Ok(this);
        }

        self.provision().await?;

        let calendar = self.provisioner.provision_child(&self.url, CALENDAR)?;
        expect_role(&calendar, Role::Calendar)?;

        let abort = |source: StorageError| {
            tracing::warn!(url=%calendar.url(), err=%source, "default calendar creation failed");
            ProvisioningError::SequenceAbort {
                url: calendar.url().to_string(),
                source,
            }
        };
        if calendar.exists().await.map_err(abort)? {
            tracing::debug!(url=%calendar.url(), "default calendar found in storage");
        } else {
            calendar.create_calendar_collection().await.map_err(abort)?;
            tracing::debug!(url=%calendar.url(), "default calendar created");
        }

        self.setup_free_busy(&calendar).await?;

        *self.calendar.write().unwrap_or_else(|e| e.into_inner()) = Some(calendar);
        tracing::info!(guid=%self.record.guid, url=%self.url, "default calendar provisioned");
        Ok(this)
    }

    async fn setup_free_busy(&self, calendar: &ArcCollection) -> Result<()> {
        let href = Href(calendar.url().to_string());

        // Default calendar is initially opaque to freebusy
        write_if_absent(
            calendar,
            DeadProperty::ScheduleCalendarTransp(Transparency::Opaque),
        )
        .await?;

        let inbox = self.child(INBOX).ok_or_else(|| {
            ProvisioningError::Configuration(format!("{} has no inbox", self.url))
        })?;
        inbox.provision().await?;
        write_if_absent(
            &inbox,
            DeadProperty::CalendarFreeBusySet(vec![href.clone()]),
        )
        .await?;

        let mark_default = self.config.borrow().scheduling.caldav.default_calendar_provisioned;
        if mark_default {
            write_if_absent(&inbox, DeadProperty::ScheduleDefaultCalendarUrl(href)).await?;
        }

        Ok(())
    }

    /// Byte limit of this home: the stored override, else the configured default.
    /// `None` means unlimited.
    pub async fn quota_root(&self) -> Result<Option<u64>> {
        match self.collection.read_property(PropertyName::QuotaRoot).await? {
            Some(DeadProperty::QuotaRoot(value)) => value
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| ProvisioningError::InvalidProperty {
                    name: PropertyName::QuotaRoot.to_string(),
                    value,
                }),
            Some(other) => Err(ProvisioningError::InvalidProperty {
                name: PropertyName::QuotaRoot.to_string(),
                value: format!("{:?}", other),
            }),
            None => Ok(self.config.borrow().default_quota()),
        }
    }

    pub async fn has_quota_root(&self) -> Result<bool> {
        if self.collection.has_property(PropertyName::QuotaRoot).await? {
            return Ok(true);
        }
        Ok(self.config.borrow().default_quota().is_some())
    }

    /// Persist a quota override on this home
    pub async fn set_quota_root(&self, limit: u64) -> Result<()> {
        self.provision().await?;
        self.collection
            .write_property(DeadProperty::QuotaRoot(limit.to_string()))
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for CalendarHome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarHome")
            .field("guid", &self.record.guid)
            .field("url", &self.url)
            .finish()
    }
}

impl ProvisioningNode for CalendarHome {
    fn url(&self) -> &str {
        &self.url
    }

    fn resolve_child(&self, name: &str) -> Result<Node> {
        let home = upgrade(&self.me, &self.url)?;
        if name.is_empty() {
            return Ok(Node::Home(home));
        }
        let collection = self
            .child(name)
            .ok_or_else(|| not_found(&self.url, name))?;
        Ok(Node::HomeChild(HomeChild { home, collection }))
    }

    fn list_children(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.children.iter().map(|(n, _)| n.to_string()).collect();
        if self.calendar().is_some() {
            names.push(CALENDAR.to_string());
        }
        Ok(names)
    }

    fn access_control_list(&self) -> Acl {
        home_acl(&self.principal_url, &self.config.borrow())
    }
}

/// A collection inside a calendar home: inbox, outbox, drop box, free-busy URL or calendar.
/// What lies below is the storage layer's business.
#[derive(Clone)]
pub struct HomeChild {
    home: Arc<CalendarHome>,
    collection: ArcCollection,
}

impl HomeChild {
    pub fn home(&self) -> &Arc<CalendarHome> {
        &self.home
    }

    pub fn collection(&self) -> &ArcCollection {
        &self.collection
    }

    pub fn role(&self) -> Role {
        self.collection.role()
    }
}

impl ProvisioningNode for HomeChild {
    fn url(&self) -> &str {
        self.collection.url()
    }

    fn resolve_child(&self, name: &str) -> Result<Node> {
        if name.is_empty() {
            return Ok(Node::HomeChild(self.clone()));
        }
        Err(not_found(self.url(), name))
    }

    fn list_children(&self) -> Result<Vec<String>> {
        Ok(vec![])
    }

    fn access_control_list(&self) -> Acl {
        self.home.access_control_list().inherited()
    }
}

fn expect_role(collection: &ArcCollection, expected: Role) -> Result<()> {
    let role = collection.role();
    if role != expected {
        tracing::error!(url=%collection.url(), expected=%expected, got=%role, "wrong collection role");
        return Err(ProvisioningError::Configuration(format!(
            "{} is not a {}: got a {}",
            collection.url(),
            expected,
            role
        )));
    }
    Ok(())
}

async fn write_if_absent(collection: &ArcCollection, prop: DeadProperty) -> Result<()> {
    if collection.has_property(prop.name()).await? {
        tracing::trace!(url=%collection.url(), prop=%prop.name(), "property already set");
        return Ok(());
    }
    collection.write_property(prop).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::in_memory::MemDb;
    use calhome_dav::acltypes::Privilege;
    use calhome_directory::config::CalendarConfig;
    use calhome_directory::record::{DirectoryRecord, RecordType};
    use calhome_directory::static_provider::StaticDirectory;

    const HOME: &str = "/calendars/__uids__/abc-123/";
    const CAL: &str = "/calendars/__uids__/abc-123/calendar/";
    const INBOX_URL: &str = "/calendars/__uids__/abc-123/inbox/";

    fn home(db: Arc<MemDb>, config: CalendarConfig) -> (Arc<CalendarHome>, watch::Sender<CalendarConfig>) {
        let directory = StaticDirectory::from_records(
            "/principals/",
            vec![DirectoryRecord::new("abc-123", "alice", RecordType::Users)],
        )
        .unwrap();
        let record = directory.record_with_guid("abc-123").unwrap();
        let (tx, rx) = watch::channel(config);
        let home = CalendarHome::new("/calendars/__uids__/", record, &directory, rx, db).unwrap();
        (home, tx)
    }

    #[test]
    fn minimal_children() {
        let (home, _tx) = home(MemDb::new(), CalendarConfig::default());
        assert_eq!(home.required_children(), vec![INBOX, OUTBOX]);
        assert_eq!(home.list_children().unwrap(), vec!["inbox", "outbox"]);
        assert_eq!(home.url(), HOME);
        assert!(home.is_collection());
        assert!(home.resolve_child(CALENDAR).unwrap_err().is_not_found());
    }

    #[test]
    fn optional_children() {
        let config = CalendarConfig {
            enable_drop_box: true,
            free_busy_url: calhome_directory::config::FreeBusyUrlConfig { enabled: true },
            ..CalendarConfig::default()
        };
        let (home, tx) = home(MemDb::new(), config);
        assert_eq!(home.required_children(), vec![INBOX, OUTBOX, DROPBOX, FREEBUSY]);

        // fixed at construction
        tx.send_modify(|c| c.enable_drop_box = false);
        assert_eq!(home.required_children(), vec![INBOX, OUTBOX, DROPBOX, FREEBUSY]);

        let Node::HomeChild(dropbox) = home.resolve_child(DROPBOX).unwrap() else {
            panic!("dropbox must be a home child");
        };
        assert_eq!(dropbox.role(), Role::DropBoxHome);
        assert_eq!(dropbox.url(), "/calendars/__uids__/abc-123/dropbox/");
    }

    #[test]
    fn role_mismatch_is_fatal() {
        let db = MemDb::new();
        db.override_role(INBOX, Role::Calendar);
        let directory = StaticDirectory::from_records(
            "/principals/",
            vec![DirectoryRecord::new("abc-123", "alice", RecordType::Users)],
        )
        .unwrap();
        let record = directory.record_with_guid("abc-123").unwrap();
        let (_tx, rx) = watch::channel(CalendarConfig::default());
        let err = CalendarHome::new("/calendars/__uids__/", record, &directory, rx, db)
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn default_calendar_wiring() {
        let db = MemDb::new();
        let config = CalendarConfig {
            scheduling: calhome_directory::config::SchedulingConfig {
                caldav: calhome_directory::config::CalDavSchedulingConfig {
                    default_calendar_provisioned: true,
                },
            },
            ..CalendarConfig::default()
        };
        let (home, _tx) = home(db.clone(), config);

        let done = home.provision_default_calendars().await.unwrap();
        assert!(Arc::ptr_eq(&done, &home));
        assert_eq!(home.list_children().unwrap(), vec!["inbox", "outbox", "calendar"]);

        let cal = db.collection(CAL).unwrap();
        assert!(cal.is_calendar());
        assert_eq!(
            cal.property(PropertyName::ScheduleCalendarTransp),
            Some(DeadProperty::ScheduleCalendarTransp(Transparency::Opaque))
        );

        let inbox = db.collection(INBOX_URL).unwrap();
        assert_eq!(
            inbox.property(PropertyName::CalendarFreeBusySet),
            Some(DeadProperty::CalendarFreeBusySet(vec![Href(CAL.into())]))
        );
        assert_eq!(
            inbox.property(PropertyName::ScheduleDefaultCalendarUrl),
            Some(DeadProperty::ScheduleDefaultCalendarUrl(Href(CAL.into())))
        );

        let Node::HomeChild(calendar) = home.resolve_child(CALENDAR).unwrap() else {
            panic!("calendar must be a home child");
        };
        assert_eq!(calendar.role(), Role::Calendar);
    }

    #[tokio::test]
    async fn default_scheduling_calendar_is_optional() {
        let db = MemDb::new();
        let (home, _tx) = home(db.clone(), CalendarConfig::default());
        home.provision_default_calendars().await.unwrap();

        let inbox = db.collection(INBOX_URL).unwrap();
        assert!(inbox.property(PropertyName::CalendarFreeBusySet).is_some());
        assert!(inbox.property(PropertyName::ScheduleDefaultCalendarUrl).is_none());
    }

    #[tokio::test]
    async fn provisioning_twice_writes_once() {
        let db = MemDb::new();
        let (home, _tx) = home(db.clone(), CalendarConfig::default());
        home.provision_default_calendars().await.unwrap();
        home.provision_default_calendars().await.unwrap();

        assert_eq!(db.collection(CAL).unwrap().write_count(), 1);
        assert_eq!(db.collection(INBOX_URL).unwrap().write_count(), 1);
    }

    #[tokio::test]
    async fn existing_calendar_is_adopted() {
        let db = MemDb::new();
        let (first, _tx) = home(db.clone(), CalendarConfig::default());
        first.provision_default_calendars().await.unwrap();

        // a fresh home over the same storage, as after a restart
        let (second, _tx) = home(db.clone(), CalendarConfig::default());
        assert!(second.calendar().is_none());
        second.provision_default_calendars().await.unwrap();
        assert!(second.calendar().is_some());
        assert_eq!(db.collection(INBOX_URL).unwrap().write_count(), 1);
    }

    #[tokio::test]
    async fn failed_creation_leaves_inbox_alone() {
        let db = MemDb::new();
        let (home, _tx) = home(db.clone(), CalendarConfig::default());
        db.fail_calendar_creation(true);

        let err = home.provision_default_calendars().await.unwrap_err();
        assert!(matches!(err, ProvisioningError::SequenceAbort { .. }));
        assert!(home.calendar().is_none());
        assert!(home.resolve_child(CALENDAR).unwrap_err().is_not_found());
        let inbox = db.collection(INBOX_URL).unwrap();
        assert!(inbox.property(PropertyName::CalendarFreeBusySet).is_none());
        assert_eq!(inbox.write_count(), 0);

        // partial state stays valid and the sequence can be retried
        db.fail_calendar_creation(false);
        home.provision_default_calendars().await.unwrap();
        assert!(inbox.property(PropertyName::CalendarFreeBusySet).is_some());
    }

    #[tokio::test]
    async fn failed_lookup_aborts_too() {
        let db = MemDb::new();
        let (home, _tx) = home(db.clone(), CalendarConfig::default());
        db.fail_calendar_lookup(true);

        let err = home.provision_default_calendars().await.unwrap_err();
        assert!(matches!(err, ProvisioningError::SequenceAbort { .. }));
        assert!(home.calendar().is_none());
        assert_eq!(db.collection(INBOX_URL).unwrap().write_count(), 0);

        db.fail_calendar_lookup(false);
        home.provision_default_calendars().await.unwrap();
        assert!(home.calendar().is_some());
    }

    #[tokio::test]
    async fn quota() {
        let db = MemDb::new();
        let (home, tx) = home(db.clone(), CalendarConfig::default());
        assert_eq!(home.quota_root().await.unwrap(), Some(100 * 1024 * 1024));
        assert!(home.has_quota_root().await.unwrap());

        tx.send_modify(|c| c.user_quota = None);
        assert_eq!(home.quota_root().await.unwrap(), None);
        assert!(!home.has_quota_root().await.unwrap());

        home.set_quota_root(4096).await.unwrap();
        assert_eq!(home.quota_root().await.unwrap(), Some(4096));
        assert!(home.has_quota_root().await.unwrap());

        home.collection()
            .write_property(DeadProperty::QuotaRoot("lots".into()))
            .await
            .unwrap();
        assert!(matches!(
            home.quota_root().await,
            Err(ProvisioningError::InvalidProperty { .. })
        ));
    }

    #[tokio::test]
    async fn empty_segment_below_a_home() {
        let (home, _tx) = home(MemDb::new(), CalendarConfig::default());
        let Node::Home(same) = home.resolve_child("").unwrap() else {
            panic!("a home must resolve to itself");
        };
        assert!(Arc::ptr_eq(&same, &home));

        let inbox = home.resolve_child(INBOX).unwrap();
        let again = inbox.resolve_child("").unwrap();
        assert!(matches!(again, Node::HomeChild(_)));
        assert_eq!(again.url(), INBOX_URL);
    }

    #[test]
    fn children_inherit_inheritable_entries() {
        let (home, _tx) = home(MemDb::new(), CalendarConfig::default());
        let inbox = home.resolve_child(INBOX).unwrap();
        let acl = inbox.access_control_list();
        assert_eq!(acl.len(), 2);
        assert!(acl.iter().all(|ace| ace.inheritable));
        assert!(acl.0[0].grants(Privilege::All));
        assert!(acl.0[1].grants(Privilege::ReadFreeBusy));
        assert_eq!(home.owner(), Href("/principals/__uids__/abc-123/".into()));
    }
}
