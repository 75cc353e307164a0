use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, Weak};

use anyhow::{bail, Context, Result};
use tokio::sync::watch;

use crate::config::*;
use crate::record::{DirectoryRecord, RecordType};
use crate::{ArcRecord, CalendarHomes, DirectoryService, RecordIter};

#[derive(Default)]
pub struct RecordDatabase {
    by_guid: HashMap<String, ArcRecord>,
    by_short_name: HashMap<(RecordType, String), ArcRecord>,
    by_type: BTreeMap<RecordType, Vec<ArcRecord>>,
}

impl RecordDatabase {
    pub fn build(records: impl IntoIterator<Item = DirectoryRecord>) -> Result<Self> {
        let mut db = Self::default();
        for record in records {
            if db.by_guid.contains_key(&record.guid) {
                bail!("Several records have the same guid: {}", record.guid);
            }
            let name_key = (record.record_type, record.short_name.clone());
            if db.by_short_name.contains_key(&name_key) {
                tracing::warn!(
                    record_type=%record.record_type,
                    short_name=%record.short_name,
                    guid=%record.guid,
                    "Several records have the same short name, skipping"
                );
                continue;
            }

            let record = Arc::new(record);
            db.by_guid.insert(record.guid.clone(), record.clone());
            db.by_short_name.insert(name_key, record.clone());
            db.by_type
                .entry(record.record_type)
                .or_default()
                .push(record);
        }
        Ok(db)
    }

    pub fn len(&self) -> usize {
        self.by_guid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_guid.is_empty()
    }
}

/// A directory whose records come from the configuration file
pub struct StaticDirectory {
    config: StaticDirectoryConfig,
    record_types: Vec<RecordType>,
    record_db: watch::Sender<Arc<RecordDatabase>>,
    calendar_homes: RwLock<Option<Weak<dyn CalendarHomes>>>,
}

impl StaticDirectory {
    pub fn new(config: StaticDirectoryConfig) -> Result<Self> {
        let db = load_records(&config)?;
        tracing::info!("{} directory records loaded", db.len());

        let record_types = match &config.record_types {
            Some(types) => {
                let mut types = types.clone();
                types.sort();
                types.dedup();
                types
            }
            None => RecordType::ALL.to_vec(),
        };

        let (record_db, _) = watch::channel(Arc::new(db));
        Ok(Self {
            config,
            record_types,
            record_db,
            calendar_homes: RwLock::new(None),
        })
    }

    /// A directory serving exactly these records, handy for tests and demos
    pub fn from_records(principals_url: &str, records: Vec<DirectoryRecord>) -> Result<Self> {
        Self::new(StaticDirectoryConfig {
            principals_url: principals_url.to_string(),
            record_types: None,
            records,
            records_file: None,
        })
    }

    /// Read the records again from the configuration source.
    /// On error, the previous records are kept.
    pub fn reload(&self) -> Result<()> {
        let db = load_records(&self.config)?;
        tracing::info!("{} directory records reloaded", db.len());
        self.record_db.send_replace(Arc::new(db));
        Ok(())
    }

    /// Replace every record at once
    pub fn replace(&self, records: Vec<DirectoryRecord>) -> Result<()> {
        let db = RecordDatabase::build(records)?;
        self.record_db.send_replace(Arc::new(db));
        Ok(())
    }

    fn snapshot(&self) -> Arc<RecordDatabase> {
        self.record_db.borrow().clone()
    }

    fn serves(&self, record_type: RecordType) -> bool {
        self.record_types.contains(&record_type)
    }
}

impl DirectoryService for StaticDirectory {
    fn record_types(&self) -> Vec<RecordType> {
        self.record_types.clone()
    }

    fn list_records(&self, record_type: RecordType) -> RecordIter {
        if !self.serves(record_type) {
            return Box::new(std::iter::empty());
        }
        Box::new(TypeRecords {
            db: self.snapshot(),
            record_type,
            pos: 0,
        })
    }

    fn record_with_short_name(&self, record_type: RecordType, short_name: &str) -> Option<ArcRecord> {
        if !self.serves(record_type) {
            return None;
        }
        self.snapshot()
            .by_short_name
            .get(&(record_type, short_name.to_string()))
            .cloned()
    }

    fn record_with_guid(&self, guid: &str) -> Option<ArcRecord> {
        self.snapshot()
            .by_guid
            .get(guid)
            .filter(|r| self.serves(r.record_type))
            .cloned()
    }

    fn principal_url(&self, record: &DirectoryRecord) -> String {
        format!(
            "{}/__uids__/{}/",
            self.config.principals_url.trim_end_matches('/'),
            record.guid
        )
    }

    fn set_calendar_homes(&self, homes: Weak<dyn CalendarHomes>) {
        let mut slot = self
            .calendar_homes
            .write()
            .unwrap_or_else(|e| e.into_inner());
        *slot = Some(homes);
    }

    fn calendar_homes(&self) -> Option<Arc<dyn CalendarHomes>> {
        self.calendar_homes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .and_then(Weak::upgrade)
    }
}

/// Walks one record type of a database snapshot, one record at a time
struct TypeRecords {
    db: Arc<RecordDatabase>,
    record_type: RecordType,
    pos: usize,
}

impl Iterator for TypeRecords {
    type Item = ArcRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.db.by_type.get(&self.record_type)?.get(self.pos)?.clone();
        self.pos += 1;
        Some(record)
    }
}

fn load_records(config: &StaticDirectoryConfig) -> Result<RecordDatabase> {
    let mut records = config.records.clone();
    if let Some(path) = &config.records_file {
        let list: RecordList = read_config(path.clone())
            .context(format!("'{:?}' must be a record list", path))?;
        records.extend(list.records);
    }
    RecordDatabase::build(records)
}
