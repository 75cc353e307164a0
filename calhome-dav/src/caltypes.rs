use super::types as dav;

//RFC covered: RFC4791 (calendar-free-busy-set), RFC6638 (schedule-calendar-transp,
//schedule-default-calendar-URL) and the Twisted quota root property.

/// Name of a dead property, used as the storage key
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum PropertyName {
    ScheduleCalendarTransp,
    CalendarFreeBusySet,
    ScheduleDefaultCalendarUrl,
    QuotaRoot,
}

impl PropertyName {
    /// Qualified name as it appears on the wire
    pub fn qualified(&self) -> &'static str {
        match self {
            Self::ScheduleCalendarTransp => "C:schedule-calendar-transp",
            Self::CalendarFreeBusySet => "C:calendar-free-busy-set",
            Self::ScheduleDefaultCalendarUrl => "C:schedule-default-calendar-URL",
            Self::QuotaRoot => "TP:quota-root",
        }
    }
}

impl std::fmt::Display for PropertyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.qualified())
    }
}

/// Whether a calendar contributes to its owner's busy time
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Transparency {
    Opaque,
    Transparent,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum DeadProperty {
    ScheduleCalendarTransp(Transparency),
    CalendarFreeBusySet(Vec<dav::Href>),
    ScheduleDefaultCalendarUrl(dav::Href),
    /// Stored as text, parsed by whoever enforces the quota
    QuotaRoot(String),
}

impl DeadProperty {
    pub fn name(&self) -> PropertyName {
        match self {
            Self::ScheduleCalendarTransp(_) => PropertyName::ScheduleCalendarTransp,
            Self::CalendarFreeBusySet(_) => PropertyName::CalendarFreeBusySet,
            Self::ScheduleDefaultCalendarUrl(_) => PropertyName::ScheduleDefaultCalendarUrl,
            Self::QuotaRoot(_) => PropertyName::QuotaRoot,
        }
    }
}
