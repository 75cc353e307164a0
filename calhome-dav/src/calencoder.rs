use quick_xml::events::Event;
use quick_xml::Error as QError;

use super::caltypes::*;
use super::xml::{IWrite, QWrite, Writer};

impl QWrite for DeadProperty {
    async fn qwrite(&self, xml: &mut Writer<impl IWrite>) -> Result<(), QError> {
        match self {
            Self::ScheduleCalendarTransp(transp) => {
                let start = xml.create_cal_element("schedule-calendar-transp");
                let end = start.to_end().into_owned();
                xml.q.write_event_async(Event::Start(start.clone())).await?;
                transp.qwrite(xml).await?;
                xml.q.write_event_async(Event::End(end)).await
            }
            Self::CalendarFreeBusySet(hrefs) => {
                let start = xml.create_cal_element("calendar-free-busy-set");
                let end = start.to_end().into_owned();
                xml.q.write_event_async(Event::Start(start.clone())).await?;
                for href in hrefs.iter() {
                    href.qwrite(xml).await?;
                }
                xml.q.write_event_async(Event::End(end)).await
            }
            Self::ScheduleDefaultCalendarUrl(href) => {
                let start = xml.create_cal_element("schedule-default-calendar-URL");
                let end = start.to_end().into_owned();
                xml.q.write_event_async(Event::Start(start.clone())).await?;
                href.qwrite(xml).await?;
                xml.q.write_event_async(Event::End(end)).await
            }
            Self::QuotaRoot(limit) => {
                let start = xml.create_twisted_private_element("quota-root");
                xml.text_element(start, limit).await
            }
        }
    }
}

impl QWrite for Transparency {
    async fn qwrite(&self, xml: &mut Writer<impl IWrite>) -> Result<(), QError> {
        let tag = match self {
            Self::Opaque => xml.create_cal_element("opaque"),
            Self::Transparent => xml.create_cal_element("transparent"),
        };
        xml.q.write_event_async(Event::Empty(tag)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Href;

    async fn serialize(elem: &impl QWrite) -> String {
        let mut xml = Writer::fragment(Vec::new());
        elem.qwrite(&mut xml).await.expect("xml serialization");
        String::from_utf8(xml.into_inner()).unwrap()
    }

    #[tokio::test]
    async fn opaque_calendar() {
        let got = serialize(&DeadProperty::ScheduleCalendarTransp(Transparency::Opaque)).await;
        assert_eq!(
            got,
            "<C:schedule-calendar-transp><C:opaque/></C:schedule-calendar-transp>"
        );
    }

    #[tokio::test]
    async fn free_busy_set() {
        let prop = DeadProperty::CalendarFreeBusySet(vec![Href(
            "/calendars/__uids__/abc-123/calendar/".into(),
        )]);
        let got = serialize(&prop).await;
        assert_eq!(
            got,
            "<C:calendar-free-busy-set><D:href>/calendars/__uids__/abc-123/calendar/</D:href></C:calendar-free-busy-set>"
        );
    }

    #[tokio::test]
    async fn quota_root() {
        let got = serialize(&DeadProperty::QuotaRoot("1048576".into())).await;
        assert_eq!(got, "<TP:quota-root>1048576</TP:quota-root>");
    }

    #[test]
    fn property_name_matches_value() {
        let prop = DeadProperty::ScheduleDefaultCalendarUrl(Href("/x/".into()));
        assert_eq!(prop.name(), PropertyName::ScheduleDefaultCalendarUrl);
        assert_eq!(prop.name().to_string(), "C:schedule-default-calendar-URL");
    }
}
