use quick_xml::events::Event;
use quick_xml::Error as QError;

use super::acltypes::*;
use super::types::Href;
use super::xml::{IWrite, QWrite, Writer};

impl QWrite for Href {
    async fn qwrite(&self, xml: &mut Writer<impl IWrite>) -> Result<(), QError> {
        let start = xml.create_dav_element("href");
        xml.text_element(start, self.as_str()).await
    }
}

impl QWrite for Acl {
    async fn qwrite(&self, xml: &mut Writer<impl IWrite>) -> Result<(), QError> {
        let start = xml.create_dav_element("acl");
        let end = start.to_end().into_owned();
        xml.q.write_event_async(Event::Start(start.clone())).await?;
        for ace in self.iter() {
            ace.qwrite(xml).await?;
        }
        xml.q.write_event_async(Event::End(end)).await
    }
}

impl QWrite for Ace {
    async fn qwrite(&self, xml: &mut Writer<impl IWrite>) -> Result<(), QError> {
        let start = xml.create_dav_element("ace");
        let end = start.to_end().into_owned();
        xml.q.write_event_async(Event::Start(start.clone())).await?;

        self.principal.qwrite(xml).await?;

        let grant = xml.create_dav_element("grant");
        let grant_end = grant.to_end().into_owned();
        xml.q.write_event_async(Event::Start(grant.clone())).await?;
        for privilege in self.grant.iter() {
            privilege.qwrite(xml).await?;
        }
        xml.q.write_event_async(Event::End(grant_end)).await?;

        if self.protected {
            let tag = xml.create_dav_element("protected");
            xml.q.write_event_async(Event::Empty(tag)).await?;
        }
        if self.inheritable {
            let tag = xml.create_twisted_element("inheritable");
            xml.q.write_event_async(Event::Empty(tag)).await?;
        }

        xml.q.write_event_async(Event::End(end)).await
    }
}

impl QWrite for Principal {
    async fn qwrite(&self, xml: &mut Writer<impl IWrite>) -> Result<(), QError> {
        let start = xml.create_dav_element("principal");
        let end = start.to_end().into_owned();
        xml.q.write_event_async(Event::Start(start.clone())).await?;
        match self {
            Self::All => {
                let tag = xml.create_dav_element("all");
                xml.q.write_event_async(Event::Empty(tag)).await?;
            }
            Self::Authenticated => {
                let tag = xml.create_dav_element("authenticated");
                xml.q.write_event_async(Event::Empty(tag)).await?;
            }
            Self::Unauthenticated => {
                let tag = xml.create_dav_element("unauthenticated");
                xml.q.write_event_async(Event::Empty(tag)).await?;
            }
            Self::Href(href) => href.qwrite(xml).await?,
        }
        xml.q.write_event_async(Event::End(end)).await
    }
}

impl QWrite for Privilege {
    async fn qwrite(&self, xml: &mut Writer<impl IWrite>) -> Result<(), QError> {
        let start = xml.create_dav_element("privilege");
        let end = start.to_end().into_owned();
        xml.q.write_event_async(Event::Start(start.clone())).await?;
        let tag = match self {
            Self::All => xml.create_dav_element("all"),
            Self::Read => xml.create_dav_element("read"),
            Self::Write => xml.create_dav_element("write"),
            Self::ReadCurrentUserPrivilegeSet => {
                xml.create_dav_element("read-current-user-privilege-set")
            }
            Self::ReadFreeBusy => xml.create_cal_element("read-free-busy"),
        };
        xml.q.write_event_async(Event::Empty(tag)).await?;
        xml.q.write_event_async(Event::End(end)).await
    }
}
