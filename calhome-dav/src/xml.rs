use std::future::Future;

use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Error as QError;
use tokio::io::AsyncWrite;

// Constants
pub const DAV_URN: &str = "DAV:";
pub const CAL_URN: &str = "urn:ietf:params:xml:ns:caldav";
pub const TWISTED_URN: &str = "http://twistedmatrix.com/xml_namespace/dav/";
pub const TWISTED_PRIVATE_URN: &str = "http://twistedmatrix.com/xml_namespace/dav/private/";

// Async traits
pub trait IWrite: AsyncWrite + Unpin + Send {}
impl<T: AsyncWrite + Unpin + Send> IWrite for T {}

// Serialization traits
pub trait QWrite {
    fn qwrite(
        &self,
        xml: &mut Writer<impl IWrite>,
    ) -> impl Future<Output = Result<(), QError>> + Send;
}

// ---------------

/// Transform a Rust object into an XML stream of characters
pub struct Writer<T: IWrite> {
    pub q: quick_xml::writer::Writer<T>,
    pub ns_to_apply: Vec<(String, String)>,
}
impl<T: IWrite> Writer<T> {
    /// A writer declaring every namespace we may emit on its first element
    pub fn new(inner: T) -> Self {
        Self {
            q: quick_xml::writer::Writer::new(inner),
            ns_to_apply: vec![
                ("xmlns:D".into(), DAV_URN.into()),
                ("xmlns:C".into(), CAL_URN.into()),
                ("xmlns:T".into(), TWISTED_URN.into()),
                ("xmlns:TP".into(), TWISTED_PRIVATE_URN.into()),
            ],
        }
    }

    /// Same as `new` but without namespace declarations, for fragments
    pub fn fragment(inner: T) -> Self {
        Self {
            q: quick_xml::writer::Writer::new(inner),
            ns_to_apply: vec![],
        }
    }

    pub fn into_inner(self) -> T {
        self.q.into_inner()
    }

    pub fn create_dav_element(&mut self, name: &str) -> BytesStart<'static> {
        self.create_ns_element("D", name)
    }
    pub fn create_cal_element(&mut self, name: &str) -> BytesStart<'static> {
        self.create_ns_element("C", name)
    }
    pub fn create_twisted_element(&mut self, name: &str) -> BytesStart<'static> {
        self.create_ns_element("T", name)
    }
    pub fn create_twisted_private_element(&mut self, name: &str) -> BytesStart<'static> {
        self.create_ns_element("TP", name)
    }

    fn create_ns_element(&mut self, ns: &str, name: &str) -> BytesStart<'static> {
        let mut start = BytesStart::new(format!("{}:{}", ns, name));
        if !self.ns_to_apply.is_empty() {
            start.extend_attributes(
                self.ns_to_apply
                    .iter()
                    .map(|(k, n)| (k.as_str(), n.as_str())),
            );
            self.ns_to_apply.clear()
        }
        start
    }

    /// Write `<start>text</start>`
    pub async fn text_element(&mut self, start: BytesStart<'static>, text: &str) -> Result<(), QError> {
        let end = start.to_end().into_owned();
        self.q.write_event_async(Event::Start(start.clone())).await?;
        self.q
            .write_event_async(Event::Text(BytesText::new(text)))
            .await?;
        self.q.write_event_async(Event::End(end)).await
    }
}

/// Serialize a standalone value (eg. a property value) to a string
pub async fn to_string(value: &impl QWrite) -> Result<String, QError> {
    let mut xml = Writer::new(Vec::new());
    value.qwrite(&mut xml).await?;
    String::from_utf8(xml.into_inner()).map_err(|e| QError::NonDecodable(Some(e.utf8_error())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn namespaces_only_on_first_element() {
        let mut xml = Writer::new(Vec::new());
        let first = xml.create_dav_element("href");
        let second = xml.create_dav_element("href");

        assert_eq!(first.attributes().count(), 4);
        assert_eq!(second.attributes().count(), 0);
    }

    #[tokio::test]
    async fn text_element() {
        let mut xml = Writer::fragment(Vec::new());
        let start = xml.create_dav_element("href");
        xml.text_element(start, "/calendars/__uids__/abc/")
            .await
            .expect("xml serialization");

        let got = String::from_utf8(xml.into_inner()).unwrap();
        assert_eq!(got, "<D:href>/calendars/__uids__/abc/</D:href>");
    }
}
