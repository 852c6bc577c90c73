//! XML tuning resources.
//!
//! Tuning is kept as text. Only the root element's identifying attributes
//! are ever parsed.

use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sulani_common::{CacheNode, Model, Tracked};

use crate::{Error, Result};

/// Identifying attributes of a tuning root element, such as
/// `<I c="Buff" i="buff" m="buffs.buff" n="Buff_Happy" s="12345">`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TuningAttributes {
    /// Root element name (`I` for instances, `M` for modules).
    pub tag: String,
    /// `n`: tuning name.
    pub name: Option<String>,
    /// `s`: instance id.
    pub instance_id: Option<u64>,
    /// `i`: instance type.
    pub instance_type: Option<String>,
    /// `c`: class.
    pub class: Option<String>,
    /// `m`: module path.
    pub module: Option<String>,
}

/// A UTF-8 tuning document.
#[derive(Debug, PartialEq)]
pub struct XmlResource {
    node: CacheNode,
    text: String,
}

impl XmlResource {
    pub fn create(text: impl Into<String>) -> Self {
        Self {
            node: CacheNode::new(),
            text: text.into(),
        }
    }

    /// Wrap tuning bytes, keeping them as the cached buffer.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)?.to_string();
        Ok(Self {
            node: CacheNode::with_cached(Arc::from(data)),
            text,
        })
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.node.invalidate();
    }

    /// Read the root element's `n`, `s`, `i`, `c` and `m` attributes.
    ///
    /// Returns `None` when the document has no element.
    pub fn root_attributes(&self) -> Result<Option<TuningAttributes>> {
        let mut reader = Reader::from_str(self.text.trim_start_matches('\u{feff}'));
        loop {
            let event = reader.read_event().map_err(|e| Error::Xml {
                position: reader.buffer_position() as u64,
                message: e.to_string(),
            })?;
            match event {
                Event::Start(element) | Event::Empty(element) => {
                    return root_from_element(&element, reader.buffer_position() as u64).map(Some)
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    /// Check that the document is well-formed XML.
    pub fn validate(&self) -> Result<()> {
        let mut reader = Reader::from_str(self.text.trim_start_matches('\u{feff}'));
        loop {
            match reader.read_event() {
                Ok(Event::Eof) => return Ok(()),
                Ok(_) => {}
                Err(e) => {
                    return Err(Error::Xml {
                        position: reader.buffer_position() as u64,
                        message: e.to_string(),
                    })
                }
            }
        }
    }
}

fn root_from_element(element: &BytesStart<'_>, position: u64) -> Result<TuningAttributes> {
    let xml_error = |message: String| Error::Xml { position, message };

    let mut attributes = TuningAttributes {
        tag: String::from_utf8_lossy(element.name().as_ref()).into_owned(),
        ..TuningAttributes::default()
    };
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| xml_error(e.to_string()))?;
        let value = attribute
            .unescape_value()
            .map_err(|e| xml_error(e.to_string()))?
            .into_owned();
        match attribute.key.as_ref() {
            b"n" => attributes.name = Some(value),
            b"s" => {
                let id = value
                    .parse()
                    .map_err(|_| xml_error(format!("instance id {value:?} is not a number")))?;
                attributes.instance_id = Some(id);
            }
            b"i" => attributes.instance_type = Some(value),
            b"c" => attributes.class = Some(value),
            b"m" => attributes.module = Some(value),
            _ => {}
        }
    }
    Ok(attributes)
}

impl Clone for XmlResource {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            text: self.text.clone(),
        }
    }
}

impl Tracked for XmlResource {
    fn node(&self) -> &CacheNode {
        &self.node
    }
}

impl Model for XmlResource {
    type Error = Error;

    fn serialize(&self) -> Result<Vec<u8>> {
        Ok(self.text.as_bytes().to_vec())
    }
}

/// Whether `data` starts like an XML document.
pub(crate) fn looks_like_xml(data: &[u8]) -> bool {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    data[start..].starts_with(b"<?xml")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TUNING: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<I c="Buff" i="buff" m="buffs.buff" n="Buff_Happy&amp;Calm" s="12345">
  <T n="visible">True</T>
</I>"#;

    #[test]
    fn test_root_attributes() {
        let resource = XmlResource::create(TUNING);
        let root = resource.root_attributes().unwrap().unwrap();
        assert_eq!(root.tag, "I");
        assert_eq!(root.name.as_deref(), Some("Buff_Happy&Calm"));
        assert_eq!(root.instance_id, Some(12345));
        assert_eq!(root.instance_type.as_deref(), Some("buff"));
        assert_eq!(root.class.as_deref(), Some("Buff"));
        assert_eq!(root.module.as_deref(), Some("buffs.buff"));
    }

    #[test]
    fn test_bad_instance_id() {
        let resource = XmlResource::create(r#"<I n="x" s="abc"/>"#);
        assert!(matches!(resource.root_attributes(), Err(Error::Xml { .. })));
    }

    #[test]
    fn test_text_roundtrip_and_invalidate() {
        let mut resource = XmlResource::from_bytes(TUNING.as_bytes()).unwrap();
        assert!(resource.node().is_cached());
        assert_eq!(&*resource.buffer().unwrap(), TUNING.as_bytes());

        resource.set_text("<I/>");
        assert!(!resource.node().is_cached());
        assert_eq!(&*resource.buffer().unwrap(), b"<I/>");
        assert!(resource.validate().is_ok());
    }

    #[test]
    fn test_rejects_binary() {
        assert!(matches!(
            XmlResource::from_bytes(&[0xFF, 0xFE, 0x00]),
            Err(Error::NotText(_))
        ));
    }

    #[test]
    fn test_sniff() {
        assert!(looks_like_xml(b"<?xml version=\"1.0\"?><I/>"));
        assert!(looks_like_xml(b"\xEF\xBB\xBF\r\n<?xml version=\"1.0\"?>"));
        assert!(!looks_like_xml(b"DATA"));
        assert!(!looks_like_xml(b""));
    }
}
