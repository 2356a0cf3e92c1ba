use crate::types::{MetaError, MetaResult};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// A single element of an XML document tree.
///
/// This is the node representation the object model serializes to and parses
/// from. Attribute order and child order are preserved; mixed content is not
/// supported (an element carries either text or child elements).
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(tag: impl Into<String>) -> Self {
        XmlElement {
            tag: tag.into(),
            attrs: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    /// Create a leaf element holding formatted text.
    pub fn with_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        let mut el = XmlElement::new(tag);
        el.text = Some(text.into());
        el
    }

    /// Look up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any previous value with the same name.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.attrs.iter_mut().find(|(k, _)| *k == name) {
            entry.1 = value;
        } else {
            self.attrs.push((name, value));
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = Some(text.into());
    }

    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// First child element with the given tag.
    pub fn find(&self, tag: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All child elements with the given tag, in document order.
    pub fn find_all<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Parse a complete XML document (or fragment with a single root) into
    /// an element tree. Comments, declarations, and processing instructions
    /// are ignored.
    pub fn parse_str(xml: &str) -> MetaResult<XmlElement> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    stack.push(element_from_start(&e)?);
                }
                Ok(Event::Empty(e)) => {
                    let el = element_from_start(&e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(el),
                        None => return Ok(el),
                    }
                }
                Ok(Event::Text(t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| MetaError::XmlParsing(e.to_string()))?;
                    if let Some(top) = stack.last_mut() {
                        top.text = Some(text.into_owned());
                    }
                }
                Ok(Event::CData(t)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text = Some(String::from_utf8_lossy(t.as_ref()).into_owned());
                    }
                }
                Ok(Event::End(_)) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| MetaError::XmlParsing("unbalanced end tag".to_string()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(el),
                        None => return Ok(el),
                    }
                }
                Ok(Event::Eof) => {
                    return Err(MetaError::XmlParsing(
                        "no root element found in document".to_string(),
                    ));
                }
                Ok(_) => {} // declarations, comments, processing instructions
                Err(e) => return Err(MetaError::XmlParsing(e.to_string())),
            }
        }
    }

    /// Serialize the element tree to an indented XML string.
    pub fn to_xml_string(&self) -> MetaResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        write_element(&mut writer, self)?;
        let bytes = writer.into_inner();
        String::from_utf8(bytes).map_err(|e| MetaError::XmlParsing(e.to_string()))
    }
}

fn element_from_start(e: &BytesStart<'_>) -> MetaResult<XmlElement> {
    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut el = XmlElement::new(tag);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| MetaError::XmlParsing(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| MetaError::XmlParsing(e.to_string()))?
            .into_owned();
        el.attrs.push((key, value));
    }
    Ok(el)
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &XmlElement) -> MetaResult<()> {
    let mut start = BytesStart::new(el.tag.as_str());
    for (k, v) in &el.attrs {
        start.push_attribute((k.as_str(), v.as_str()));
    }

    if el.children.is_empty() && el.text.is_none() {
        writer
            .write_event(Event::Empty(start))
            .map_err(|e| MetaError::XmlParsing(e.to_string()))?;
        return Ok(());
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| MetaError::XmlParsing(e.to_string()))?;
    if let Some(text) = &el.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| MetaError::XmlParsing(e.to_string()))?;
    }
    for child in &el.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.tag.as_str())))
        .map_err(|e| MetaError::XmlParsing(e.to_string()))?;
    Ok(())
}
