pub mod xml;

pub use xml::XmlElement;
