//! Metadata object model for complex SAR imagery.
//!
//! The crate centers on a schema-driven object model: static field
//! tables describe each metadata block once, and a single generic walk
//! handles validation, XML-node serialization, and the nested-mapping
//! representation for every block. On top of the generic model sit the
//! domain blocks — geographic reference data, radiometric calibration,
//! and range/azimuth compensation — each carrying a consistency pass
//! that fills derivable fields from collection geometry.
//!
//! # Example
//!
//! ```
//! use sicdmeta::core::{GeoData, Scp};
//!
//! let mut geo = GeoData::new();
//! geo.set_scp(Scp::from_ecf([6378137.0, 0.0, 0.0]))?;
//! geo.set_image_corners(&[(1.0, 2.0), (1.0, 3.0), (0.0, 3.0), (0.0, 2.0)])?;
//! let xml = geo.to_node()?.to_xml_string()?;
//! assert!(xml.contains("<EarthModel>WGS_84</EarthModel>"));
//! # Ok::<(), sicdmeta::types::MetaError>(())
//! ```

pub mod core;
pub mod io;
pub mod types;

pub use crate::core::{
    FieldValue, GeoData, GeoInfo, Object, Poly1d, Poly2d, Radiometric, RgAzComp, Scp, XyzPoly,
};
pub use crate::io::XmlElement;
pub use crate::types::{MetaError, MetaResult, ValidationMode};
