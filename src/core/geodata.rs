//! Geographic reference layer: the dual-representation scene center
//! point, free-form geographic annotation features, and the collection
//! footprint container.

use crate::core::blocks::{
    self, LAT_LON_ARRAY_ELEMENT, LAT_LON_CORNER_STRING, LAT_LON_RESTRICTION,
};
use crate::core::geocoords::{ecf_to_geodetic, geodetic_to_ecf};
use crate::core::model::{FieldValue, Object};
use crate::core::schema::{ChoiceSpec, FieldKind, FieldSpec, IndexKind, Schema};
use crate::io::xml::XmlElement;
use crate::types::{MetaError, MetaResult, ValidationMode};
use serde_json::Value;

/// Scene center point carried in both ECF (meters) and geodetic
/// (lat/lon degrees, HAE meters) form. Setting either representation
/// eagerly recomputes the other, so the two never drift apart.
#[derive(Debug, Clone, PartialEq)]
pub struct Scp {
    ecf: [f64; 3],
    llh: [f64; 3],
}

impl Scp {
    pub fn from_ecf(ecf: [f64; 3]) -> Scp {
        Scp {
            ecf,
            llh: ecf_to_geodetic(ecf),
        }
    }

    pub fn from_llh(llh: [f64; 3]) -> MetaResult<Scp> {
        let llh = check_llh(llh)?;
        Ok(Scp {
            ecf: geodetic_to_ecf(llh),
            llh,
        })
    }

    pub fn ecf(&self) -> [f64; 3] {
        self.ecf
    }

    pub fn llh(&self) -> [f64; 3] {
        self.llh
    }

    pub fn set_ecf(&mut self, ecf: [f64; 3]) {
        self.ecf = ecf;
        self.llh = ecf_to_geodetic(ecf);
    }

    pub fn set_llh(&mut self, llh: [f64; 3]) -> MetaResult<()> {
        let llh = check_llh(llh)?;
        self.ecf = geodetic_to_ecf(llh);
        self.llh = llh;
        Ok(())
    }

    pub fn to_node(&self, tag: &str) -> MetaResult<XmlElement> {
        let mut node = XmlElement::new(tag);
        node.push_child(blocks::xyz_object(self.ecf)?.to_node_tagged("ECF")?);
        node.push_child(blocks::llh_object(self.llh)?.to_node_tagged("LLH")?);
        Ok(node)
    }

    /// Parse from an element carrying `ECF` and/or `LLH` children. When
    /// both are present the ECF form is authoritative and the geodetic
    /// sibling is recomputed from it.
    pub fn from_node(node: &XmlElement, mode: ValidationMode) -> MetaResult<Scp> {
        if let Some(ecf_node) = node.find("ECF") {
            let obj = Object::from_node(&blocks::XYZ, ecf_node, mode)?;
            return Ok(Scp::from_ecf(blocks::xyz_array(&obj)?));
        }
        if let Some(llh_node) = node.find("LLH") {
            let obj = Object::from_node(&blocks::LAT_LON_HAE_RESTRICTION, llh_node, mode)?;
            return Scp::from_llh(blocks::llh_array(&obj)?);
        }
        Err(MetaError::MissingRequiredField("ECF|LLH".to_string()))
    }

    pub fn to_map(&self) -> Value {
        serde_json::json!({
            "ECF": {"X": self.ecf[0], "Y": self.ecf[1], "Z": self.ecf[2]},
            "LLH": {"Lat": self.llh[0], "Lon": self.llh[1], "HAE": self.llh[2]},
        })
    }

    pub fn from_map(value: &Value, mode: ValidationMode) -> MetaResult<Scp> {
        let map = value
            .as_object()
            .ok_or_else(|| MetaError::type_mismatch("SCP", "expected a mapping"))?;
        if let Some(ecf) = map.get("ECF") {
            let obj = Object::from_map(&blocks::XYZ, ecf, mode)?;
            return Ok(Scp::from_ecf(blocks::xyz_array(&obj)?));
        }
        if let Some(llh) = map.get("LLH") {
            let obj = Object::from_map(&blocks::LAT_LON_HAE_RESTRICTION, llh, mode)?;
            return Scp::from_llh(blocks::llh_array(&obj)?);
        }
        Err(MetaError::MissingRequiredField("ECF|LLH".to_string()))
    }
}

fn check_llh(llh: [f64; 3]) -> MetaResult<[f64; 3]> {
    if llh[0] < -90.0 || llh[0] > 90.0 {
        return Err(MetaError::RangeViolation {
            field: "Lat".to_string(),
            value: llh[0],
            min: -90.0,
            max: 90.0,
        });
    }
    Ok([llh[0], crate::core::schema::wrap_modular(llh[1], 180.0), llh[2]])
}

/// Schema for one annotation feature: a named point, line, or polygon
/// with optional descriptive text pairs. The geometry members are a
/// mutually exclusive (and entirely optional) choice group.
pub static GEO_INFO: Schema = Schema {
    tag: "GeoInfo",
    fields: &[
        FieldSpec {
            name: "name",
            kind: FieldKind::Text,
            required: true,
            attribute: true,
        },
        FieldSpec {
            name: "Descriptions",
            kind: FieldKind::Params { child_tag: "Desc" },
            required: false,
            attribute: false,
        },
        FieldSpec {
            name: "Point",
            kind: FieldKind::Nested {
                schema: &LAT_LON_RESTRICTION,
            },
            required: false,
            attribute: false,
        },
        FieldSpec {
            name: "Line",
            kind: FieldKind::Array {
                elem: &LAT_LON_ARRAY_ELEMENT,
                child_tag: "Endpoint",
                min_len: 2,
                index: IndexKind::OneBased,
            },
            required: false,
            attribute: false,
        },
        FieldSpec {
            name: "Polygon",
            kind: FieldKind::Array {
                elem: &LAT_LON_ARRAY_ELEMENT,
                child_tag: "Vertex",
                min_len: 3,
                index: IndexKind::OneBased,
            },
            required: false,
            attribute: false,
        },
    ],
    choices: &[ChoiceSpec {
        required: false,
        members: &["Point", "Line", "Polygon"],
    }],
};

/// A named annotation feature plus arbitrarily nested child features.
/// Children live alongside the schema-declared fields, so a feature can
/// group sub-features to any depth.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoInfo {
    obj: Object,
    geo_infos: Vec<GeoInfo>,
}

impl GeoInfo {
    pub fn new(name: &str) -> MetaResult<GeoInfo> {
        GeoInfo::with_mode(name, ValidationMode::Strict)
    }

    pub fn with_mode(name: &str, mode: ValidationMode) -> MetaResult<GeoInfo> {
        let mut obj = Object::with_mode(&GEO_INFO, mode);
        obj.set("name", FieldValue::Text(name.to_string()))?;
        Ok(GeoInfo {
            obj,
            geo_infos: Vec::new(),
        })
    }

    pub fn object(&self) -> &Object {
        &self.obj
    }

    pub fn object_mut(&mut self) -> &mut Object {
        &mut self.obj
    }

    pub fn name(&self) -> Option<&str> {
        self.obj.get_text("name")
    }

    /// Which geometry member is populated, if any.
    pub fn feature_type(&self) -> Option<&'static str> {
        self.obj.active_choice(0)
    }

    pub fn geo_infos(&self) -> &[GeoInfo] {
        &self.geo_infos
    }

    pub fn add_geo_info(&mut self, child: GeoInfo) {
        self.geo_infos.push(child);
    }

    /// All direct children with the given name attribute.
    pub fn get_geo_info<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a GeoInfo> {
        self.geo_infos
            .iter()
            .filter(move |g| g.name() == Some(name))
    }

    pub fn validate(&self) -> MetaResult<()> {
        self.obj.validate()?;
        for child in &self.geo_infos {
            child.validate()?;
        }
        Ok(())
    }

    pub fn to_node(&self) -> MetaResult<XmlElement> {
        let mut node = self.obj.to_node_tagged("GeoInfo")?;
        for child in &self.geo_infos {
            node.push_child(child.to_node()?);
        }
        Ok(node)
    }

    pub fn from_node(node: &XmlElement, mode: ValidationMode) -> MetaResult<GeoInfo> {
        let obj = Object::from_node(&GEO_INFO, node, mode)?;
        let geo_infos = node
            .find_all("GeoInfo")
            .map(|c| GeoInfo::from_node(c, mode))
            .collect::<MetaResult<Vec<_>>>()?;
        Ok(GeoInfo { obj, geo_infos })
    }

    pub fn to_map(&self) -> MetaResult<Value> {
        let mut map = match self.obj.to_map()? {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        if !self.geo_infos.is_empty() {
            map.insert(
                "GeoInfos".to_string(),
                Value::Array(
                    self.geo_infos
                        .iter()
                        .map(|g| g.to_map())
                        .collect::<MetaResult<Vec<_>>>()?,
                ),
            );
        }
        Ok(Value::Object(map))
    }

    pub fn from_map(value: &Value, mode: ValidationMode) -> MetaResult<GeoInfo> {
        let obj = Object::from_map(&GEO_INFO, value, mode)?;
        let geo_infos = match value.get("GeoInfos") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| GeoInfo::from_map(v, mode))
                .collect::<MetaResult<Vec<_>>>()?,
            _ => Vec::new(),
        };
        Ok(GeoInfo { obj, geo_infos })
    }
}

/// Schema for the geographic reference block: earth model, scene center
/// point, the four image corners, and an optional valid-data polygon.
pub static GEO_DATA: Schema = Schema {
    tag: "GeoData",
    fields: &[
        FieldSpec {
            name: "EarthModel",
            kind: FieldKind::EnumText {
                values: &["WGS_84"],
            },
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "SCP",
            kind: FieldKind::Scp,
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "ImageCorners",
            kind: FieldKind::Array {
                elem: &LAT_LON_CORNER_STRING,
                child_tag: "ICP",
                min_len: 4,
                index: IndexKind::CornerStrings,
            },
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "ValidData",
            kind: FieldKind::Array {
                elem: &LAT_LON_ARRAY_ELEMENT,
                child_tag: "Vertex",
                min_len: 3,
                index: IndexKind::OneBased,
            },
            required: false,
            attribute: false,
        },
    ],
    choices: &[],
};

/// The geographic reference block of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoData {
    obj: Object,
    geo_infos: Vec<GeoInfo>,
}

impl GeoData {
    pub fn new() -> GeoData {
        GeoData::with_mode(ValidationMode::Strict)
    }

    pub fn with_mode(mode: ValidationMode) -> GeoData {
        let mut obj = Object::with_mode(&GEO_DATA, mode);
        // the only supported earth model, populated up front
        obj.set("EarthModel", FieldValue::Text("WGS_84".to_string()))
            .unwrap_or_else(|_| unreachable!());
        GeoData {
            obj,
            geo_infos: Vec::new(),
        }
    }

    pub fn object(&self) -> &Object {
        &self.obj
    }

    pub fn object_mut(&mut self) -> &mut Object {
        &mut self.obj
    }

    pub fn scp(&self) -> Option<&Scp> {
        self.obj.get_scp("SCP")
    }

    pub fn set_scp(&mut self, scp: Scp) -> MetaResult<()> {
        self.obj.set("SCP", FieldValue::Scp(scp))
    }

    /// Populate the image corners from `(lat, lon)` pairs in corner-label
    /// order (first-row first-column clockwise).
    pub fn set_image_corners(&mut self, corners: &[(f64, f64)]) -> MetaResult<()> {
        let items = corners
            .iter()
            .map(|&(lat, lon)| blocks::latlon_corner_object(lat, lon))
            .collect::<MetaResult<Vec<_>>>()?;
        self.obj.set("ImageCorners", FieldValue::Array(items))
    }

    pub fn set_valid_data(&mut self, vertices: &[(f64, f64)]) -> MetaResult<()> {
        let items = vertices
            .iter()
            .map(|&(lat, lon)| blocks::latlon_vertex_object(lat, lon))
            .collect::<MetaResult<Vec<_>>>()?;
        self.obj.set("ValidData", FieldValue::Array(items))
    }

    pub fn image_corners(&self) -> Option<&[Object]> {
        self.obj.get_array("ImageCorners")
    }

    pub fn valid_data(&self) -> Option<&[Object]> {
        self.obj.get_array("ValidData")
    }

    pub fn geo_infos(&self) -> &[GeoInfo] {
        &self.geo_infos
    }

    pub fn add_geo_info(&mut self, child: GeoInfo) {
        self.geo_infos.push(child);
    }

    pub fn get_geo_info<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a GeoInfo> {
        self.geo_infos
            .iter()
            .filter(move |g| g.name() == Some(name))
    }

    /// Consistency pass for the geographic block. All fields here are
    /// authoritative inputs, so there is nothing to fill in; the pass
    /// exists so the block participates uniformly in a whole-tree derive.
    pub fn derive(&mut self) {}

    pub fn validate(&self) -> MetaResult<()> {
        self.obj.validate()?;
        for child in &self.geo_infos {
            child.validate()?;
        }
        Ok(())
    }

    pub fn to_node(&self) -> MetaResult<XmlElement> {
        let mut node = self.obj.to_node_tagged("GeoData")?;
        for child in &self.geo_infos {
            node.push_child(child.to_node()?);
        }
        Ok(node)
    }

    pub fn from_node(node: &XmlElement, mode: ValidationMode) -> MetaResult<GeoData> {
        let obj = Object::from_node(&GEO_DATA, node, mode)?;
        let geo_infos = node
            .find_all("GeoInfo")
            .map(|c| GeoInfo::from_node(c, mode))
            .collect::<MetaResult<Vec<_>>>()?;
        Ok(GeoData { obj, geo_infos })
    }

    pub fn to_map(&self) -> MetaResult<Value> {
        let mut map = match self.obj.to_map()? {
            Value::Object(m) => m,
            _ => unreachable!(),
        };
        if !self.geo_infos.is_empty() {
            map.insert(
                "GeoInfos".to_string(),
                Value::Array(
                    self.geo_infos
                        .iter()
                        .map(|g| g.to_map())
                        .collect::<MetaResult<Vec<_>>>()?,
                ),
            );
        }
        Ok(Value::Object(map))
    }

    pub fn from_map(value: &Value, mode: ValidationMode) -> MetaResult<GeoData> {
        let obj = Object::from_map(&GEO_DATA, value, mode)?;
        let geo_infos = match value.get("GeoInfos") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| GeoInfo::from_map(v, mode))
                .collect::<MetaResult<Vec<_>>>()?,
            _ => Vec::new(),
        };
        Ok(GeoData { obj, geo_infos })
    }
}

impl Default for GeoData {
    fn default() -> Self {
        GeoData::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_scp_ecf_drives_llh() {
        // a point on the equator at the prime meridian
        let scp = Scp::from_ecf([6378137.0, 0.0, 0.0]);
        let llh = scp.llh();
        assert_abs_diff_eq!(llh[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(llh[1], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(llh[2], 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_scp_llh_drives_ecf() {
        let mut scp = Scp::from_ecf([6378137.0, 0.0, 0.0]);
        scp.set_llh([45.0, 30.0, 100.0]).unwrap();
        let back = ecf_to_geodetic(scp.ecf());
        assert_abs_diff_eq!(back[0], 45.0, epsilon = 1e-9);
        assert_abs_diff_eq!(back[1], 30.0, epsilon = 1e-9);
        assert_abs_diff_eq!(back[2], 100.0, epsilon = 1e-3);
    }

    #[test]
    fn test_scp_bad_latitude_rejected() {
        assert!(Scp::from_llh([91.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_scp_node_prefers_ecf() {
        let scp = Scp::from_ecf([1000000.0, 2000000.0, 6000000.0]);
        let node = scp.to_node("SCP").unwrap();
        assert!(node.find("ECF").is_some());
        assert!(node.find("LLH").is_some());
        let back = Scp::from_node(&node, ValidationMode::Strict).unwrap();
        // ECF text is written at fixed precision, so agreement is approximate
        for i in 0..3 {
            assert_abs_diff_eq!(back.ecf()[i], scp.ecf()[i], epsilon = 1e-3);
        }
    }

    #[test]
    fn test_scp_map_roundtrip_exact() {
        let scp = Scp::from_ecf([1000000.0, 2000000.0, 6000000.0]);
        let back = Scp::from_map(&scp.to_map(), ValidationMode::Strict).unwrap();
        assert_eq!(back, scp);
    }

    #[test]
    fn test_geo_info_feature_type() {
        let mut gi = GeoInfo::new("target-1").unwrap();
        assert_eq!(gi.feature_type(), None);
        gi.object_mut()
            .set(
                "Point",
                FieldValue::Object(blocks::latlon_object(10.0, 20.0).unwrap()),
            )
            .unwrap();
        assert_eq!(gi.feature_type(), Some("Point"));
    }

    #[test]
    fn test_geo_info_nested_roundtrip() {
        let mut outer = GeoInfo::new("group").unwrap();
        let mut inner = GeoInfo::new("target").unwrap();
        inner
            .object_mut()
            .set(
                "Point",
                FieldValue::Object(blocks::latlon_object(1.0, 2.0).unwrap()),
            )
            .unwrap();
        outer.add_geo_info(inner);

        let node = outer.to_node().unwrap();
        let back = GeoInfo::from_node(&node, ValidationMode::Strict).unwrap();
        assert_eq!(back.geo_infos().len(), 1);
        assert_eq!(back.get_geo_info("target").count(), 1);
        assert_eq!(back.geo_infos()[0].feature_type(), Some("Point"));
    }

    #[test]
    fn test_geo_data_requires_scp_and_corners() {
        let gd = GeoData::new();
        assert!(gd.validate().is_err());
        assert!(gd.to_node().is_err());
    }

    #[test]
    fn test_geo_data_corner_labels() {
        let mut gd = GeoData::new();
        gd.set_scp(Scp::from_ecf([6378137.0, 0.0, 0.0])).unwrap();
        gd.set_image_corners(&[(1.0, 2.0), (1.0, 3.0), (0.0, 3.0), (0.0, 2.0)])
            .unwrap();
        let node = gd.to_node().unwrap();
        let corners = node.find("ImageCorners").unwrap();
        let labels: Vec<_> = corners
            .find_all("ICP")
            .map(|c| c.attr("index").unwrap().to_string())
            .collect();
        assert_eq!(labels, ["1:FRFC", "2:FRLC", "3:LRLC", "4:LRFC"]);
    }
}
