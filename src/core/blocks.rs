//! Reusable point schemas shared across the metadata tree: ECF vectors,
//! geodetic points in several restriction/indexing flavors, and pixel
//! row/column pairs.

use crate::core::model::{FieldValue, Object};
use crate::core::schema::{FieldKind, FieldSpec, NumFormat, Schema, CORNER_LABELS};
use crate::types::{MetaError, MetaResult};

const XYZ_FMT: NumFormat = NumFormat::Dec(4);
const LL_FMT: NumFormat = NumFormat::Dec(8);
const HAE_FMT: NumFormat = NumFormat::Dec(6);

/// Earth-centered fixed coordinate triple, meters.
pub static XYZ: Schema = Schema {
    tag: "XYZ",
    fields: &[
        FieldSpec {
            name: "X",
            kind: FieldKind::Double { format: XYZ_FMT },
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "Y",
            kind: FieldKind::Double { format: XYZ_FMT },
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "Z",
            kind: FieldKind::Double { format: XYZ_FMT },
            required: true,
            attribute: false,
        },
    ],
    choices: &[],
};

/// Geodetic latitude/longitude pair, degrees, no range enforcement.
pub static LAT_LON: Schema = Schema {
    tag: "LatLon",
    fields: &[
        FieldSpec {
            name: "Lat",
            kind: FieldKind::Double { format: LL_FMT },
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "Lon",
            kind: FieldKind::Double { format: LL_FMT },
            required: true,
            attribute: false,
        },
    ],
    choices: &[],
};

const LAT_RESTRICTED: FieldKind = FieldKind::BoundedDouble {
    min: -90.0,
    max: 90.0,
    format: LL_FMT,
};
const LON_RESTRICTED: FieldKind = FieldKind::ModularDouble {
    limit: 180.0,
    format: LL_FMT,
};

/// Latitude bounded to [-90, 90], longitude wrapped into (-180, 180].
pub static LAT_LON_RESTRICTION: Schema = Schema {
    tag: "LatLonRestriction",
    fields: &[
        FieldSpec {
            name: "Lat",
            kind: LAT_RESTRICTED,
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "Lon",
            kind: LON_RESTRICTED,
            required: true,
            attribute: false,
        },
    ],
    choices: &[],
};

/// Geodetic point with height above the WGS-84 ellipsoid, meters.
pub static LAT_LON_HAE: Schema = Schema {
    tag: "LatLonHAE",
    fields: &[
        FieldSpec {
            name: "Lat",
            kind: FieldKind::Double { format: LL_FMT },
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "Lon",
            kind: FieldKind::Double { format: LL_FMT },
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "HAE",
            kind: FieldKind::Double { format: HAE_FMT },
            required: true,
            attribute: false,
        },
    ],
    choices: &[],
};

/// Range-restricted geodetic point with ellipsoidal height.
pub static LAT_LON_HAE_RESTRICTION: Schema = Schema {
    tag: "LatLonHAERestriction",
    fields: &[
        FieldSpec {
            name: "Lat",
            kind: LAT_RESTRICTED,
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "Lon",
            kind: LON_RESTRICTED,
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "HAE",
            kind: FieldKind::Double { format: HAE_FMT },
            required: true,
            attribute: false,
        },
    ],
    choices: &[],
};

/// Restricted geodetic point carrying a 1-based positional index
/// attribute, for line endpoints and polygon vertices.
pub static LAT_LON_ARRAY_ELEMENT: Schema = Schema {
    tag: "LatLonArrayElement",
    fields: &[
        FieldSpec {
            name: "Lat",
            kind: LAT_RESTRICTED,
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "Lon",
            kind: LON_RESTRICTED,
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "index",
            kind: FieldKind::Int { bounds: None },
            required: true,
            attribute: true,
        },
    ],
    choices: &[],
};

/// Restricted geodetic point indexed by one of the four fixed image
/// corner labels.
pub static LAT_LON_CORNER_STRING: Schema = Schema {
    tag: "LatLonCorner",
    fields: &[
        FieldSpec {
            name: "Lat",
            kind: LAT_RESTRICTED,
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "Lon",
            kind: LON_RESTRICTED,
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "index",
            kind: FieldKind::EnumText {
                values: &CORNER_LABELS,
            },
            required: true,
            attribute: true,
        },
    ],
    choices: &[],
};

/// Integer pixel row/column pair.
pub static ROW_COL: Schema = Schema {
    tag: "RowCol",
    fields: &[
        FieldSpec {
            name: "Row",
            kind: FieldKind::Int { bounds: None },
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "Col",
            kind: FieldKind::Int { bounds: None },
            required: true,
            attribute: false,
        },
    ],
    choices: &[],
};

/// Pixel row/column pair with a 1-based index attribute.
pub static ROW_COL_ARRAY_ELEMENT: Schema = Schema {
    tag: "RowColArrayElement",
    fields: &[
        FieldSpec {
            name: "Row",
            kind: FieldKind::Int { bounds: None },
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "Col",
            kind: FieldKind::Int { bounds: None },
            required: true,
            attribute: false,
        },
        FieldSpec {
            name: "index",
            kind: FieldKind::Int { bounds: None },
            required: true,
            attribute: true,
        },
    ],
    choices: &[],
};

pub fn xyz_object(ecf: [f64; 3]) -> MetaResult<Object> {
    let mut obj = Object::new(&XYZ);
    obj.set("X", FieldValue::Double(ecf[0]))?;
    obj.set("Y", FieldValue::Double(ecf[1]))?;
    obj.set("Z", FieldValue::Double(ecf[2]))?;
    Ok(obj)
}

pub fn xyz_array(obj: &Object) -> MetaResult<[f64; 3]> {
    let get = |name: &str| {
        obj.get_double(name)
            .ok_or_else(|| MetaError::MissingRequiredField(name.to_string()))
    };
    Ok([get("X")?, get("Y")?, get("Z")?])
}

/// Build a restricted geodetic point with height from `[lat, lon, hae]`.
pub fn llh_object(llh: [f64; 3]) -> MetaResult<Object> {
    let mut obj = Object::new(&LAT_LON_HAE_RESTRICTION);
    obj.set("Lat", FieldValue::Double(llh[0]))?;
    obj.set("Lon", FieldValue::Double(llh[1]))?;
    obj.set("HAE", FieldValue::Double(llh[2]))?;
    Ok(obj)
}

pub fn llh_array(obj: &Object) -> MetaResult<[f64; 3]> {
    let get = |name: &str| {
        obj.get_double(name)
            .ok_or_else(|| MetaError::MissingRequiredField(name.to_string()))
    };
    Ok([get("Lat")?, get("Lon")?, get("HAE")?])
}

pub fn latlon_object(lat: f64, lon: f64) -> MetaResult<Object> {
    let mut obj = Object::new(&LAT_LON_RESTRICTION);
    obj.set("Lat", FieldValue::Double(lat))?;
    obj.set("Lon", FieldValue::Double(lon))?;
    Ok(obj)
}

/// Vertex for an indexed array field; the index is stamped on assignment.
pub fn latlon_vertex_object(lat: f64, lon: f64) -> MetaResult<Object> {
    let mut obj = Object::new(&LAT_LON_ARRAY_ELEMENT);
    obj.set("Lat", FieldValue::Double(lat))?;
    obj.set("Lon", FieldValue::Double(lon))?;
    Ok(obj)
}

/// Corner point for an image-corner array; the corner label is stamped
/// on assignment.
pub fn latlon_corner_object(lat: f64, lon: f64) -> MetaResult<Object> {
    let mut obj = Object::new(&LAT_LON_CORNER_STRING);
    obj.set("Lat", FieldValue::Double(lat))?;
    obj.set("Lon", FieldValue::Double(lon))?;
    Ok(obj)
}

pub fn row_col_object(row: i64, col: i64) -> MetaResult<Object> {
    let mut obj = Object::new(&ROW_COL);
    obj.set("Row", FieldValue::Int(row))?;
    obj.set("Col", FieldValue::Int(col))?;
    Ok(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValidationMode;

    #[test]
    fn test_xyz_roundtrip() {
        let obj = xyz_object([6378137.0, -100.25, 42.0]).unwrap();
        assert_eq!(xyz_array(&obj).unwrap(), [6378137.0, -100.25, 42.0]);
        let node = obj.to_node().unwrap();
        assert_eq!(node.find("X").unwrap().text.as_deref(), Some("6378137.0000"));
    }

    #[test]
    fn test_restricted_latitude_rejected() {
        assert!(latlon_object(91.0, 0.0).is_err());
    }

    #[test]
    fn test_restricted_longitude_wraps() {
        let obj = latlon_object(10.0, 190.0).unwrap();
        assert_eq!(obj.get_double("Lon"), Some(-170.0));
    }

    #[test]
    fn test_llh_node_formats() {
        let obj = llh_object([12.3456789012, -45.0, 120.5]).unwrap();
        let node = obj.to_node().unwrap();
        assert_eq!(
            node.find("Lat").unwrap().text.as_deref(),
            Some("12.34567890")
        );
        assert_eq!(node.find("HAE").unwrap().text.as_deref(), Some("120.500000"));
    }

    #[test]
    fn test_row_col_roundtrip() {
        let obj = row_col_object(128, -4).unwrap();
        let node = obj.to_node().unwrap();
        let back = Object::from_node(&ROW_COL, &node, ValidationMode::Strict).unwrap();
        assert_eq!(back.get_int("Row"), Some(128));
        assert_eq!(back.get_int("Col"), Some(-4));
    }

    #[test]
    fn test_row_col_element_carries_index_attribute() {
        let mut obj = Object::new(&ROW_COL_ARRAY_ELEMENT);
        obj.set("Row", FieldValue::Int(1)).unwrap();
        obj.set("Col", FieldValue::Int(2)).unwrap();
        obj.set("index", FieldValue::Int(3)).unwrap();
        let node = obj.to_node().unwrap();
        assert_eq!(node.attr("index"), Some("3"));
    }

    #[test]
    fn test_llh_node_parse() {
        let obj = llh_object([1.0, 2.0, 3.0]).unwrap();
        let node = obj.to_node().unwrap();
        let back = Object::from_node(&LAT_LON_HAE_RESTRICTION, &node, ValidationMode::Strict)
            .unwrap();
        assert_eq!(llh_array(&back).unwrap(), [1.0, 2.0, 3.0]);
    }
}
