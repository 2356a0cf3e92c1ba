use sicdmeta::core::blocks;
use sicdmeta::{FieldValue, GeoData, GeoInfo, MetaError, Scp, ValidationMode, XmlElement};

fn sample_geodata() -> GeoData {
    let mut geo = GeoData::new();
    // values exactly representable at the declared text precision
    geo.set_scp(Scp::from_ecf([1234567.25, -2345678.5, 5432109.75]))
        .unwrap();
    geo.set_image_corners(&[(1.5, 2.25), (1.5, 3.75), (0.25, 3.75), (0.25, 2.25)])
        .unwrap();
    geo.set_valid_data(&[(1.25, 2.5), (1.25, 3.5), (0.5, 3.0)])
        .unwrap();

    let mut site = GeoInfo::new("site").unwrap();
    site.object_mut()
        .set(
            "Descriptions",
            FieldValue::Params(vec![("OPERATOR".to_string(), "test-range".to_string())]),
        )
        .unwrap();
    let mut target = GeoInfo::new("target-1").unwrap();
    target
        .object_mut()
        .set(
            "Point",
            FieldValue::Object(blocks::latlon_object(1.0, 3.0).unwrap()),
        )
        .unwrap();
    site.add_geo_info(target);
    geo.add_geo_info(site);
    geo
}

#[test]
fn node_roundtrip_preserves_tree() {
    let mut geo = sample_geodata();
    // the geographic block has no derivable fields; the pass changes nothing
    geo.derive();
    let xml = geo.to_node().unwrap().to_xml_string().unwrap();
    let node = XmlElement::parse_str(&xml).unwrap();
    let back = GeoData::from_node(&node, ValidationMode::Strict).unwrap();
    assert_eq!(back, geo);
}

#[test]
fn map_roundtrip_is_exact() {
    let geo = sample_geodata();
    let map = geo.to_map().unwrap();
    let back = GeoData::from_map(&map, ValidationMode::Strict).unwrap();
    assert_eq!(back, geo);
}

#[test]
fn corner_array_serializes_with_labels_in_order() {
    let geo = sample_geodata();
    let node = geo.to_node().unwrap();
    let corners = node.find("ImageCorners").unwrap();
    assert_eq!(corners.attr("size"), Some("4"));
    let labels: Vec<_> = corners
        .find_all("ICP")
        .filter_map(|c| c.attr("index"))
        .collect();
    assert_eq!(labels, ["1:FRFC", "2:FRLC", "3:LRLC", "4:LRFC"]);
}

#[test]
fn vertex_indices_are_one_based() {
    let geo = sample_geodata();
    let node = geo.to_node().unwrap();
    let vertices: Vec<_> = node
        .find("ValidData")
        .unwrap()
        .find_all("Vertex")
        .filter_map(|c| c.attr("index"))
        .collect();
    assert_eq!(vertices, ["1", "2", "3"]);
}

#[test]
fn short_valid_data_fails_strict_serialization() {
    let mut geo = sample_geodata();
    geo.set_valid_data(&[(1.0, 2.0), (1.0, 3.0)]).unwrap();
    match geo.to_node() {
        Err(MetaError::Validation(inner)) => {
            assert!(matches!(*inner, MetaError::ArrayLengthViolation { .. }))
        }
        other => panic!("expected validation failure, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn short_valid_data_serializes_leniently() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut geo = GeoData::with_mode(ValidationMode::Lenient);
    geo.set_scp(Scp::from_ecf([1234567.25, -2345678.5, 5432109.75]))
        .unwrap();
    geo.set_image_corners(&[(1.5, 2.25), (1.5, 3.75), (0.25, 3.75), (0.25, 2.25)])
        .unwrap();
    geo.set_valid_data(&[(1.0, 2.0), (1.0, 3.0)]).unwrap();
    let node = geo.to_node().unwrap();
    assert_eq!(node.find("ValidData").unwrap().find_all("Vertex").count(), 2);
}

#[test]
fn geometry_choice_is_exclusive() {
    let mut gi = GeoInfo::new("bad").unwrap();
    gi.object_mut()
        .set(
            "Point",
            FieldValue::Object(blocks::latlon_object(1.0, 2.0).unwrap()),
        )
        .unwrap();
    let line: Vec<_> = [(0.0, 0.0), (1.0, 1.0)]
        .iter()
        .map(|&(lat, lon)| blocks::latlon_vertex_object(lat, lon).unwrap())
        .collect();
    gi.object_mut().set("Line", FieldValue::Array(line)).unwrap();
    assert!(matches!(
        gi.validate(),
        Err(MetaError::ChoiceViolation(members)) if members == ["Point", "Line"]
    ));
}

#[test]
fn parse_from_handwritten_document() {
    let xml = r#"
        <GeoData>
          <EarthModel>wgs_84</EarthModel>
          <SCP>
            <LLH><Lat>10.0</Lat><Lon>20.0</Lon><HAE>150.0</HAE></LLH>
          </SCP>
          <ImageCorners>
            <ICP index="1:FRFC"><Lat>10.1</Lat><Lon>19.9</Lon></ICP>
            <ICP index="2:FRLC"><Lat>10.1</Lat><Lon>20.1</Lon></ICP>
            <ICP index="3:LRLC"><Lat>9.9</Lat><Lon>20.1</Lon></ICP>
            <ICP index="4:LRFC"><Lat>9.9</Lat><Lon>19.9</Lon></ICP>
          </ImageCorners>
          <GeoInfo name="marker">
            <Desc name="KIND">reflector</Desc>
            <Point><Lat>10.0</Lat><Lon>20.0</Lon></Point>
          </GeoInfo>
        </GeoData>"#;
    let node = XmlElement::parse_str(xml).unwrap();
    let geo = GeoData::from_node(&node, ValidationMode::Strict).unwrap();
    assert!(geo.validate().is_ok());
    // enumerated text is canonicalized on the way in
    assert_eq!(geo.object().get_text("EarthModel"), Some("WGS_84"));
    let scp = geo.scp().unwrap();
    assert_eq!(scp.llh(), [10.0, 20.0, 150.0]);
    let marker = geo.get_geo_info("marker").next().unwrap();
    assert_eq!(marker.feature_type(), Some("Point"));
    assert_eq!(marker.object().param("Descriptions", "KIND"), Some("reflector"));
}
