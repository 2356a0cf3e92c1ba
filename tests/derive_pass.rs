use approx::assert_relative_eq;
use sicdmeta::core::scene::{Grid, GridAxis, ScpCoa, SideOfTrack, Timeline};
use sicdmeta::{Poly1d, Poly2d, Radiometric, RgAzComp, ValidationMode, XmlElement};

fn collection_context() -> (Grid, Timeline, ScpCoa) {
    let grid = Grid {
        row: GridAxis {
            wgt_funct: Some(vec![0.54, 0.77, 1.0, 0.77, 0.54]),
            imp_resp_bw: 0.8861,
            k_ctr: Some(65.3),
            delta_k_coa_const: 0.0,
        },
        col: GridAxis {
            wgt_funct: None,
            imp_resp_bw: 0.7231,
            k_ctr: None,
            delta_k_coa_const: 0.0,
        },
    };
    let timeline = Timeline {
        ipp_poly: Some(Poly1d::from_coefs(vec![0.0, 1686.0])),
    };
    let scpcoa = ScpCoa {
        side_of_track: SideOfTrack::Right,
        slope_ang: 35.2,
        graze_ang: 22.7,
        doppler_cone_ang: 88.4,
        slant_range: 735_210.5,
        scp_time: 4.2,
        arp_vel: [6822.0, -1200.0, 450.0],
    };
    (grid, timeline, scpcoa)
}

#[test]
fn radiometric_family_is_mutually_consistent() {
    let (grid, _, scpcoa) = collection_context();
    let mut rad = Radiometric::new();
    rad.set_sf_poly("SigmaZeroSFPoly", Poly2d::constant(0.035))
        .unwrap();
    rad.derive_parameters(&grid, &scpcoa).unwrap();

    let beta = rad.beta_zero_sf_poly().unwrap().coefs()[[0, 0]];
    let sigma = rad.sigma_zero_sf_poly().unwrap().coefs()[[0, 0]];
    let gamma = rad.gamma_zero_sf_poly().unwrap().coefs()[[0, 0]];
    let rcs = rad.rcs_sf_poly().unwrap().coefs()[[0, 0]];

    let slope_cos = 35.2f64.to_radians().cos();
    let graze_sin = 22.7f64.to_radians().sin();
    assert_relative_eq!(sigma, beta * slope_cos, max_relative = 1e-12);
    assert_relative_eq!(gamma, beta * slope_cos / graze_sin, max_relative = 1e-12);
    // gamma relates to sigma through the grazing angle alone
    assert_relative_eq!(gamma * graze_sin, sigma, max_relative = 1e-12);

    let area_sp = grid.row.weight_noise_factor() * grid.col.weight_noise_factor()
        / (grid.row.imp_resp_bw * grid.col.imp_resp_bw);
    assert_relative_eq!(rcs, beta * area_sp, max_relative = 1e-12);
}

#[test]
fn radiometric_derive_survives_serialization() {
    let (grid, _, scpcoa) = collection_context();
    let mut rad = Radiometric::new();
    rad.set_noise_level(None, Poly2d::constant(1.0)).unwrap();
    rad.set_sf_poly("BetaZeroSFPoly", Poly2d::constant(0.125))
        .unwrap();
    rad.derive_parameters(&grid, &scpcoa).unwrap();

    let map = rad.to_map().unwrap();
    let mut back = Radiometric::from_map(&map, ValidationMode::Strict).unwrap();
    assert_eq!(back, rad);

    // a second pass over the parsed copy changes nothing
    back.derive_parameters(&grid, &scpcoa).unwrap();
    assert_eq!(back, rad);
}

#[test]
fn noise_classification_from_document() {
    let xml = r#"
        <Radiometric>
          <NoiseLevel>
            <NoiseLevelType>relative</NoiseLevelType>
            <NoisePoly order1="0" order2="0">
              <Coef exponent1="0" exponent2="0">1</Coef>
            </NoisePoly>
          </NoiseLevel>
        </Radiometric>"#;
    let node = XmlElement::parse_str(xml).unwrap();
    let rad = Radiometric::from_node(&node, ValidationMode::Strict).unwrap();
    let noise = rad.noise_level().unwrap();
    assert_eq!(noise.get_text("NoiseLevelType"), Some("RELATIVE"));
    assert_eq!(noise.get_poly2("NoisePoly").unwrap().coefs()[[0, 0]], 1.0);
}

#[test]
fn rgazcomp_derive_completes_the_block() {
    let (grid, timeline, scpcoa) = collection_context();
    let mut comp = RgAzComp::new();
    // nothing populated yet, so strict serialization refuses
    assert!(comp.to_node().is_err());

    comp.derive_parameters(&grid, &timeline, &scpcoa).unwrap();
    assert!(comp.validate().is_ok());

    let cone_sin = 88.4f64.to_radians().sin();
    assert_relative_eq!(
        comp.az_sf().unwrap(),
        cone_sin / 735_210.5,
        max_relative = 1e-12
    );

    // KazPoly keeps the IPP polynomial's shape up to a constant factor
    let kaz = comp.kaz_poly().unwrap();
    assert_eq!(kaz.order(), 1);
    assert_relative_eq!(kaz.eval(0.0), 0.0);

    let speed = (6822.0f64 * 6822.0 + 1200.0 * 1200.0 + 450.0 * 450.0).sqrt();
    let factor = -1.0 * 65.3 * speed * cone_sin / (735_210.5 * 1686.0);
    assert_relative_eq!(kaz.eval(1.0), 1686.0 * factor, max_relative = 1e-12);
}

#[test]
fn rgazcomp_node_roundtrip_is_close() {
    let (grid, timeline, scpcoa) = collection_context();
    let mut comp = RgAzComp::new();
    comp.derive_parameters(&grid, &timeline, &scpcoa).unwrap();

    let xml = comp.to_node().unwrap().to_xml_string().unwrap();
    let node = XmlElement::parse_str(&xml).unwrap();
    let back = RgAzComp::from_node(&node, ValidationMode::Strict).unwrap();

    // scalar text carries 10 significant digits
    let rel = (back.az_sf().unwrap() - comp.az_sf().unwrap()).abs()
        / comp.az_sf().unwrap().abs();
    assert!(rel < 1e-9);
}
