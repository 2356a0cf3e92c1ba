pub mod blocks;
pub mod geocoords;
pub mod geodata;
pub mod model;
pub mod poly;
pub mod radiometric;
pub mod rgazcomp;
pub mod scene;
pub mod schema;

pub use geodata::{GeoData, GeoInfo, Scp};
pub use model::{FieldValue, Object};
pub use poly::{Poly1d, Poly2d, XyzPoly};
pub use radiometric::Radiometric;
pub use rgazcomp::RgAzComp;
pub use schema::Schema;
