// ENC Geometry Objects
// Points, lines and polygons produced by a full load

use serde_json::json;

use super::ObjectType;
use crate::geometry::{GeoPoint, GeoRect};

/// Point object (buoys, lights, soundings, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Priority in the high 32 bits, spatial hash in the low 32
    pub id: u64,
    pub object_type: ObjectType,
    pub position: GeoPoint,
    pub label: String,
    pub param: Option<f64>,
}

/// Line object (contours, tracks, coastlines, ...)
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub id: u64,
    pub object_type: ObjectType,
    pub path: Vec<GeoPoint>,
    pub label: String,
}

/// Area object; the first ring is the outer boundary
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub id: u64,
    pub object_type: ObjectType,
    pub rings: Vec<Vec<GeoPoint>>,
    pub param: Option<f64>,
}

impl Point {
    pub fn bounds(&self) -> GeoRect {
        GeoRect::from_point(self.position)
    }

    /// GeoJSON coordinates: [lon, lat]
    pub fn to_coordinates(&self) -> serde_json::Value {
        json!([self.position.lon, self.position.lat])
    }
}

impl Line {
    pub fn bounds(&self) -> GeoRect {
        GeoRect::from_points(&self.path)
    }

    /// GeoJSON coordinates: [[lon, lat], ...]
    pub fn to_coordinates(&self) -> serde_json::Value {
        json!(ring_coordinates(&self.path))
    }
}

impl Polygon {
    pub fn bounds(&self) -> GeoRect {
        GeoRect::from_points(self.rings.iter().flatten())
    }

    /// GeoJSON coordinates: [[[lon, lat], ...], [...holes...]]
    pub fn to_coordinates(&self) -> serde_json::Value {
        json!(self
            .rings
            .iter()
            .map(|ring| ring_coordinates(ring))
            .collect::<Vec<_>>())
    }
}

fn ring_coordinates(points: &[GeoPoint]) -> Vec<[f64; 2]> {
    points.iter().map(|p| [p.lon, p.lat]).collect()
}

fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Deterministic 32-bit hash of a coordinate; stable across runs and
/// platforms, unlike `std::hash` with a random state
pub fn spatial_hash(p: GeoPoint) -> u32 {
    // +0.0 and -0.0 hash alike
    let lon = if p.lon == 0.0 { 0.0f64 } else { p.lon };
    let lat = if p.lat == 0.0 { 0.0f64 } else { p.lat };
    let h = mix64(lon.to_bits() ^ mix64(lat.to_bits()));
    (h ^ (h >> 32)) as u32
}

/// 64-bit identity/sort key: draw priority over spatial hash
pub fn identity_key(priority: u32, primary: GeoPoint) -> u64 {
    ((priority as u64) << 32) | spatial_hash(primary) as u64
}
