// Geographic primitives shared by the vector and raster engines

use serde::{Deserialize, Serialize};

/// A point in WGS84 geographic coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

/// Axis aligned rectangle in longitude/latitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoRect {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Default for GeoRect {
    fn default() -> Self {
        Self::empty()
    }
}

impl GeoRect {
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Self {
        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// The whole lon/lat domain
    pub fn world() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }

    /// An inverted rectangle that any union replaces
    pub fn empty() -> Self {
        Self::new(f64::MAX, f64::MAX, f64::MIN, f64::MIN)
    }

    pub fn from_point(p: GeoPoint) -> Self {
        Self::new(p.lon, p.lat, p.lon, p.lat)
    }

    /// Bounding box of a point sequence (empty for no points)
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a GeoPoint>) -> Self {
        points
            .into_iter()
            .fold(Self::empty(), |rect, p| rect.union_point(*p))
    }

    pub fn is_empty(&self) -> bool {
        self.min_lon > self.max_lon || self.min_lat > self.max_lat
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn union(&self, other: &GeoRect) -> Self {
        Self::new(
            self.min_lon.min(other.min_lon),
            self.min_lat.min(other.min_lat),
            self.max_lon.max(other.max_lon),
            self.max_lat.max(other.max_lat),
        )
    }

    pub fn union_point(&self, p: GeoPoint) -> Self {
        self.union(&Self::from_point(p))
    }

    pub fn intersects(&self, other: &GeoRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min_lon <= other.max_lon
            && other.min_lon <= self.max_lon
            && self.min_lat <= other.max_lat
            && other.min_lat <= self.max_lat
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        p.lon >= self.min_lon && p.lon <= self.max_lon && p.lat >= self.min_lat && p.lat <= self.max_lat
    }

    /// Usable dataset extent: finite, inside the lon/lat domain, not
    /// inverted and not collapsed to a single point
    pub fn is_valid(&self) -> bool {
        let finite = [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
            .iter()
            .all(|v| v.is_finite());
        finite
            && !self.is_empty()
            && self.min_lon >= -180.0
            && self.max_lon <= 180.0
            && self.min_lat >= -90.0
            && self.max_lat <= 90.0
            && (self.min_lon != self.max_lon || self.min_lat != self.max_lat)
    }

    /// [min_lon, min_lat, max_lon, max_lat]
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }
}

impl std::str::FromStr for GeoRect {
    type Err = String;

    /// Parse "min_lon,min_lat,max_lon,max_lat"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: Vec<f64> = s
            .split(',')
            .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{}': {}", v, e)))
            .collect::<Result<_, _>>()?;
        match values.as_slice() {
            &[min_lon, min_lat, max_lon, max_lat] => {
                Ok(Self::new(min_lon, min_lat, max_lon, max_lat))
            }
            _ => Err(format!("expected 4 comma separated values, got {}", values.len())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_from_points() {
        let points = [
            GeoPoint { lat: 10.0, lon: 20.0 },
            GeoPoint { lat: 30.0, lon: 40.0 },
            GeoPoint { lat: 20.0, lon: 30.0 },
        ];
        let rect = GeoRect::from_points(&points);
        assert_eq!(rect.to_array(), [20.0, 10.0, 40.0, 30.0]);
        assert!(GeoRect::from_points(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_rect_validity() {
        assert!(GeoRect::new(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(GeoRect::new(0.0, 0.0, 1.0, 0.0).is_valid());
        assert!(!GeoRect::new(1.0, 1.0, 1.0, 1.0).is_valid());
        assert!(!GeoRect::new(2.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!GeoRect::new(0.0, 0.0, 190.0, 1.0).is_valid());
        assert!(!GeoRect::new(0.0, f64::NAN, 1.0, 1.0).is_valid());
        assert!(!GeoRect::empty().is_valid());
    }

    #[test]
    fn test_rect_intersects() {
        let a = GeoRect::new(0.0, 0.0, 1.0, 1.0);
        assert!(a.intersects(&GeoRect::new(1.0, 1.0, 2.0, 2.0)));
        assert!(!a.intersects(&GeoRect::new(1.5, 0.0, 2.0, 1.0)));
        assert!(!a.intersects(&GeoRect::empty()));
    }

    #[test]
    fn test_parse_bbox() {
        let rect: GeoRect = "-10, 20.5,10,30".parse().unwrap();
        assert_eq!(rect.to_array(), [-10.0, 20.5, 10.0, 30.0]);
        assert!("1,2,3".parse::<GeoRect>().is_err());
        assert!("a,b,c,d".parse::<GeoRect>().is_err());
    }
}
