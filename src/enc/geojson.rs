// ENC GeoJSON Export
// Serializes query results as a GeoJSON FeatureCollection

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::catalogue::{object_acronym, object_codes};
use super::objects::{Line, Point, Polygon};
use super::ObjectType;

/// GeoJSON feature collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub collection_type: String,
    pub features: Vec<GeoJsonFeature>,
}

/// GeoJSON feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoJsonFeature {
    #[serde(rename = "type")]
    pub feature_type: String,
    /// Identity key as a string; 64-bit values don't survive JSON numbers
    pub id: String,
    pub geometry: GeoJsonGeometry,
    pub properties: GeoJsonProperties,
}

/// GeoJSON geometry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoJsonGeometry {
    #[serde(rename = "type")]
    pub geom_type: String,
    pub coordinates: serde_json::Value,
}

/// Feature properties for styling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoJsonProperties {
    /// S57 object class code
    #[serde(rename = "objClass")]
    pub obj_class: u16,
    /// S57 object class acronym (e.g., "SOUNDG", "LIGHTS")
    #[serde(rename = "objAcronym")]
    pub obj_acronym: String,
    /// Class subtype (category attribute, depth level, ...)
    pub subtype: u16,
    /// Layer for styling (e.g., "soundings", "depths", "lights", "buoys")
    pub layer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<f64>,
}

impl GeoJsonProperties {
    fn new(object_type: ObjectType, label: &str, param: Option<f64>) -> Self {
        let class = object_type.class();
        Self {
            obj_class: class,
            obj_acronym: object_acronym(class)
                .map(str::to_string)
                .unwrap_or_else(|| format!("OBJ_{}", class)),
            subtype: object_type.subtype(),
            layer: classify_layer(class).to_string(),
            label: (!label.is_empty()).then(|| label.to_string()),
            param,
        }
    }
}

fn feature(
    id: u64,
    geom_type: &str,
    coordinates: serde_json::Value,
    properties: GeoJsonProperties,
) -> GeoJsonFeature {
    GeoJsonFeature {
        feature_type: "Feature".to_string(),
        id: id.to_string(),
        geometry: GeoJsonGeometry {
            geom_type: geom_type.to_string(),
            coordinates,
        },
        properties,
    }
}

pub fn point_to_geojson(point: &Point) -> GeoJsonFeature {
    feature(
        point.id,
        "Point",
        point.to_coordinates(),
        GeoJsonProperties::new(point.object_type, &point.label, point.param),
    )
}

/// `None` for paths too short to form a LineString
pub fn line_to_geojson(line: &Line) -> Option<GeoJsonFeature> {
    if line.path.len() < 2 {
        return None;
    }
    Some(feature(
        line.id,
        "LineString",
        line.to_coordinates(),
        GeoJsonProperties::new(line.object_type, &line.label, None),
    ))
}

/// `None` when the outer ring is too short to enclose anything
pub fn polygon_to_geojson(polygon: &Polygon) -> Option<GeoJsonFeature> {
    if polygon.rings.first().map_or(true, |ring| ring.len() < 3) {
        return None;
    }
    Some(feature(
        polygon.id,
        "Polygon",
        polygon.to_coordinates(),
        GeoJsonProperties::new(polygon.object_type, "", polygon.param),
    ))
}

/// Query results as one collection: areas first, then lines, then points,
/// each group in draw order
pub fn features_to_geojson(
    points: &[Arc<Point>],
    lines: &[Arc<Line>],
    polygons: &[Arc<Polygon>],
) -> FeatureCollection {
    let mut polygons: Vec<&Polygon> = polygons.iter().map(|p| p.as_ref()).collect();
    polygons.sort_by_key(|p| p.id);
    let mut lines: Vec<&Line> = lines.iter().map(|l| l.as_ref()).collect();
    lines.sort_by_key(|l| l.id);
    let mut points: Vec<&Point> = points.iter().map(|p| p.as_ref()).collect();
    points.sort_by_key(|p| p.id);

    let total = polygons.len() + lines.len() + points.len();
    let mut features = Vec::with_capacity(total);
    features.extend(polygons.into_iter().filter_map(polygon_to_geojson));
    features.extend(lines.into_iter().filter_map(line_to_geojson));
    features.extend(points.into_iter().map(point_to_geojson));

    let skipped = total - features.len();
    if skipped > 0 {
        log::debug!("[ENC] GeoJSON export skipped {} degenerate features", skipped);
    }

    FeatureCollection {
        collection_type: "FeatureCollection".to_string(),
        features,
    }
}

/// Classify feature into a styling layer
fn classify_layer(object_class: u16) -> &'static str {
    use object_codes::*;

    match object_class {
        // Navigation aids
        LIGHTS | FOGSIG => "lights",
        BCNLAT | BCNISD | BCNSAW | BCNSPP | I_BCNLAT => "beacons",
        BOYCAR | BOYLAT | BOYISD | BOYSAW | BOYSPP | BOYINB | I_BOYLAT => "buoys",

        // Depths and soundings
        SOUNDG => "soundings",
        DEPCNT => "depth_contours",
        DEPARE => "depth_areas",

        // Land and shore
        LNDARE | LNDELV | LNDMRK => "land",
        COALNE => "coastline",
        SLCONS => "shoreline",

        // Hazards
        OBSTRN => "obstructions",
        WRECKS => "wrecks",
        UWTROC => "rocks",

        // Infrastructure
        PILBOP => "pilot_boarding",
        BUAARE | BUISGL => "buildings",
        HRBFAC | I_HRBFAC | SMCFAC | MORFAC | I_BERTHS => "harbour",

        // Areas
        ACHARE | ACHBRT | I_ACHARE | I_ACHBRT => "anchorage",
        RESARE | I_RESARE => "restricted_area",
        TSSLPT => "traffic_separation",
        RECTRC | RCRTCL => "routes",

        // Inland waterway marks
        I_DISMAR | I_WTWGAG => "waterway",

        _ => "other",
    }
}
