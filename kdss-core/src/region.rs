//! Region geometries: GeoJSON parsing, point containment and the catalog
//! of named default regions.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Embedded GeoJSON for Kajiado county (FAO GAUL level 2, simplified).
pub static KAJIADO_GEOJSON: &str = include_str!("../../fixtures/regions/kajiado.geojson");

/// Name of the region used when the user has not uploaded one.
pub const DEFAULT_REGION_NAME: &str = "Kajiado";

/// Axis-aligned lon/lat box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.west < other.east
            && other.west < self.east
            && self.south < other.north
            && other.south < self.north
    }

    fn extend(&mut self, lon: f64, lat: f64) {
        self.west = self.west.min(lon);
        self.east = self.east.max(lon);
        self.south = self.south.min(lat);
        self.north = self.north.max(lat);
    }
}

/// A polygon with one exterior ring and optional holes, as `[lon, lat]` pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub exterior: Vec<[f64; 2]>,
    pub holes: Vec<Vec<[f64; 2]>>,
}

impl Polygon {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        ring_contains(&self.exterior, lon, lat)
            && !self.holes.iter().any(|hole| ring_contains(hole, lon, lat))
    }
}

/// Even-odd ray casting test.
fn ring_contains(ring: &[[f64; 2]], lon: f64, lat: f64) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let [xi, yi] = ring[i];
        let [xj, yj] = ring[j];
        if (yi > lat) != (yj > lat) && lon < (xj - xi) * (lat - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// A named target area made of one or more polygons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub polygons: Vec<Polygon>,
}

impl Region {
    /// Parse a GeoJSON `Polygon`, `MultiPolygon`, `Feature` or
    /// `FeatureCollection`. Features contribute the union of their polygons.
    pub fn from_geojson(name: &str, text: &str) -> Result<Region, PipelineError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| PipelineError::MalformedInput(format!("{}: invalid JSON: {}", name, e)))?;
        let mut polygons = Vec::new();
        collect_polygons(&value, &mut polygons)?;
        if polygons.is_empty() {
            return Err(PipelineError::MalformedInput(format!(
                "{}: no polygon geometry found",
                name
            )));
        }
        Ok(Region {
            name: name.to_string(),
            polygons,
        })
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        self.polygons.iter().any(|p| p.contains(lon, lat))
    }

    /// Bounding box of all exterior rings.
    pub fn bounds(&self) -> Option<Bounds> {
        let mut points = self.polygons.iter().flat_map(|p| p.exterior.iter());
        let [lon, lat] = *points.next()?;
        let mut bounds = Bounds {
            west: lon,
            south: lat,
            east: lon,
            north: lat,
        };
        for [lon, lat] in points {
            bounds.extend(*lon, *lat);
        }
        Some(bounds)
    }

    /// Stable text identity of the geometry, used as a cache key.
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.name.clone())
    }
}

fn collect_polygons(value: &Value, out: &mut Vec<Polygon>) -> Result<(), PipelineError> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| PipelineError::MalformedInput("GeoJSON object has no type".to_string()))?;
    match kind {
        "FeatureCollection" => {
            let features = value
                .get("features")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    PipelineError::MalformedInput("FeatureCollection has no features".to_string())
                })?;
            for feature in features {
                collect_polygons(feature, out)?;
            }
        }
        "Feature" => match value.get("geometry") {
            Some(Value::Null) | None => {}
            Some(geometry) => collect_polygons(geometry, out)?,
        },
        "Polygon" => {
            let coords = value.get("coordinates").ok_or_else(missing_coordinates)?;
            out.push(parse_polygon(coords)?);
        }
        "MultiPolygon" => {
            let coords = value
                .get("coordinates")
                .and_then(Value::as_array)
                .ok_or_else(missing_coordinates)?;
            for polygon in coords {
                out.push(parse_polygon(polygon)?);
            }
        }
        other => {
            return Err(PipelineError::MalformedInput(format!(
                "unsupported geometry type {}",
                other
            )))
        }
    }
    Ok(())
}

fn missing_coordinates() -> PipelineError {
    PipelineError::MalformedInput("geometry has no coordinates".to_string())
}

fn parse_polygon(coords: &Value) -> Result<Polygon, PipelineError> {
    let rings = coords.as_array().ok_or_else(missing_coordinates)?;
    let mut parsed = rings.iter().map(parse_ring).collect::<Result<Vec<_>, _>>()?;
    if parsed.is_empty() {
        return Err(missing_coordinates());
    }
    let exterior = parsed.remove(0);
    Ok(Polygon {
        exterior,
        holes: parsed,
    })
}

fn parse_ring(ring: &Value) -> Result<Vec<[f64; 2]>, PipelineError> {
    let points = ring.as_array().ok_or_else(missing_coordinates)?;
    let ring = points
        .iter()
        .map(|p| match (p.get(0).and_then(Value::as_f64), p.get(1).and_then(Value::as_f64)) {
            (Some(lon), Some(lat)) => Ok([lon, lat]),
            _ => Err(PipelineError::MalformedInput(format!("bad position {}", p))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if ring.len() < 4 {
        return Err(PipelineError::MalformedInput(format!(
            "linear ring needs at least 4 positions, got {}",
            ring.len()
        )));
    }
    Ok(ring)
}

/// Named administrative regions available without an upload.
pub struct RegionCatalog;

impl RegionCatalog {
    /// Case-insensitive lookup by region name.
    pub fn lookup(name: &str) -> Result<Region, PipelineError> {
        if name.eq_ignore_ascii_case(DEFAULT_REGION_NAME) {
            Region::from_geojson(DEFAULT_REGION_NAME, KAJIADO_GEOJSON)
        } else {
            Err(PipelineError::MalformedInput(format!("unknown region {}", name)))
        }
    }

    pub fn default_region() -> Result<Region, PipelineError> {
        RegionCatalog::lookup(DEFAULT_REGION_NAME)
    }

    pub fn names() -> Vec<&'static str> {
        vec![DEFAULT_REGION_NAME]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE: &str = r#"{"type":"Polygon","coordinates":[[[0,0],[2,0],[2,2],[0,2],[0,0]],[[0.5,0.5],[1,0.5],[1,1],[0.5,1],[0.5,0.5]]]}"#;

    #[test]
    fn test_polygon_with_hole() {
        let region = Region::from_geojson("square", SQUARE).unwrap();
        assert!(region.contains(1.5, 1.5));
        assert!(!region.contains(0.75, 0.75), "point in hole");
        assert!(!region.contains(3.0, 1.0));
    }

    #[test]
    fn test_feature_collection_union() {
        let text = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}},
            {"type":"Feature","properties":{},"geometry":{"type":"MultiPolygon","coordinates":[[[[5,5],[6,5],[6,6],[5,6],[5,5]]]]}}
        ]}"#;
        let region = Region::from_geojson("upload", text).unwrap();
        assert_eq!(region.polygons.len(), 2);
        assert!(region.contains(0.5, 0.5));
        assert!(region.contains(5.5, 5.5));
        let bounds = region.bounds().unwrap();
        assert_eq!(bounds.west, 0.0);
        assert_eq!(bounds.north, 6.0);
    }

    #[test]
    fn test_malformed_geojson() {
        assert!(matches!(
            Region::from_geojson("bad", "{not json"),
            Err(PipelineError::MalformedInput(_))
        ));
        assert!(matches!(
            Region::from_geojson("point", r#"{"type":"Point","coordinates":[1,2]}"#),
            Err(PipelineError::MalformedInput(_))
        ));
        assert!(matches!(
            Region::from_geojson("empty", r#"{"type":"FeatureCollection","features":[]}"#),
            Err(PipelineError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_default_region_is_kajiado() {
        let region = RegionCatalog::default_region().unwrap();
        assert_eq!(region.name, "Kajiado");
        // Kajiado town
        assert!(region.contains(36.78, -1.85));
        // Nairobi CBD lies north of the county
        assert!(!region.contains(36.82, -1.28));
        assert!(RegionCatalog::lookup("kajiado").is_ok());
        assert!(RegionCatalog::lookup("Atlantis").is_err());
    }

    #[test]
    fn test_bounds_intersection() {
        let a = Bounds { west: 0.0, south: 0.0, east: 2.0, north: 2.0 };
        let b = Bounds { west: 1.0, south: 1.0, east: 3.0, north: 3.0 };
        let c = Bounds { west: 5.0, south: 5.0, east: 6.0, north: 6.0 };
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }
}
