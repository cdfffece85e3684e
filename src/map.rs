// map.rs - city map layers read from the data directory
//
// Every layer lives in `<data>/<layer>.json`. The files are loose about
// their root: `{ "buildings": [...] }`, a bare array, or any object whose
// first array-valued field holds the records are all accepted.

use crate::labels::Label;
use anyhow::{Context, Result};
use glam::Vec3;
use image::RgbaImage;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Lowers the base ring of extruded shapes so their floor never fights with
/// the ground layers (world y grows downward).
const FLOOR_OFFSET: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Underlay,
    Field,
    GreenArea,
    Water,
    Parking,
    Road,
    Alley,
    Railway,
    Building,
    DetailedBuilding,
    Government,
    Hospital,
}

impl ShapeKind {
    /// Bottom to top; flat layers later in the list sit slightly higher.
    pub const ALL: [ShapeKind; 12] = [
        ShapeKind::Underlay,
        ShapeKind::Field,
        ShapeKind::GreenArea,
        ShapeKind::Water,
        ShapeKind::Parking,
        ShapeKind::Road,
        ShapeKind::Alley,
        ShapeKind::Railway,
        ShapeKind::Building,
        ShapeKind::DetailedBuilding,
        ShapeKind::Government,
        ShapeKind::Hospital,
    ];

    pub fn file_stem(self) -> &'static str {
        match self {
            ShapeKind::Underlay => "underlays",
            ShapeKind::Field => "fields",
            ShapeKind::GreenArea => "green_areas",
            ShapeKind::Water => "water",
            ShapeKind::Parking => "parkings",
            ShapeKind::Road => "roads",
            ShapeKind::Alley => "alleys",
            ShapeKind::Railway => "railways",
            ShapeKind::Building => "buildings",
            ShapeKind::DetailedBuilding => "detalised_buildings",
            ShapeKind::Government => "governments",
            ShapeKind::Hospital => "hospitals",
        }
    }

    /// Key of the record array inside the layer file.
    pub fn root_key(self) -> &'static str {
        match self {
            ShapeKind::Water => "waters",
            other => other.file_stem(),
        }
    }

    pub fn color(self) -> [u8; 4] {
        match self {
            ShapeKind::Underlay => [242, 239, 233, 255],
            ShapeKind::Field => [226, 236, 200, 255],
            ShapeKind::GreenArea => [190, 226, 170, 255],
            ShapeKind::Water => [160, 200, 240, 255],
            ShapeKind::Parking => [228, 228, 234, 255],
            ShapeKind::Road => [255, 255, 255, 255],
            ShapeKind::Alley => [250, 244, 226, 255],
            ShapeKind::Railway => [150, 150, 160, 255],
            ShapeKind::Building | ShapeKind::DetailedBuilding => [215, 210, 200, 175],
            ShapeKind::Government => [200, 196, 216, 175],
            ShapeKind::Hospital => [240, 202, 200, 175],
        }
    }

    /// Ribbon width for line layers.
    pub fn line_width(self) -> f32 {
        match self {
            ShapeKind::Road => 6.0,
            ShapeKind::Alley => 3.0,
            ShapeKind::Railway => 2.0,
            _ => 1.0,
        }
    }

    /// Height above the ground plane for flat layers, in world units.
    pub fn ground_lift(self) -> f32 {
        let index = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        index as f32 * 0.05
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detail {
    pub down: Vec<Vec3>,
    pub up: Vec<Vec3>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColoredPart {
    pub points: Vec<Vec3>,
    pub color: [u8; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Flat filled polygon.
    Area(Vec<Vec3>),
    /// Prisms given by matching floor and roof rings.
    Extruded(Vec<Detail>),
    /// Pre-modelled faces, each with its own colour.
    Detailed(Vec<ColoredPart>),
    /// Polyline drawn as a flat ribbon.
    Line(Vec<Vec3>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub kind: ShapeKind,
    pub geometry: Geometry,
}

#[derive(Debug, Default)]
pub struct CityMap {
    pub features: Vec<Feature>,
    pub labels: Vec<Label>,
    /// Decoded icons keyed by label type.
    pub icons: HashMap<String, RgbaImage>,
    /// Bytes of the map font, if the data directory ships one.
    pub font: Option<Vec<u8>>,
}

pub const LABELS_STEM: &str = "labels";
pub const MAP_FONT: &str = "YandexSansText-Bold.ttf";

// ---- raw records ----

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Array([f32; 3]),
    Object { x: f32, y: f32, z: f32 },
}

impl RawPoint {
    fn to_vec3(self) -> Vec3 {
        match self {
            RawPoint::Array([x, y, z]) => Vec3::new(x, y, z),
            RawPoint::Object { x, y, z } => Vec3::new(x, y, z),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawColor {
    Array(Vec<u8>),
    Object {
        r: u8,
        g: u8,
        b: u8,
        #[serde(default)]
        a: Option<u8>,
    },
}

impl RawColor {
    fn to_rgba(&self, default: [u8; 4]) -> [u8; 4] {
        match self {
            RawColor::Array(c) => match c.as_slice() {
                [r, g, b] => [*r, *g, *b, default[3]],
                [r, g, b, a, ..] => [*r, *g, *b, *a],
                _ => default,
            },
            RawColor::Object { r, g, b, a } => [*r, *g, *b, a.unwrap_or(default[3])],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawDetail {
    #[serde(default)]
    down_points: Vec<RawPoint>,
    #[serde(default)]
    up_points: Vec<RawPoint>,
    #[serde(default)]
    points: Vec<RawPoint>,
    #[serde(default, alias = "color")]
    clr: Option<RawColor>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFeature {
    #[serde(default)]
    points: Vec<RawPoint>,
    #[serde(default)]
    details: Vec<RawDetail>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    level: Option<f32>,
    location: RawPoint,
}

fn points(raw: &[RawPoint]) -> Vec<Vec3> {
    raw.iter().map(|p| p.to_vec3()).collect()
}

/// Finds the record array of a layer file.
pub fn record_array<'a>(root: &'a Value, key: &str) -> &'a [Value] {
    if let Some(Value::Array(items)) = root.get(key) {
        return items;
    }
    match root {
        Value::Array(items) => items,
        Value::Object(fields) => fields
            .values()
            .find_map(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

/// Converts one layer's records; malformed records are skipped with a warning.
pub fn parse_features(kind: ShapeKind, root: &Value) -> Vec<Feature> {
    let mut out = Vec::new();
    for (i, item) in record_array(root, kind.root_key()).iter().enumerate() {
        let raw: RawFeature = match RawFeature::deserialize(item) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("{}[{}]: skipped ({})", kind.file_stem(), i, e);
                continue;
            }
        };
        let geometry = match kind {
            ShapeKind::Building | ShapeKind::Government | ShapeKind::Hospital => Geometry::Extruded(
                raw.details
                    .iter()
                    .map(|d| Detail {
                        down: d
                            .down_points
                            .iter()
                            .map(|p| p.to_vec3() + Vec3::new(0.0, FLOOR_OFFSET, 0.0))
                            .collect(),
                        up: points(&d.up_points),
                    })
                    .collect(),
            ),
            ShapeKind::DetailedBuilding => Geometry::Detailed(
                raw.details
                    .iter()
                    .map(|d| ColoredPart {
                        points: points(&d.points),
                        color: d
                            .clr
                            .as_ref()
                            .map(|c| c.to_rgba(kind.color()))
                            .unwrap_or(kind.color()),
                    })
                    .collect(),
            ),
            ShapeKind::Road | ShapeKind::Alley | ShapeKind::Railway => Geometry::Line(points(&raw.points)),
            _ => Geometry::Area(points(&raw.points)),
        };
        out.push(Feature { kind, geometry });
    }
    out
}

pub fn parse_labels(root: &Value) -> Vec<Label> {
    let mut out = Vec::new();
    for (i, item) in record_array(root, LABELS_STEM).iter().enumerate() {
        match RawLabel::deserialize(item) {
            Ok(raw) => out.push(Label::new(
                raw.address.unwrap_or_default(),
                raw.name.unwrap_or_default(),
                raw.kind.filter(|k| !k.is_empty()),
                raw.level.unwrap_or(0.0),
                raw.location.to_vec3(),
            )),
            Err(e) => log::warn!("{}[{}]: skipped ({})", LABELS_STEM, i, e),
        }
    }
    out
}

fn read_json(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn read_layer(dir: &Path, stem: &str) -> Option<Value> {
    let path = dir.join(format!("{stem}.json"));
    if !path.exists() {
        log::warn!("layer {} not found at {}", stem, path.display());
        return None;
    }
    match read_json(&path) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("layer {} ignored: {:#}", stem, e);
            None
        }
    }
}

fn load_icon(path: &Path) -> Result<RgbaImage> {
    let img = image::open(path).with_context(|| format!("decoding {}", path.display()))?;
    Ok(img.to_rgba8())
}

/// Loads every layer found in `dir`. Missing or broken layers are logged and
/// left empty; this never fails as a whole.
pub fn load_city_map(dir: &Path) -> CityMap {
    let mut map = CityMap::default();

    for kind in ShapeKind::ALL {
        if let Some(root) = read_layer(dir, kind.file_stem()) {
            let features = parse_features(kind, &root);
            log::info!("{}: {} features", kind.file_stem(), features.len());
            map.features.extend(features);
        }
    }

    if let Some(root) = read_layer(dir, LABELS_STEM) {
        map.labels = parse_labels(&root);
        log::info!("{}: {} labels", LABELS_STEM, map.labels.len());
    }

    for label in &map.labels {
        let Some(kind) = label.kind.as_deref() else {
            continue;
        };
        if map.icons.contains_key(kind) {
            continue;
        }
        match load_icon(&dir.join(format!("{kind}.png"))) {
            Ok(icon) => {
                map.icons.insert(kind.to_string(), icon);
            }
            // Warned once per type: failures are not retried.
            Err(e) => log::warn!("no icon for label type {:?}: {:#}", kind, e),
        }
    }

    let font_path = dir.join(MAP_FONT);
    if font_path.exists() {
        match std::fs::read(&font_path) {
            Ok(bytes) => map.font = Some(bytes),
            Err(e) => log::warn!("map font {} unreadable: {}", font_path.display(), e),
        }
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn record_array_accepts_all_root_shapes() {
        let keyed = json!({ "roads": [1, 2] });
        let bare = json!([1, 2, 3]);
        let other = json!({ "version": 2, "items": [1] });
        let nothing = json!({ "version": 2 });

        assert_eq!(record_array(&keyed, "roads").len(), 2);
        assert_eq!(record_array(&bare, "roads").len(), 3);
        assert_eq!(record_array(&other, "roads").len(), 1);
        assert!(record_array(&nothing, "roads").is_empty());
        assert!(record_array(&Value::Null, "roads").is_empty());
    }

    #[test]
    fn buildings_become_extruded_with_lowered_floor() {
        let root = json!({ "buildings": [{
            "address": "Main st. 1",
            "name": null,
            "details": [{
                "down_points": [[0, 0, 0], [10, 0, 0], [10, 0, 10]],
                "up_points":   [[0, -30, 0], [10, -30, 0], [10, -30, 10]]
            }]
        }]});

        let features = parse_features(ShapeKind::Building, &root);
        assert_eq!(features.len(), 1);
        let Geometry::Extruded(details) = &features[0].geometry else {
            panic!("expected extruded geometry");
        };
        assert_eq!(details[0].down[1], Vec3::new(10.0, FLOOR_OFFSET, 0.0));
        assert_eq!(details[0].up[2], Vec3::new(10.0, -30.0, 10.0));
    }

    #[test]
    fn lines_and_areas_by_kind() {
        let root = json!([{ "name": "Ring road", "points": [[0, 0, 0], [5, 0, 5]] }]);
        let roads = parse_features(ShapeKind::Road, &root);
        assert_eq!(
            roads[0].geometry,
            Geometry::Line(vec![Vec3::ZERO, Vec3::new(5.0, 0.0, 5.0)])
        );

        let water = json!({ "waters": [{ "points": [{ "x": 1, "y": 0, "z": 2 }] }] });
        let water = parse_features(ShapeKind::Water, &water);
        assert_eq!(water[0].geometry, Geometry::Area(vec![Vec3::new(1.0, 0.0, 2.0)]));
    }

    #[test]
    fn detailed_parts_keep_their_colour() {
        let root = json!({ "detalised_buildings": [{ "details": [
            { "points": [[0, 0, 0]], "clr": [10, 20, 30] },
            { "points": [[0, 0, 0]], "clr": { "r": 1, "g": 2, "b": 3, "a": 4 } },
            { "points": [[0, 0, 0]] }
        ]}]});
        let features = parse_features(ShapeKind::DetailedBuilding, &root);
        let Geometry::Detailed(parts) = &features[0].geometry else {
            panic!("expected detailed geometry");
        };
        let colors: Vec<[u8; 4]> = parts.iter().map(|p| p.color).collect();
        assert_eq!(
            colors,
            vec![[10, 20, 30, 175], [1, 2, 3, 4], ShapeKind::DetailedBuilding.color()]
        );
    }

    #[test]
    fn broken_records_are_skipped() {
        let root = json!({ "parkings": [
            { "points": [[0, 0, 0]] },
            { "points": "nope" },
            { "points": [[1, 1, 1]] }
        ]});
        assert_eq!(parse_features(ShapeKind::Parking, &root).len(), 2);
    }

    #[test]
    fn labels_parse_type_and_level() {
        let root = json!({ "labels": [
            { "address": "a", "name": "Cafe", "type": "cafe", "level": 2.5, "location": [1, -2, 3] },
            { "name": "Nowhere", "type": "", "location": { "x": 0, "y": 0, "z": 0 } },
            { "name": "No location" }
        ]});
        let labels = parse_labels(&root);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].kind.as_deref(), Some("cafe"));
        assert_eq!(labels[0].min_zoom, 2.5);
        assert_eq!(labels[0].position, Vec3::new(1.0, -2.0, 3.0));
        assert_eq!(labels[1].kind, None);
        assert_eq!(labels[1].min_zoom, 0.0);
    }

    #[test]
    fn missing_directory_gives_empty_map() {
        let map = load_city_map(Path::new("/definitely/not/a/map/dir"));
        assert!(map.features.is_empty());
        assert!(map.labels.is_empty());
        assert!(map.icons.is_empty());
        assert!(map.font.is_none());
    }

    #[test]
    fn ground_lift_follows_layer_order() {
        assert_eq!(ShapeKind::Underlay.ground_lift(), 0.0);
        assert!(ShapeKind::Water.ground_lift() > ShapeKind::Field.ground_lift());
        assert!(ShapeKind::Road.ground_lift() > ShapeKind::Parking.ground_lift());
    }
}
