// labels.rs - points of interest and the per-frame visibility pass

use crate::matrix::Mat4Array;
use crate::projector::project;
use glam::Vec3;

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub address: String,
    pub name: String,
    /// Category such as "cafe" or "metro"; selects colour and icon.
    pub kind: Option<String>,
    /// Hidden while the camera zoom is below this.
    pub min_zoom: f32,
    pub position: Vec3,
    pub color: [u8; 3],
}

impl Label {
    pub fn new(
        address: String,
        name: String,
        kind: Option<String>,
        min_zoom: f32,
        position: Vec3,
    ) -> Self {
        let color = color_for_type(kind.as_deref());
        Self {
            address,
            name,
            kind,
            min_zoom,
            position,
            color,
        }
    }

    /// Hover text: the name with the street address under it.
    pub fn tooltip(&self) -> Option<String> {
        match (self.name.is_empty(), self.address.is_empty()) {
            (_, true) => None,
            (true, false) => Some(self.address.clone()),
            (false, false) => Some(format!("{}\n{}", self.name, self.address)),
        }
    }
}

pub fn color_for_type(kind: Option<&str>) -> [u8; 3] {
    match kind.unwrap_or_default() {
        "bar" | "fastfood" | "cafe" | "restaurant" => [224, 129, 58],
        "church" | "flag" | "police" | "school" | "synagogue" | "post" | "factory" => [142, 145, 149],
        "museum" | "landmark" | "theater" => [16, 127, 116],
        "hospital" => [233, 121, 107],
        "spa" => [225, 116, 155],
        "pharmacy" => [13, 160, 0],
        "business" | "office" | "barbershop" | "sports" | "hotel" | "bank" => [112, 123, 230],
        "shop" | "supermarket" | "hypermarket" | "clothes" | "furniture" | "plants" | "zoo" => {
            [12, 127, 170]
        }
        "park" | "stadium" => [59, 156, 88],
        "metro" => [83, 178, 62],
        _ => [255, 255, 255],
    }
}

/// Matrices and viewport of the frame being drawn.
#[derive(Debug, Clone, Copy)]
pub struct FrameView {
    pub projection: Mat4Array,
    pub view: Mat4Array,
    pub width: f32,
    pub height: f32,
    pub zoom: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelPlacement {
    pub x: f32,
    pub y: f32,
    pub visible: bool,
}

impl LabelPlacement {
    const HIDDEN: LabelPlacement = LabelPlacement {
        x: f32::NAN,
        y: f32::NAN,
        visible: false,
    };
}

pub fn place_label(label: &Label, frame: &FrameView) -> LabelPlacement {
    if label.min_zoom > frame.zoom {
        return LabelPlacement::HIDDEN;
    }
    let p = project(
        label.position,
        &frame.projection,
        &frame.view,
        frame.width,
        frame.height,
    );
    LabelPlacement {
        x: p.x,
        y: p.y,
        visible: p.valid && p.depth > -1.0 && p.depth < 1.0,
    }
}

/// Recomputes every placement for this frame. `out` is reused across frames
/// only as an allocation; its previous contents are discarded.
pub fn visibility_pass(labels: &[Label], frame: &FrameView, out: &mut Vec<LabelPlacement>) {
    out.clear();
    out.extend(labels.iter().map(|label| place_label(label, frame)));
}
