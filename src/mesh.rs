// mesh.rs - map features to coloured triangles

use crate::map::{Feature, Geometry, ShapeKind};
use earcutr::earcut;
use glam::{Vec2, Vec3};

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

impl Vertex {
    pub const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// The surface is sRGB, so vertex colours are written linear.
pub fn linear_color(rgba: [u8; 4]) -> [f32; 4] {
    [
        srgb_to_linear(rgba[0]),
        srgb_to_linear(rgba[1]),
        srgb_to_linear(rgba[2]),
        rgba[3] as f32 / 255.0,
    ]
}

/// Builds one vertex list for the whole map. Opaque layers come first and
/// translucent buildings last so blending sees what is behind them.
pub fn build_map_mesh(features: &[Feature]) -> Vec<Vertex> {
    let mut out = Vec::new();
    for kind in ShapeKind::ALL {
        for feature in features.iter().filter(|f| f.kind == kind) {
            tessellate(feature, &mut out);
        }
    }
    out
}

pub fn tessellate(feature: &Feature, out: &mut Vec<Vertex>) {
    let kind = feature.kind;
    let color = linear_color(kind.color());
    // World y grows downward; lifting means subtracting.
    let lift = Vec3::new(0.0, -kind.ground_lift(), 0.0);

    match &feature.geometry {
        Geometry::Area(points) => {
            let lifted: Vec<Vec3> = points.iter().map(|p| *p + lift).collect();
            polygon(&lifted, color, out);
        }
        Geometry::Extruded(details) => {
            for detail in details {
                polygon(&detail.down, color, out);
                polygon(&detail.up, color, out);
                walls(&detail.down, &detail.up, color, out);
            }
        }
        Geometry::Detailed(parts) => {
            for part in parts {
                polygon(&part.points, linear_color(part.color), out);
            }
        }
        Geometry::Line(points) => {
            let lifted: Vec<Vec3> = points.iter().map(|p| *p + lift).collect();
            ribbon(&lifted, kind.line_width(), color, out);
        }
    }
}

fn push_triangle(out: &mut Vec<Vertex>, tri: [Vec3; 3], color: [f32; 4]) {
    for p in tri {
        out.push(Vertex {
            position: p.to_array(),
            color,
        });
    }
}

fn drop_closing_duplicate(points: &[Vec3]) -> &[Vec3] {
    match points {
        [first, .., last] if points.len() > 3 && first.distance_squared(*last) < 1e-12 => {
            &points[..points.len() - 1]
        }
        _ => points,
    }
}

/// Newell normal of a ring; works for any planar orientation.
fn ring_normal(points: &[Vec3]) -> Vec3 {
    let mut n = Vec3::ZERO;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        n.x += (a.y - b.y) * (a.z + b.z);
        n.y += (a.z - b.z) * (a.x + b.x);
        n.z += (a.x - b.x) * (a.y + b.y);
    }
    n
}

/// Triangulates a simple polygon in whatever plane it lies in.
fn polygon(points: &[Vec3], color: [f32; 4], out: &mut Vec<Vertex>) {
    let ring = drop_closing_duplicate(points);
    if ring.len() < 3 {
        return;
    }
    if ring.len() == 3 {
        push_triangle(out, [ring[0], ring[1], ring[2]], color);
        return;
    }

    // Flatten by dropping the axis the polygon faces along.
    let n = ring_normal(ring).abs();
    let flat = |p: &Vec3| -> Vec2 {
        if n.x >= n.y && n.x >= n.z {
            Vec2::new(p.y, p.z)
        } else if n.y >= n.z {
            Vec2::new(p.x, p.z)
        } else {
            Vec2::new(p.x, p.y)
        }
    };
    let coords: Vec<f64> = ring
        .iter()
        .flat_map(|p| {
            let q = flat(p);
            [q.x as f64, q.y as f64]
        })
        .collect();

    let indices = match earcut(&coords, &[], 2) {
        Ok(ix) => ix,
        Err(e) => {
            log::debug!("earcut failed on {}-gon: {:?}", ring.len(), e);
            return;
        }
    };
    for tri in indices.chunks_exact(3) {
        push_triangle(out, [ring[tri[0]], ring[tri[1]], ring[tri[2]]], color);
    }
}

/// Side faces between matching floor and roof rings.
fn walls(down: &[Vec3], up: &[Vec3], color: [f32; 4], out: &mut Vec<Vertex>) {
    let n = down.len().min(up.len());
    if n < 2 {
        return;
    }
    for i in 0..n {
        let j = (i + 1) % n;
        let (p1, p2, p3, p4) = (down[i], down[j], up[j], up[i]);
        push_triangle(out, [p1, p2, p3], color);
        push_triangle(out, [p1, p3, p4], color);
    }
}

/// Flat strip of `width` along a polyline, in the ground plane.
fn ribbon(points: &[Vec3], width: f32, color: [f32; 4], out: &mut Vec<Vertex>) {
    let half = width * 0.5;
    for seg in points.windows(2) {
        let (a, b) = (seg[0], seg[1]);
        let dir = Vec2::new(b.x - a.x, b.z - a.z);
        if dir.length_squared() < 1e-12 {
            continue;
        }
        let side = dir.perp().normalize() * half;
        let offset = Vec3::new(side.x, 0.0, side.y);
        push_triangle(out, [a - offset, b - offset, b + offset], color);
        push_triangle(out, [a - offset, b + offset, a + offset], color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Detail;

    fn feature(kind: ShapeKind, geometry: Geometry) -> Feature {
        Feature { kind, geometry }
    }

    fn square(y: f32) -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, y, 0.0),
            Vec3::new(10.0, y, 0.0),
            Vec3::new(10.0, y, 10.0),
            Vec3::new(0.0, y, 10.0),
        ]
    }

    #[test]
    fn ground_square_is_two_triangles() {
        let mut out = Vec::new();
        tessellate(&feature(ShapeKind::Water, Geometry::Area(square(0.0))), &mut out);
        assert_eq!(out.len(), 6);
        let lift = -ShapeKind::Water.ground_lift();
        assert!(out.iter().all(|v| v.position[1] == lift));
    }

    #[test]
    fn closing_point_is_ignored() {
        let mut ring = square(0.0);
        ring.push(ring[0]);
        let mut out = Vec::new();
        polygon(&ring, [1.0; 4], &mut out);
        assert_eq!(out.len(), 6);
    }

    #[test]
    fn vertical_face_still_triangulates() {
        let wall = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, -5.0, 0.0),
            Vec3::new(0.0, -5.0, 0.0),
        ];
        let mut out = Vec::new();
        polygon(&wall, [1.0; 4], &mut out);
        assert_eq!(out.len(), 6);
    }

    #[test]
    fn box_building_has_floor_roof_and_four_walls() {
        let geometry = Geometry::Extruded(vec![Detail {
            down: square(0.0),
            up: square(-20.0),
        }]);
        let mut out = Vec::new();
        tessellate(&feature(ShapeKind::Building, geometry), &mut out);
        // 2 caps x 2 triangles + 4 walls x 2 triangles
        assert_eq!(out.len(), (4 + 8) * 3);
        assert!(out.iter().all(|v| (v.color[3] - 175.0 / 255.0).abs() < 1e-6));
    }

    #[test]
    fn road_ribbon_has_width() {
        let geometry = Geometry::Line(vec![Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0)]);
        let mut out = Vec::new();
        tessellate(&feature(ShapeKind::Road, geometry), &mut out);
        assert_eq!(out.len(), 6);
        let zs: Vec<f32> = out.iter().map(|v| v.position[2]).collect();
        let spread = zs.iter().cloned().fold(f32::MIN, f32::max) - zs.iter().cloned().fold(f32::MAX, f32::min);
        assert!((spread - ShapeKind::Road.line_width()).abs() < 1e-4);
    }

    #[test]
    fn degenerate_input_yields_nothing() {
        let mut out = Vec::new();
        tessellate(&feature(ShapeKind::Field, Geometry::Area(vec![Vec3::ZERO; 2])), &mut out);
        tessellate(&feature(ShapeKind::Alley, Geometry::Line(vec![Vec3::ZERO, Vec3::ZERO])), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn translucent_layers_are_emitted_last() {
        let features = vec![
            feature(ShapeKind::Hospital, Geometry::Extruded(vec![Detail { down: square(0.0), up: square(-5.0) }])),
            feature(ShapeKind::Underlay, Geometry::Area(square(0.0))),
        ];
        let mesh = build_map_mesh(&features);
        assert_eq!(mesh[0].color, linear_color(ShapeKind::Underlay.color()));
    }

    #[test]
    fn srgb_endpoints() {
        assert_eq!(linear_color([0, 0, 0, 0]), [0.0; 4]);
        assert_eq!(linear_color([255, 255, 255, 255]), [1.0; 4]);
    }
}
