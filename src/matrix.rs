// matrix.rs - column-major 4x4 helpers shared by the projector and renderer

use glam::Mat4;

/// A 4x4 matrix stored column-major, as handed over by the renderer.
pub type Mat4Array = [f32; 16];

pub const IDENTITY: Mat4Array = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Returns `a · b`. Both operands and the result are column-major.
pub fn mult_mat4(a: &Mat4Array, b: &Mat4Array) -> Mat4Array {
    (Mat4::from_cols_array(a) * Mat4::from_cols_array(b)).to_cols_array()
}
