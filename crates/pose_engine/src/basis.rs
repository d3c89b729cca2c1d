//! Fixed basis conversions between the device's frames and the target frames.
//!
//! Device world and camera axes: x left, y up, z backward.
//! Target world: x forward, y left, z up.
//! Target optical frame: x left, y down, z forward.

use nalgebra::Matrix4;

/// Device world basis -> target world basis, row-major
pub const WORLD_CONV: [[f32; 4]; 4] = [
    [0.0, 0.0, -1.0, 0.0],
    [-1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Device camera basis -> target optical basis, row-major
pub const CAM_CONV: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, -1.0, 0.0, 0.0],
    [0.0, 0.0, -1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Build a matrix from a row-major array
pub fn matrix_from_rows(rows: &[[f32; 4]; 4]) -> Matrix4<f32> {
    Matrix4::from_fn(|r, c| rows[r][c])
}

/// Reshape the 16 header floats into the conventional row-major 4x4.
///
/// The device writes the matrix column-major: reshape row-major, then
/// transpose.
pub fn header_matrix(raw: &[f32; 16]) -> Matrix4<f32> {
    Matrix4::from_row_slice(raw).transpose()
}
