//! Math utilities and types
//!
//! Provides the vector aliases used by the material graph and the OBJ intake,
//! plus the float helpers shared by the weld signature and the text writers.

pub use nalgebra::Vector3;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// Bit pattern of a float for exact equality and hashing.
///
/// `-0.0` is folded onto `0.0` so that a sign flip on a zero component
/// does not split an otherwise identical vertex.
#[inline]
pub fn canonical_bits(value: f32) -> u32 {
    if value == 0.0 {
        0.0f32.to_bits()
    } else {
        value.to_bits()
    }
}

/// Bit patterns of a fixed-size float array
#[inline]
pub fn canonical_bits_array<const N: usize>(values: &[f32; N]) -> [u32; N] {
    values.map(canonical_bits)
}

/// Format a float for script and XML output.
///
/// Six decimal places at most, trailing zeros removed: `1.0` becomes `1`,
/// `0.25` stays `0.25`, `0.080000006` becomes `0.08`.
pub fn format_float(value: f32) -> String {
    let text = format!("{value:.6}");
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Format a list of floats separated by single spaces
pub fn format_floats(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| format_float(*v))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a vector, falling back to +Y for degenerate input
pub fn normalize_or_up(v: Vec3) -> Vec3 {
    v.try_normalize(f32::EPSILON).unwrap_or_else(|| Vec3::new(0.0, 1.0, 0.0))
}
