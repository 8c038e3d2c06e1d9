//! OBJ file intake for the weld engine

use std::collections::HashMap;
use std::path::Path;

use super::soup::{Corner, Face, MeshSoup};
use crate::error::{CodecError, CodecResult};
use crate::foundation::math::{normalize_or_up, Vec3};

/// Material name for faces declared before any `usemtl`
pub const DEFAULT_MATERIAL: &str = "default";

/// A face corner as written in the file, already 0-based
struct RawCorner {
    vertex: usize,
    texcoord: Option<usize>,
}

struct RawFace {
    corners: Vec<RawCorner>,
    material: usize,
    smooth: bool,
}

/// Reads Wavefront OBJ text into a [`MeshSoup`]
pub struct ObjLoader;

impl ObjLoader {
    /// Load an OBJ file
    pub fn load(path: impl AsRef<Path>) -> CodecResult<MeshSoup> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CodecError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let soup = Self::parse(&text)?;
        log::info!(
            "Loaded {}: {} position(s), {} face(s), {} material(s)",
            path.display(),
            soup.positions.len(),
            soup.faces.len(),
            soup.materials.len()
        );
        Ok(soup)
    }

    /// Parse OBJ text.
    ///
    /// Normals in the file are ignored; face normals come from the first
    /// three corners and vertex normals from the incident faces. Polygons
    /// with more than four corners are split into quads and a closing
    /// triangle around their first corner.
    pub fn parse(text: &str) -> CodecResult<MeshSoup> {
        let mut positions: Vec<[f32; 3]> = Vec::new();
        let mut tex_coords: Vec<[f32; 2]> = Vec::new();
        let mut materials: Vec<String> = Vec::new();
        let mut material_lookup: HashMap<String, usize> = HashMap::new();
        let mut current_material: Option<usize> = None;
        let mut smooth = false;
        let mut faces: Vec<RawFace> = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let number = index + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts[0] {
                "v" => positions.push(parse_floats::<3>(&parts[1..], 3, number, "vertex")?),
                // v defaults to 0 when only u is given
                "vt" => tex_coords.push(parse_floats::<2>(&parts[1..], 1, number, "texture coordinate")?),
                "usemtl" => {
                    let name = parts[1..].join(" ");
                    let next = materials.len();
                    let material = *material_lookup.entry(name.clone()).or_insert(next);
                    if material == next {
                        materials.push(name);
                    }
                    current_material = Some(material);
                }
                "s" => smooth = !matches!(parts.get(1).copied(), Some("off") | Some("0") | None),
                "f" => {
                    if parts.len() < 4 {
                        return Err(obj_error(number, "face with fewer than 3 corners"));
                    }
                    let corners = parts[1..]
                        .iter()
                        .map(|token| parse_corner(token, positions.len(), tex_coords.len(), number))
                        .collect::<CodecResult<Vec<_>>>()?;
                    let material = match current_material {
                        Some(material) => material,
                        None => {
                            let material = materials.len();
                            materials.push(DEFAULT_MATERIAL.to_string());
                            material_lookup.insert(DEFAULT_MATERIAL.to_string(), material);
                            current_material = Some(material);
                            material
                        }
                    };
                    split_polygon(corners, material, smooth, &mut faces);
                }
                _ => {
                    // vn, o, g, mtllib and the rest carry nothing the soup needs
                }
            }
        }

        Ok(Self::build(positions, &tex_coords, materials, faces))
    }

    fn build(
        positions: Vec<[f32; 3]>,
        tex_coords: &[[f32; 2]],
        materials: Vec<String>,
        raw_faces: Vec<RawFace>,
    ) -> MeshSoup {
        let has_uvs = raw_faces
            .iter()
            .flat_map(|f| &f.corners)
            .any(|c| c.texcoord.is_some());
        let point = |i: usize| Vec3::from(positions[i]);

        let mut normal_sums = vec![Vec3::zeros(); positions.len()];
        let faces: Vec<Face> = raw_faces
            .into_iter()
            .map(|raw| {
                let [a, b, c] = [0, 1, 2].map(|k| point(raw.corners[k].vertex));
                let normal = normalize_or_up((b - a).cross(&(c - a)));
                for corner in &raw.corners {
                    normal_sums[corner.vertex] += normal;
                }
                Face {
                    corners: raw
                        .corners
                        .iter()
                        .map(|c| Corner {
                            vertex: c.vertex,
                            colour: None,
                            uvs: if has_uvs {
                                vec![c.texcoord.map_or([0.0, 0.0], |t| tex_coords[t])]
                            } else {
                                Vec::new()
                            },
                        })
                        .collect(),
                    material: raw.material,
                    smooth: raw.smooth,
                    normal: normal.into(),
                }
            })
            .collect();

        MeshSoup {
            normals: normal_sums
                .into_iter()
                .map(|n| -> [f32; 3] { normalize_or_up(n).into() })
                .collect(),
            positions,
            faces,
            materials,
            uv_layers: usize::from(has_uvs),
        }
    }
}

fn obj_error(line: usize, message: impl Into<String>) -> CodecError {
    CodecError::Obj { line, message: message.into() }
}

/// Read up to `N` floats; at least `required` must be present, the rest default to 0
fn parse_floats<const N: usize>(values: &[&str], required: usize, line: usize, what: &str) -> CodecResult<[f32; N]> {
    if values.len() < required {
        return Err(obj_error(line, format!("{what} needs {required} components")));
    }
    let mut out = [0.0; N];
    for (slot, value) in out.iter_mut().zip(values) {
        *slot = value
            .parse()
            .map_err(|_| obj_error(line, format!("invalid {what} component '{value}'")))?;
    }
    Ok(out)
}

/// Resolve a 1-based or negative (relative) OBJ index
fn resolve_index(token: &str, count: usize, line: usize) -> CodecResult<usize> {
    let value: i64 = token
        .parse()
        .map_err(|_| obj_error(line, format!("invalid index '{token}'")))?;
    let resolved = match value {
        v if v > 0 => v - 1,
        v if v < 0 => count as i64 + v,
        _ => return Err(obj_error(line, "index 0 is not valid")),
    };
    usize::try_from(resolved)
        .ok()
        .filter(|i| *i < count)
        .ok_or_else(|| obj_error(line, format!("index {token} out of range ({count} defined)")))
}

fn parse_corner(token: &str, positions: usize, tex_coords: usize, line: usize) -> CodecResult<RawCorner> {
    let mut fields = token.split('/');
    let vertex = resolve_index(fields.next().unwrap_or(""), positions, line)?;
    let texcoord = match fields.next() {
        Some(t) if !t.is_empty() => Some(resolve_index(t, tex_coords, line)?),
        _ => None,
    };
    Ok(RawCorner { vertex, texcoord })
}

/// Split a polygon into quads and at most one triangle sharing corner 0
fn split_polygon(corners: Vec<RawCorner>, material: usize, smooth: bool, faces: &mut Vec<RawFace>) {
    if corners.len() <= 4 {
        faces.push(RawFace { corners, material, smooth });
        return;
    }
    let pick = |indices: &[usize]| -> Vec<RawCorner> {
        indices
            .iter()
            .map(|i| RawCorner { vertex: corners[*i].vertex, texcoord: corners[*i].texcoord })
            .collect()
    };
    let n = corners.len();
    let mut start = 1;
    while start + 1 < n {
        let piece = if start + 2 < n {
            pick(&[0, start, start + 1, start + 2])
        } else {
            pick(&[0, start, start + 1])
        };
        start += piece.len() - 2;
        faces.push(RawFace { corners: piece, material, smooth });
    }
}
