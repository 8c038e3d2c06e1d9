//! Unwelded input mesh

use crate::error::{CodecError, CodecResult};

/// One face corner
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Corner {
    /// Index into [`MeshSoup::positions`]
    pub vertex: usize,
    /// Vertex colour, when the mesh carries colours
    pub colour: Option<[f32; 4]>,
    /// One coordinate per UV layer
    pub uvs: Vec<[f32; 2]>,
}

impl Corner {
    /// Corner referencing a vertex with no colour or UVs
    pub fn new(vertex: usize) -> Self {
        Self { vertex, colour: None, uvs: Vec::new() }
    }

    /// Add a UV coordinate for the next layer
    pub fn with_uv(mut self, uv: [f32; 2]) -> Self {
        self.uvs.push(uv);
        self
    }

    /// Set the vertex colour
    pub fn with_colour(mut self, colour: [f32; 4]) -> Self {
        self.colour = Some(colour);
        self
    }
}

/// A triangle or quad
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// 3 or 4 corners in winding order
    pub corners: Vec<Corner>,
    /// Index into [`MeshSoup::materials`]
    pub material: usize,
    /// Smooth faces take the vertex normal, flat faces the face normal
    pub smooth: bool,
    /// Face normal
    pub normal: [f32; 3],
}

impl Face {
    /// Flat face over plain corners
    pub fn new(vertices: &[usize], material: usize, normal: [f32; 3]) -> Self {
        Self {
            corners: vertices.iter().map(|v| Corner::new(*v)).collect(),
            material,
            smooth: false,
            normal,
        }
    }

    /// Mark the face smooth
    pub fn smooth(mut self) -> Self {
        self.smooth = true;
        self
    }
}

/// Positions, per-vertex normals and faces as handed over by an exporter
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshSoup {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Smooth vertex normals, parallel to `positions`
    pub normals: Vec<[f32; 3]>,
    /// Faces
    pub faces: Vec<Face>,
    /// Material names by index
    pub materials: Vec<String>,
    /// Number of UV layers every corner carries
    pub uv_layers: usize,
}

impl MeshSoup {
    /// True when any corner carries a colour
    pub fn has_colours(&self) -> bool {
        self.faces
            .iter()
            .flat_map(|f| &f.corners)
            .any(|c| c.colour.is_some())
    }

    /// Total number of face corners
    pub fn corner_count(&self) -> usize {
        self.faces.iter().map(|f| f.corners.len()).sum()
    }

    /// Check the invariants the weld engine relies on
    pub fn validate(&self) -> CodecResult<()> {
        if self.normals.len() != self.positions.len() {
            return Err(CodecError::InvalidMesh(format!(
                "{} normals for {} positions",
                self.normals.len(),
                self.positions.len()
            )));
        }
        for (index, face) in self.faces.iter().enumerate() {
            if !(3..=4).contains(&face.corners.len()) {
                return Err(CodecError::InvalidMesh(format!(
                    "face {index} has {} corners",
                    face.corners.len()
                )));
            }
            if u32::try_from(face.material).is_err() {
                return Err(CodecError::InvalidMesh(format!(
                    "face {index} material index {} does not fit 32 bits",
                    face.material
                )));
            }
            for corner in &face.corners {
                if corner.vertex >= self.positions.len() {
                    return Err(CodecError::InvalidMesh(format!(
                        "face {index} references vertex {} of {}",
                        corner.vertex,
                        self.positions.len()
                    )));
                }
                if corner.uvs.len() != self.uv_layers {
                    return Err(CodecError::InvalidMesh(format!(
                        "face {index} corner has {} UVs, mesh declares {} layer(s)",
                        corner.uvs.len(),
                        self.uv_layers
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_soup() -> MeshSoup {
        MeshSoup {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            faces: vec![Face::new(&[0, 1, 2], 0, [0.0, 0.0, 1.0])],
            materials: vec!["Default".to_string()],
            uv_layers: 0,
        }
    }

    #[test]
    fn test_valid_soup() {
        let soup = triangle_soup();
        assert!(soup.validate().is_ok());
        assert_eq!(soup.corner_count(), 3);
        assert!(!soup.has_colours());
    }

    #[test]
    fn test_invalid_soups() {
        let mut pentagon = triangle_soup();
        pentagon.faces[0] = Face::new(&[0, 1, 2, 0, 1], 0, [0.0, 0.0, 1.0]);
        assert!(matches!(pentagon.validate(), Err(CodecError::InvalidMesh(_))));

        let mut out_of_range = triangle_soup();
        out_of_range.faces[0].corners[2].vertex = 3;
        assert!(matches!(out_of_range.validate(), Err(CodecError::InvalidMesh(_))));

        let mut uv_mismatch = triangle_soup();
        uv_mismatch.uv_layers = 1;
        assert!(matches!(uv_mismatch.validate(), Err(CodecError::InvalidMesh(_))));

        let mut normals = triangle_soup();
        normals.normals.pop();
        assert!(normals.validate().is_err());
    }
}
