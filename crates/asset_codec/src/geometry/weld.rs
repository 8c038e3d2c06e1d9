//! Vertex weld engine
//!
//! Turns a face-corner mesh into a shared vertex buffer plus one index list
//! per material. Corners of the same original vertex are merged when their
//! signatures match; corners of different original vertices never are.
//!
//! Each original vertex keeps a short list of `(signature, welded index)`
//! pairs, so a lookup only ever compares against the splits of that one
//! vertex. Float components are compared by bit pattern.

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::soup::{Corner, Face, MeshSoup};
use crate::error::{CodecError, CodecResult};
use crate::foundation::math::canonical_bits_array;

/// Submesh name used when a face's material index has no name
pub const MISSING_MATERIAL: &str = "_missing_material_";

/// Which corner attributes decide whether two corners weld
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignatureStrategy {
    /// Position, normal and material index
    #[default]
    PositionAware,
    /// Normal only
    AttributeOnly,
}

bitflags! {
    /// Attributes included in a corner signature
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SignatureFields: u8 {
        /// Vertex position
        const POSITION = 1 << 0;
        /// Corner normal
        const NORMAL = 1 << 1;
        /// Face material index
        const MATERIAL = 1 << 2;
        /// Vertex colour
        const COLOR = 1 << 3;
        /// Every UV layer
        const UV = 1 << 4;
    }
}

impl SignatureStrategy {
    /// Resolve to a field set; colour and UVs join whenever the mesh has them
    pub fn fields(self, has_colours: bool, has_uvs: bool) -> SignatureFields {
        let mut fields = match self {
            Self::PositionAware => SignatureFields::POSITION | SignatureFields::NORMAL | SignatureFields::MATERIAL,
            Self::AttributeOnly => SignatureFields::NORMAL,
        };
        fields.set(SignatureFields::COLOR, has_colours);
        fields.set(SignatureFields::UV, has_uvs);
        fields
    }
}

/// What to do with the fourth corner of a quad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuadPolicy {
    /// Emit only triangle (0, 1, 2); the fourth corner is still welded
    #[default]
    DropFourthCorner,
    /// Emit (0, 1, 2) and (0, 2, 3)
    Fan,
}

/// Options for one weld run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WeldOptions {
    /// Signature strategy
    pub strategy: SignatureStrategy,
    /// Quad handling
    pub quads: QuadPolicy,
}

/// An output vertex
#[derive(Debug, Clone, PartialEq)]
pub struct WeldedVertex {
    /// Position
    pub position: [f32; 3],
    /// Normal
    pub normal: [f32; 3],
    /// Diffuse colour
    pub colour: Option<[f32; 4]>,
    /// One coordinate per UV layer
    pub uvs: Vec<[f32; 2]>,
}

/// Append-only vertex storage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexBuffer {
    vertices: Vec<WeldedVertex>,
}

impl VertexBuffer {
    /// Append a vertex and return its index
    fn push(&mut self, vertex: WeldedVertex) -> CodecResult<u32> {
        let index = u32::try_from(self.vertices.len())
            .map_err(|_| CodecError::InvalidMesh("vertex buffer exceeds 32-bit indices".to_string()))?;
        self.vertices.push(vertex);
        Ok(index)
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Vertex by index
    pub fn get(&self, index: u32) -> Option<&WeldedVertex> {
        self.vertices.get(index as usize)
    }

    /// Vertices in buffer order
    pub fn iter(&self) -> std::slice::Iter<'_, WeldedVertex> {
        self.vertices.iter()
    }
}

/// Triangles sharing one material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submesh {
    /// Material index
    pub material_index: u32,
    /// Material name
    pub material_name: String,
    /// Index triples into the shared vertex buffer
    pub faces: Vec<[u32; 3]>,
    /// Always true; every submesh indexes the shared buffer
    pub uses_shared_vertices: bool,
}

impl Submesh {
    /// Number of triangles
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

/// Result of a weld run
#[derive(Debug, Clone, PartialEq)]
pub struct WeldedMesh {
    /// Shared vertices
    pub vertices: VertexBuffer,
    /// Submeshes in ascending material index
    pub submeshes: Vec<Submesh>,
}

impl WeldedMesh {
    /// Triangles across all submeshes
    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(Submesh::face_count).sum()
    }
}

/// Exact corner identity under a field set
#[derive(Debug, Clone, PartialEq, Eq)]
struct Signature {
    position: Option<[u32; 3]>,
    normal: Option<[u32; 3]>,
    material: Option<u32>,
    colour: Option<[u32; 4]>,
    uvs: Vec<[u32; 2]>,
}

struct Welder<'m> {
    mesh: &'m MeshSoup,
    fields: SignatureFields,
    has_colours: bool,
    splits: Vec<Vec<(Signature, u32)>>,
    buffer: VertexBuffer,
}

impl<'m> Welder<'m> {
    fn new(mesh: &'m MeshSoup, strategy: SignatureStrategy) -> Self {
        let has_colours = mesh.has_colours();
        Self {
            mesh,
            fields: strategy.fields(has_colours, mesh.uv_layers > 0),
            has_colours,
            splits: vec![Vec::new(); mesh.positions.len()],
            buffer: VertexBuffer::default(),
        }
    }

    fn corner_vertex(&self, face: &Face, corner: &Corner) -> WeldedVertex {
        let normal = if face.smooth {
            self.mesh.normals[corner.vertex]
        } else {
            face.normal
        };
        WeldedVertex {
            position: self.mesh.positions[corner.vertex],
            normal,
            colour: self
                .has_colours
                .then(|| corner.colour.unwrap_or([1.0, 1.0, 1.0, 1.0])),
            uvs: corner.uvs.clone(),
        }
    }

    fn signature(&self, vertex: &WeldedVertex, material: u32) -> Signature {
        let f = self.fields;
        Signature {
            position: f
                .contains(SignatureFields::POSITION)
                .then(|| canonical_bits_array(&vertex.position)),
            normal: f
                .contains(SignatureFields::NORMAL)
                .then(|| canonical_bits_array(&vertex.normal)),
            material: f.contains(SignatureFields::MATERIAL).then_some(material),
            colour: vertex
                .colour
                .filter(|_| f.contains(SignatureFields::COLOR))
                .map(|c| canonical_bits_array(&c)),
            uvs: if f.contains(SignatureFields::UV) {
                vertex.uvs.iter().map(canonical_bits_array).collect()
            } else {
                Vec::new()
            },
        }
    }

    fn weld_corner(&mut self, face: &Face, material: u32, corner: &Corner) -> CodecResult<u32> {
        let vertex = self.corner_vertex(face, corner);
        let signature = self.signature(&vertex, material);

        if let Some((_, index)) = self.splits[corner.vertex].iter().find(|(s, _)| *s == signature) {
            return Ok(*index);
        }
        let index = self.buffer.push(vertex)?;
        self.splits[corner.vertex].push((signature, index));
        Ok(index)
    }
}

/// Weld a mesh soup into a shared vertex buffer and per-material submeshes.
///
/// Every corner is welded, including a quad's fourth corner under
/// [`QuadPolicy::DropFourthCorner`], so the buffer length does not depend
/// on the quad policy.
pub fn weld(mesh: &MeshSoup, options: &WeldOptions) -> CodecResult<WeldedMesh> {
    mesh.validate()?;

    let mut welder = Welder::new(mesh, options.strategy);
    let mut triangles: BTreeMap<u32, Vec<[u32; 3]>> = BTreeMap::new();

    for face in &mesh.faces {
        let material = u32::try_from(face.material)
            .map_err(|_| CodecError::InvalidMesh(format!("material index {}", face.material)))?;
        let indices = face
            .corners
            .iter()
            .map(|corner| welder.weld_corner(face, material, corner))
            .collect::<CodecResult<Vec<u32>>>()?;

        let list = triangles.entry(material).or_default();
        list.push([indices[0], indices[1], indices[2]]);
        if indices.len() == 4 && options.quads == QuadPolicy::Fan {
            list.push([indices[0], indices[2], indices[3]]);
        }
    }

    let submeshes: Vec<Submesh> = triangles
        .into_iter()
        .map(|(material_index, faces)| Submesh {
            material_index,
            material_name: mesh
                .materials
                .get(material_index as usize)
                .cloned()
                .unwrap_or_else(|| MISSING_MATERIAL.to_string()),
            faces,
            uses_shared_vertices: true,
        })
        .collect();

    log::debug!(
        "Welded {} corner(s) of {} vertex(es) into {} vertex(es), {} submesh(es)",
        mesh.corner_count(),
        mesh.positions.len(),
        welder.buffer.len(),
        submeshes.len()
    );
    Ok(WeldedMesh { vertices: welder.buffer, submeshes })
}
