//! Mesh geometry
//!
//! Face-corner meshes ([`MeshSoup`]) come in from an exporter or the OBJ
//! loader, get welded into a shared vertex buffer with per-material
//! submeshes, and go out as indexed geometry XML.

pub mod obj;
pub mod soup;
pub mod weld;
pub mod xml;

pub use obj::ObjLoader;
pub use soup::{Corner, Face, MeshSoup};
pub use weld::{
    weld, QuadPolicy, SignatureFields, SignatureStrategy, Submesh, VertexBuffer, WeldOptions,
    WeldedMesh, WeldedVertex, MISSING_MATERIAL,
};
pub use xml::write_mesh_xml;
