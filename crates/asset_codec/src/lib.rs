//! # Asset Codec
//!
//! Material script and mesh geometry codec for renderer asset export.
//!
//! ## Features
//!
//! - **Material Scripts**: Parse `.material` files into structured records
//! - **Program Registry**: Index scripts and GPU program definitions by name
//! - **Script Generation**: Emit scripts from an in-memory material graph,
//!   including inheritance through abstract passes
//! - **Vertex Welding**: Merge face corners into a shared vertex buffer with
//!   per-material submeshes
//! - **Indexed Geometry**: Write welded meshes as mesh XML
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use asset_codec::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut report = ExportReport::new();
//!     let registry = Registry::load("assets/materials", &mut report)?;
//!
//!     if let Some(script) = registry.script("Rock") {
//!         let graph = MaterialGraph::from_script(script);
//!         let text = generate(&graph, &registry, &GeneratorOptions::default(), &mut report)?;
//!         println!("{text}");
//!     }
//!
//!     let soup = ObjLoader::load("assets/models/rock.obj")?;
//!     let mesh = weld(&soup, &WeldOptions::default())?;
//!     println!("{}", write_mesh_xml(&mesh)?);
//!     print!("{report}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod error;
pub mod report;
pub mod script;
pub mod geometry;

#[cfg(test)]
mod tests;

pub use error::{CodecError, CodecResult};
pub use report::{ExportReport, ExportWarning};

/// Common imports for codec users
pub mod prelude {
    pub use crate::{
        CodecError, CodecResult, ExportReport, ExportWarning,
        config::{CodecConfig, Config, ConfigError},
        geometry::{
            weld, write_mesh_xml, MeshSoup, ObjLoader, QuadPolicy, SignatureStrategy, WeldOptions,
            WeldedMesh,
        },
        script::{
            generate, GeneratorOptions, MaterialGraph, MaterialNode, MaterialScript, Registry,
            ScriptParser,
        },
    };
}
