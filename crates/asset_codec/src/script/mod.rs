//! Material scripts
//!
//! Parsing of `.material` and `.program` files, the name-keyed registry built
//! from a script directory, and generation of new scripts from a
//! [`MaterialGraph`].

pub mod generator;
pub mod graph;
pub mod model;
pub mod parser;
pub mod program;
pub mod registry;
pub mod render_state;

pub use generator::{generate, GeneratorOptions};
pub use graph::{
    AddressMode, BlendType, Inheritance, MaterialGraph, MaterialNode, TextureNode, TextureSlot,
    VertexColourChannels,
};
pub use model::{
    Attribute, MaterialScript, Pass, ProgramDefinition, ProgramKind, ProgramParam, ProgramRef,
    Technique, TextureUnitSpec,
};
pub use parser::ScriptParser;
pub use program::ProgramParser;
pub use registry::{scan_directory, ProgramResolution, Registry, ScanResult};
pub use render_state::{BlendFactor, RenderState, SceneBlend, SceneBlendSetting};
