//! Parsed material script records
//!
//! These are the structures the parser produces and the registry stores.
//! They are plain data: every lookup across scripts goes through a
//! [`Registry`](super::Registry) rather than through references between
//! records.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::foundation::math::format_floats;

/// A `<key> <values...>` line kept in declaration order
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Attribute {
    /// First token of the line
    pub key: String,
    /// Remaining tokens
    pub values: Vec<String>,
}

impl Attribute {
    /// Build an attribute from a key and its value tokens
    pub fn new(key: impl Into<String>, values: Vec<String>) -> Self {
        Self { key: key.into(), values }
    }

    /// Values joined by single spaces
    pub fn value_text(&self) -> String {
        self.values.join(" ")
    }

    /// The whole line as written in a script
    pub fn script_line(&self) -> String {
        if self.values.is_empty() {
            self.key.clone()
        } else {
            format!("{} {}", self.key, self.value_text())
        }
    }
}

/// Typed value of a `param_named` line
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramParam {
    /// `float <v>`
    Float(f32),
    /// `float2 <x> <y>`
    Float2([f32; 2]),
    /// `float3 <x> <y> <z>`
    Float3([f32; 3]),
    /// `float4 <x> <y> <z> <w>`
    Float4([f32; 4]),
    /// Any other type, kept as the raw `<type> <values...>` text
    Raw(String),
}

impl ProgramParam {
    /// Parse the `<type> <values...>` tail of a `param_named` line.
    ///
    /// Returns `None` for types other than `float`..`float4`, or when the
    /// values do not parse as the declared number of floats.
    pub fn parse_typed(kind: &str, values: &[&str]) -> Option<Self> {
        let floats: Vec<f32> = values
            .iter()
            .map(|v| v.parse::<f32>())
            .collect::<Result<_, _>>()
            .ok()?;
        match (kind, floats.as_slice()) {
            ("float", [x]) => Some(Self::Float(*x)),
            ("float2", [x, y]) => Some(Self::Float2([*x, *y])),
            ("float3", [x, y, z]) => Some(Self::Float3([*x, *y, *z])),
            ("float4", [x, y, z, w]) => Some(Self::Float4([*x, *y, *z, *w])),
            _ => None,
        }
    }

    /// Type keyword as written in scripts
    pub fn type_token(&self) -> &str {
        match self {
            Self::Float(_) => "float",
            Self::Float2(_) => "float2",
            Self::Float3(_) => "float3",
            Self::Float4(_) => "float4",
            Self::Raw(text) => text.split_whitespace().next().unwrap_or(""),
        }
    }

    /// `<type> <values...>` as it appears after the parameter name
    pub fn to_script(&self) -> String {
        match self {
            Self::Float(v) => format!("float {}", format_floats(&[*v])),
            Self::Float2(v) => format!("float2 {}", format_floats(v)),
            Self::Float3(v) => format!("float3 {}", format_floats(v)),
            Self::Float4(v) => format!("float4 {}", format_floats(v)),
            Self::Raw(text) => text.clone(),
        }
    }
}

/// Reference from a pass to a GPU program, with per-pass parameters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgramRef {
    /// Program name, shared by every script referencing it
    pub name: String,
    /// Parameters set by the referencing pass
    pub params: BTreeMap<String, ProgramParam>,
}

impl ProgramRef {
    /// Reference a program with no parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), params: BTreeMap::new() }
    }
}

/// Kind of program chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramKind {
    /// `vertex_program`
    Vertex,
    /// `fragment_program`
    Fragment,
    /// Any other `<kind>_program` keyword
    Other(String),
}

impl ProgramKind {
    /// Classify a chunk header keyword
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "vertex_program" => Some(Self::Vertex),
            "fragment_program" => Some(Self::Fragment),
            other if other.ends_with("_program") => Some(Self::Other(other.to_string())),
            _ => None,
        }
    }
}

/// A program definition chunk from a `.program` file
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramDefinition {
    /// Program name
    pub name: String,
    /// Vertex, fragment or other
    pub kind: ProgramKind,
    /// Shading language token from the header (`glsl`, `hlsl`, ...)
    pub language: Option<String>,
    /// Declared source file, resolved against the `.program` file's directory
    pub source: Option<PathBuf>,
    /// Entries of the `default_params` block
    pub params: BTreeMap<String, ProgramParam>,
    /// `.program` file the chunk came from
    pub url: PathBuf,
    /// Chunk text as read
    pub text: String,
}

impl ProgramDefinition {
    /// True when the declared source file exists on disk
    pub fn has_source(&self) -> bool {
        self.source.as_ref().is_some_and(|p| p.is_file())
    }
}

/// A `texture_unit` block
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextureUnitSpec {
    /// Unit name; unnamed units get `unit<n>` from their ordinal in the pass
    pub name: String,
    /// `<key> <values...>` lines in declaration order
    pub params: Vec<Attribute>,
}

impl TextureUnitSpec {
    /// Create an empty unit
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), params: Vec::new() }
    }

    /// Tokens of the last line with this key
    pub fn param(&self, key: &str) -> Option<&[String]> {
        self.params
            .iter()
            .rev()
            .find(|a| a.key == key)
            .map(|a| a.values.as_slice())
    }

    /// Texture file, when declared
    pub fn texture(&self) -> Option<&str> {
        self.param("texture").and_then(|v| v.first()).map(String::as_str)
    }
}

/// One `pass` block
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pass {
    /// Pass name (may be empty)
    pub name: String,
    /// `: <parent>/PASS<n>` reference on the pass header
    pub parent: Option<String>,
    /// `vertex_program_ref`
    pub vertex_program_ref: Option<ProgramRef>,
    /// `fragment_program_ref`
    pub fragment_program_ref: Option<ProgramRef>,
    /// Texture units in declaration order
    pub texture_units: Vec<TextureUnitSpec>,
    /// Other pass-level lines in declaration order
    pub attributes: Vec<Attribute>,
    /// Balanced body text from the opening to the closing brace
    pub body: String,
}

impl Pass {
    /// Values of the last attribute with this key
    pub fn attribute(&self, key: &str) -> Option<&[String]> {
        self.attributes
            .iter()
            .rev()
            .find(|a| a.key == key)
            .map(|a| a.values.as_slice())
    }

    /// Program references this pass declares
    pub fn program_refs(&self) -> impl Iterator<Item = &ProgramRef> {
        self.vertex_program_ref.iter().chain(self.fragment_program_ref.iter())
    }
}

/// One `technique` block
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Technique {
    /// Technique name (may be empty)
    pub name: String,
    /// Technique-level lines other than passes
    pub attributes: Vec<Attribute>,
    /// Passes in declaration order
    pub passes: Vec<Pass>,
}

/// A parsed `material` block
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialScript {
    /// Material name, the registry key
    pub name: String,
    /// Inherited material, resolved by name at use time
    pub parent: Option<String>,
    /// Script file the material came from
    pub url: String,
    /// Material-level lines other than techniques
    pub attributes: Vec<Attribute>,
    /// Techniques in declaration order
    pub techniques: Vec<Technique>,
    /// Texture unit names in first-seen order across all passes
    pub texture_units_order: Vec<String>,
}

impl MaterialScript {
    /// Passes of the first technique, the ones ordinal binding and
    /// abstract-pass reconstitution work from
    pub fn primary_passes(&self) -> &[Pass] {
        match self.techniques.first() {
            Some(technique) => &technique.passes,
            None => &[],
        }
    }

    /// All passes of all techniques
    pub fn passes(&self) -> impl Iterator<Item = &Pass> {
        self.techniques.iter().flat_map(|t| t.passes.iter())
    }

    /// Look up a texture unit by name across all passes
    pub fn texture_unit(&self, name: &str) -> Option<&TextureUnitSpec> {
        self.passes()
            .flat_map(|p| p.texture_units.iter())
            .find(|u| u.name == name)
    }

    /// Names of every program referenced by any pass, deduplicated
    pub fn program_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for program in self.passes().flat_map(Pass::program_refs) {
            if !names.contains(&program.name.as_str()) {
                names.push(&program.name);
            }
        }
        names
    }

    /// Recompute `texture_units_order` from the passes
    pub(crate) fn rebuild_texture_order(&mut self) {
        let mut order: Vec<String> = Vec::new();
        for unit in self.techniques.iter().flat_map(|t| &t.passes).flat_map(|p| &p.texture_units) {
            if !order.contains(&unit.name) {
                order.push(unit.name.clone());
            }
        }
        self.texture_units_order = order;
    }
}
