//! In-memory material graph consumed by the generator
//!
//! A [`MaterialGraph`] is a root [`MaterialNode`] plus ordered extra pass
//! nodes. Hosts build one from their own scene data; [`MaterialGraph::from_script`]
//! builds one from a parsed script so registered materials can be regenerated.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::model::{Attribute, MaterialScript, Pass, ProgramRef, TextureUnitSpec};
use super::render_state::RenderState;
use crate::foundation::math::{format_float, Vec3};

/// How a classic texture slot combines with what is below it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendType {
    /// Plain mix; alpha and stencil flags refine the operation
    #[default]
    Mix,
    /// Additive
    Add,
    /// Multiply
    Multiply,
    /// Screen
    Screen,
    /// Lighten
    Lighten,
    /// Subtract
    Subtract,
    /// Overlay
    Overlay,
    /// Difference
    Difference,
    /// Value
    Value,
}

/// Texture coordinate addressing of a classic slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AddressMode {
    /// Tile
    #[default]
    Repeat,
    /// Clamp to edge
    Extend,
    /// Border colour outside [0, 1]
    Clip,
    /// Mirrored tiling
    Checker,
}

impl AddressMode {
    /// `tex_address_mode` token
    pub const fn token(self) -> &'static str {
        match self {
            Self::Repeat => "wrap",
            Self::Extend => "clamp",
            Self::Clip => "border",
            Self::Checker => "mirror",
        }
    }

    /// Parse a `tex_address_mode` token
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "wrap" => Some(Self::Repeat),
            "clamp" => Some(Self::Extend),
            "border" => Some(Self::Clip),
            "mirror" => Some(Self::Checker),
            _ => None,
        }
    }
}

bitflags! {
    /// Lighting channels sourced from vertex colour instead of a value
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct VertexColourChannels: u8 {
        /// `ambient vertexcolour`
        const AMBIENT = 1 << 0;
        /// `diffuse vertexcolour`
        const DIFFUSE = 1 << 1;
        /// `specular vertexcolour`
        const SPECULAR = 1 << 2;
        /// `emissive vertexcolour`
        const EMISSIVE = 1 << 3;
    }
}

/// A classic (non-graph) texture slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureSlot {
    /// Emitted as the `texture_unit` name when present
    pub name: Option<String>,
    /// Texture file
    pub image: String,
    /// Blend with the layers below
    pub blend_type: BlendType,
    /// Coordinate addressing
    pub address_mode: AddressMode,
    /// UV layer index
    pub uv_layer: u32,
    /// Scroll offset
    pub offset: [f32; 2],
    /// Coordinate scale
    pub scale: [f32; 2],
    /// Rotation in degrees
    pub rotation: f32,
    /// Slot drives alpha
    pub use_map_alpha: bool,
    /// The image carries an alpha channel
    pub texture_has_alpha: bool,
    /// Slot acts as a stencil for the layers above
    pub use_stencil: bool,
    /// Blend strength in [0, 1]
    pub blend_factor: f32,
    /// Unit lines the fields above cannot express, emitted as written
    pub extra_params: Vec<Attribute>,
}

impl TextureSlot {
    /// A plain mix slot for an image
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            name: None,
            image: image.into(),
            blend_type: BlendType::Mix,
            address_mode: AddressMode::Repeat,
            uv_layer: 0,
            offset: [0.0, 0.0],
            scale: [1.0, 1.0],
            rotation: 0.0,
            use_map_alpha: false,
            texture_has_alpha: false,
            use_stencil: false,
            blend_factor: 1.0,
            extra_params: Vec::new(),
        }
    }

    /// Set the slot name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the blend type
    pub fn with_blend(mut self, blend_type: BlendType) -> Self {
        self.blend_type = blend_type;
        self
    }

    /// Set the address mode
    pub fn with_address_mode(mut self, address_mode: AddressMode) -> Self {
        self.address_mode = address_mode;
        self
    }

    /// The `colour_op` / `colour_op_ex` line for this slot
    pub fn colour_op(&self) -> String {
        const SOURCES: &str = "src_texture src_current";
        let ex = |op: &str| format!("colour_op_ex {op} {SOURCES}");
        match self.blend_type {
            BlendType::Mix if self.use_stencil => ex("blend_current_alpha"),
            BlendType::Mix if self.use_map_alpha && self.texture_has_alpha => "colour_op alpha_blend".to_string(),
            BlendType::Mix if self.use_map_alpha => ex("blend_texture_alpha"),
            BlendType::Mix if self.blend_factor < 1.0 => format!(
                "colour_op_ex blend_manual {SOURCES} {}",
                format_float(self.blend_factor.max(0.0))
            ),
            BlendType::Mix | BlendType::Multiply => "colour_op modulate".to_string(),
            BlendType::Add => "colour_op add".to_string(),
            BlendType::Screen => ex("modulate_x2"),
            BlendType::Lighten => ex("modulate_x4"),
            BlendType::Subtract => ex("subtract"),
            BlendType::Overlay => ex("add_signed"),
            BlendType::Difference => ex("dotproduct"),
            BlendType::Value => ex("blend_diffuse_colour"),
        }
    }

    /// Rebuild a slot from a parsed texture unit; `None` without a texture.
    ///
    /// Lines the slot fields cannot express exactly end up in
    /// [`extra_params`](Self::extra_params).
    pub fn from_unit(unit: &TextureUnitSpec) -> Option<Self> {
        let mut slot = Self::new(unit.texture()?).named(unit.name.clone());
        for param in &unit.params {
            if !slot.read_param(&param.key, &param.values) {
                slot.extra_params.push(param.clone());
            }
        }
        Some(slot)
    }

    /// Whether an extra line replaces the generated line for `key`
    pub fn overrides(&self, key: &str) -> bool {
        self.extra_params.iter().any(|p| p.key == key)
    }

    fn read_param(&mut self, key: &str, values: &[String]) -> bool {
        let floats: Option<Vec<f32>> = values.iter().map(|v| v.parse().ok()).collect();
        match (key, values) {
            ("texture", [image]) => {
                self.image.clone_from(image);
                true
            }
            ("tex_address_mode", [mode]) => AddressMode::from_token(mode)
                .map(|mode| self.address_mode = mode)
                .is_some(),
            ("tex_coord_set", [set]) => set.parse().map(|set| self.uv_layer = set).is_ok(),
            ("scroll", _) => match floats.as_deref() {
                Some(&[x, y]) => {
                    self.offset = [x, y];
                    true
                }
                _ => false,
            },
            ("scale", _) => match floats.as_deref() {
                Some(&[x, y]) => {
                    self.scale = [x, y];
                    true
                }
                _ => false,
            },
            ("rotate", _) => match floats.as_deref() {
                Some(&[degrees]) => {
                    self.rotation = degrees;
                    true
                }
                _ => false,
            },
            ("colour_op", [op]) => match op.as_str() {
                "modulate" => true,
                "add" => {
                    self.blend_type = BlendType::Add;
                    true
                }
                "alpha_blend" => {
                    self.use_map_alpha = true;
                    self.texture_has_alpha = true;
                    true
                }
                _ => false,
            },
            ("colour_op_ex", [op, source1, source2, rest @ ..])
                if source1 == "src_texture" && source2 == "src_current" =>
            {
                self.read_colour_op_ex(op, rest)
            }
            _ => false,
        }
    }

    fn read_colour_op_ex(&mut self, op: &str, rest: &[String]) -> bool {
        let blend = match (op, rest) {
            ("modulate_x2", []) => BlendType::Screen,
            ("modulate_x4", []) => BlendType::Lighten,
            ("subtract", []) => BlendType::Subtract,
            ("add_signed", []) => BlendType::Overlay,
            ("dotproduct", []) => BlendType::Difference,
            ("blend_diffuse_colour", []) => BlendType::Value,
            ("blend_current_alpha", []) => {
                self.use_stencil = true;
                return true;
            }
            ("blend_texture_alpha", []) => {
                self.use_map_alpha = true;
                return true;
            }
            ("blend_manual", [factor]) => {
                return match factor.parse::<f32>() {
                    Ok(factor) if (0.0..1.0).contains(&factor) => {
                        self.blend_factor = factor;
                        true
                    }
                    _ => false,
                };
            }
            _ => return false,
        };
        self.blend_type = blend;
        true
    }
}

/// A texture node of the graph, bound to a parent slot by position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureNode {
    /// Texture file
    pub image: String,
}

impl TextureNode {
    /// Node for an image
    pub fn new(image: impl Into<String>) -> Self {
        Self { image: image.into() }
    }
}

/// Script inheritance requested by a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inheritance {
    /// Parent material name, looked up in the registry at generation time
    pub parent: String,
    /// Local texture overrides, bound to the parent's slots by ordinal
    pub overrides: Vec<TextureNode>,
}

impl Inheritance {
    /// Inherit from a parent with no overrides
    pub fn new(parent: impl Into<String>) -> Self {
        Self { parent: parent.into(), overrides: Vec::new() }
    }

    /// Append a texture override
    pub fn with_texture(mut self, image: impl Into<String>) -> Self {
        self.overrides.push(TextureNode::new(image));
        self
    }
}

/// One pass worth of material description
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialNode {
    /// Pass name
    pub name: String,
    /// Base (diffuse) colour
    pub base_color: Vec3,
    /// Opacity written into every lighting channel
    pub alpha: f32,
    /// Ambient factor applied to the base colour
    pub ambient: f32,
    /// Diffuse factor applied to the base colour
    pub diffuse_intensity: f32,
    /// Specular colour
    pub specular_color: Vec3,
    /// Specular factor
    pub specular_intensity: f32,
    /// Specular shininess
    pub specular_hardness: f32,
    /// Emission factor applied to the base colour
    pub emit: f32,
    /// Channels taken from vertex colour
    pub vertex_colour: VertexColourChannels,
    /// The pass is driven entirely by its programs; no lighting block
    pub shader_only: bool,
    /// Vertex program reference
    pub vertex_program: Option<ProgramRef>,
    /// Fragment program reference
    pub fragment_program: Option<ProgramRef>,
    /// Flags and enumerated states
    pub render_state: RenderState,
    /// Classic texture slots, used unless an inheritance parent resolves
    pub texture_slots: Vec<TextureSlot>,
    /// Pass lines outside the lighting block and the render-state tables,
    /// emitted as written
    pub extra_attributes: Vec<Attribute>,
    /// Script inheritance
    pub inheritance: Option<Inheritance>,
    /// Extra pass nodes are emitted only when this is set
    pub use_in_pass: bool,
}

impl MaterialNode {
    /// A node with default lighting and render state
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_color: Vec3::new(0.8, 0.8, 0.8),
            alpha: 1.0,
            ambient: 1.0,
            diffuse_intensity: 1.0,
            specular_color: Vec3::new(1.0, 1.0, 1.0),
            specular_intensity: 0.5,
            specular_hardness: 50.0,
            emit: 0.0,
            vertex_colour: VertexColourChannels::empty(),
            shader_only: false,
            vertex_program: None,
            fragment_program: None,
            render_state: RenderState::default(),
            texture_slots: Vec::new(),
            extra_attributes: Vec::new(),
            inheritance: None,
            use_in_pass: true,
        }
    }

    /// Set the base colour
    pub fn with_base_color(mut self, color: Vec3) -> Self {
        self.base_color = color;
        self
    }

    /// Add a classic texture slot
    pub fn with_texture_slot(mut self, slot: TextureSlot) -> Self {
        self.texture_slots.push(slot);
        self
    }

    /// Request script inheritance
    pub fn inheriting(mut self, inheritance: Inheritance) -> Self {
        self.inheritance = Some(inheritance);
        self
    }

    /// Set the render state
    pub fn with_render_state(mut self, state: RenderState) -> Self {
        self.render_state = state;
        self
    }

    /// Add a pass line emitted after the render state
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.extra_attributes.push(attribute);
        self
    }

    /// Rebuild a node from a parsed pass
    fn from_pass(pass: &Pass, name: String) -> Self {
        let mut node = Self::new(name);
        let (state, rest) = RenderState::split_attributes(&pass.attributes);
        node.render_state = state;
        node.extra_attributes = rest
            .into_iter()
            .filter(|a| !LIGHTING_KEYS.contains(&a.key.as_str()))
            .collect();
        node.vertex_program = pass.vertex_program_ref.clone();
        node.fragment_program = pass.fragment_program_ref.clone();
        node.shader_only = !LIGHTING_KEYS.iter().any(|k| pass.attribute(k).is_some());
        node.read_lighting(pass);

        // kept for the plain-pass fallback when the parent does not resolve
        node.texture_slots = pass.texture_units.iter().filter_map(TextureSlot::from_unit).collect();
        if let Some(parent) = pass.parent.as_deref() {
            let parent = parent.split('/').next().unwrap_or(parent);
            node.inheritance = Some(Inheritance {
                parent: parent.to_string(),
                overrides: node.texture_slots.iter().map(|s| TextureNode::new(s.image.clone())).collect(),
            });
        }
        node
    }

    /// Approximate the channel factors from absolute lighting colours
    fn read_lighting(&mut self, pass: &Pass) {
        let colour = |key: &str| -> Option<Vec<f32>> {
            let values = pass.attribute(key)?;
            Some(values.iter().filter_map(|v| v.parse().ok()).collect())
        };
        let is_vertex = |key: &str| {
            pass.attribute(key)
                .and_then(|v| v.first())
                .is_some_and(|v| v == "vertexcolour")
        };
        let mean = |v: &[f32]| v.iter().take(3).sum::<f32>() / 3.0;

        if is_vertex("ambient") {
            self.vertex_colour |= VertexColourChannels::AMBIENT;
        }
        if is_vertex("diffuse") {
            self.vertex_colour |= VertexColourChannels::DIFFUSE;
        }
        if is_vertex("specular") {
            self.vertex_colour |= VertexColourChannels::SPECULAR;
        }
        if is_vertex("emissive") {
            self.vertex_colour |= VertexColourChannels::EMISSIVE;
        }

        if let Some(diffuse) = colour("diffuse").filter(|v| v.len() >= 3) {
            self.base_color = Vec3::new(diffuse[0], diffuse[1], diffuse[2]);
            self.alpha = diffuse.get(3).copied().unwrap_or(1.0);
        }
        let base = mean(self.base_color.as_slice());
        let factor = |v: &[f32]| if base > 0.0 { mean(v) / base } else { mean(v) };

        if let Some(ambient) = colour("ambient").filter(|v| v.len() >= 3) {
            self.ambient = factor(&ambient);
        }
        if let Some(specular) = colour("specular").filter(|v| v.len() >= 3) {
            self.specular_color = Vec3::new(specular[0], specular[1], specular[2]);
            self.specular_intensity = 1.0;
            if let Some(hardness) = specular.get(4) {
                self.specular_hardness = *hardness;
            }
        }
        if let Some(emissive) = colour("emissive").filter(|v| v.len() >= 3) {
            self.emit = factor(&emissive);
        }
    }
}

/// Pass attributes that make up the fixed-function lighting block
pub(crate) const LIGHTING_KEYS: [&str; 4] = ["ambient", "diffuse", "specular", "emissive"];

/// Root material plus ordered extra passes
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialGraph {
    /// Material name
    pub name: String,
    /// Material-level parent written as `material <name> : <parent>`
    pub parent: Option<String>,
    /// Root pass node
    pub root: MaterialNode,
    /// Extra pass nodes in order
    pub extra_passes: Vec<MaterialNode>,
    /// Material-level lines emitted ahead of the technique
    pub material_attributes: Vec<Attribute>,
}

impl MaterialGraph {
    /// Graph with a single root pass, named after that pass
    pub fn new(root: MaterialNode) -> Self {
        Self {
            name: root.name.clone(),
            parent: None,
            root,
            extra_passes: Vec::new(),
            material_attributes: Vec::new(),
        }
    }

    /// Append an extra pass node
    pub fn with_pass(mut self, node: MaterialNode) -> Self {
        self.extra_passes.push(node);
        self
    }

    /// Rename the material without touching its passes
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the material-level parent
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Material name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Root plus every extra node flagged for use, in emission order
    pub fn passes(&self) -> impl Iterator<Item = &MaterialNode> {
        std::iter::once(&self.root).chain(self.extra_passes.iter().filter(|n| n.use_in_pass))
    }

    /// Build a graph from a parsed script's first technique
    pub fn from_script(script: &MaterialScript) -> Self {
        let mut passes = script.primary_passes().iter().enumerate().map(|(i, pass)| {
            let name = if pass.name.is_empty() {
                format!("{}_pass{i}", script.name)
            } else {
                pass.name.clone()
            };
            MaterialNode::from_pass(pass, name)
        });

        let root = passes.next().unwrap_or_else(|| MaterialNode::new(script.name.clone()));
        let mut graph = Self::new(root).named(script.name.clone());
        graph.parent.clone_from(&script.parent);
        graph.extra_passes = passes.collect();
        graph.material_attributes = script.attributes.clone();
        graph
    }
}
