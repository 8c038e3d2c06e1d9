//! Pass render state and its script tokens
//!
//! Every flag and enumerated state a pass can carry is listed exactly once in
//! [`FLAG_FIELDS`] or [`STATE_FIELDS`]. The generator walks those tables to
//! emit tokens and the graph builder walks them to read tokens back, so the
//! two directions cannot drift apart.

use serde::{Deserialize, Serialize};

use super::model::Attribute;

/// Define a render-state enum with its script tokens
macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $token:literal),+ $(,)? }
        default $default:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Script token for this value
            pub const fn token(self) -> &'static str {
                match self {
                    $(Self::$variant => $token),+
                }
            }

            /// Parse a script token
            pub fn from_token(token: &str) -> Option<Self> {
                match token {
                    $($token => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }
    };
}

token_enum! {
    /// Hardware culling winding
    CullHardware {
        /// Cull clockwise triangles
        Clockwise => "clockwise",
        /// Cull anticlockwise triangles
        Anticlockwise => "anticlockwise",
        /// No hardware culling
        None => "none",
    }
    default Clockwise
}

token_enum! {
    /// Software culling side
    CullSoftware {
        /// Cull back faces
        Back => "back",
        /// Cull front faces
        Front => "front",
        /// No software culling
        None => "none",
    }
    default Back
}

token_enum! {
    /// Shading model
    Shading {
        /// Flat shading
        Flat => "flat",
        /// Gouraud shading
        Gouraud => "gouraud",
        /// Phong shading
        Phong => "phong",
    }
    default Gouraud
}

token_enum! {
    /// Scene blend shorthand
    SceneBlend {
        /// Replace the frame buffer
        Replace => "replace",
        /// Additive
        Add => "add",
        /// Multiply
        Modulate => "modulate",
        /// Blend by source colour
        ColourBlend => "colour_blend",
        /// Blend by source alpha
        AlphaBlend => "alpha_blend",
    }
    default Replace
}

token_enum! {
    /// Source or destination factor of an explicit `scene_blend`
    BlendFactor {
        /// 1
        One => "one",
        /// 0
        Zero => "zero",
        /// Frame buffer colour
        DestColour => "dest_colour",
        /// Incoming colour
        SrcColour => "src_colour",
        /// 1 - frame buffer colour
        OneMinusDestColour => "one_minus_dest_colour",
        /// 1 - incoming colour
        OneMinusSrcColour => "one_minus_src_colour",
        /// Frame buffer alpha
        DestAlpha => "dest_alpha",
        /// Incoming alpha
        SrcAlpha => "src_alpha",
        /// 1 - frame buffer alpha
        OneMinusDestAlpha => "one_minus_dest_alpha",
        /// 1 - incoming alpha
        OneMinusSrcAlpha => "one_minus_src_alpha",
    }
    default One
}

/// `scene_blend` value: a shorthand or an explicit factor pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SceneBlendSetting {
    /// `scene_blend <shorthand>`
    Shorthand(SceneBlend),
    /// `scene_blend <source> <destination>`
    Factors(BlendFactor, BlendFactor),
}

impl Default for SceneBlendSetting {
    fn default() -> Self {
        Self::Shorthand(SceneBlend::default())
    }
}

impl SceneBlendSetting {
    /// Value tokens as written after `scene_blend`
    pub fn script_value(self) -> String {
        match self {
            Self::Shorthand(blend) => blend.token().to_string(),
            Self::Factors(src, dest) => format!("{} {}", src.token(), dest.token()),
        }
    }

    /// Parse the value tokens of a `scene_blend` line
    pub fn from_values(values: &[String]) -> Option<Self> {
        match values {
            [shorthand] => SceneBlend::from_token(shorthand).map(Self::Shorthand),
            [src, dest] => Some(Self::Factors(BlendFactor::from_token(src)?, BlendFactor::from_token(dest)?)),
            _ => None,
        }
    }
}

token_enum! {
    /// Blend equation
    SceneBlendOp {
        /// source + dest
        Add => "add",
        /// source - dest
        Subtract => "subtract",
        /// dest - source
        ReverseSubtract => "reverse_subtract",
        /// min(source, dest)
        Min => "min",
        /// max(source, dest)
        Max => "max",
    }
    default Add
}

token_enum! {
    /// Depth comparison function
    DepthFunc {
        /// Never pass
        AlwaysFail => "always_fail",
        /// Always pass
        AlwaysPass => "always_pass",
        /// Less than
        Less => "less",
        /// Less or equal
        LessEqual => "less_equal",
        /// Equal
        Equal => "equal",
        /// Not equal
        NotEqual => "not_equal",
        /// Greater or equal
        GreaterEqual => "greater_equal",
        /// Greater than
        Greater => "greater",
    }
    default LessEqual
}

token_enum! {
    /// Rasterisation mode
    PolygonMode {
        /// Filled triangles
        Solid => "solid",
        /// Edges only
        Wireframe => "wireframe",
        /// Vertices only
        Points => "points",
    }
    default Solid
}

token_enum! {
    /// Depth sorting of transparent passes
    TransparentSorting {
        /// Sort when transparent
        On => "on",
        /// Never sort
        Off => "off",
        /// Always sort
        Force => "force",
    }
    default On
}

token_enum! {
    /// Illumination stage override; `Auto` leaves the renderer to decide
    IlluminationStage {
        /// Let the renderer classify the pass
        Auto => "auto",
        /// Ambient stage
        Ambient => "ambient",
        /// Per-light stage
        PerLight => "per_light",
        /// Decal stage
        Decal => "decal",
    }
    default Auto
}

/// Render state of one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderState {
    /// Fixed-function lighting
    pub lighting: bool,
    /// Depth buffer writes
    pub depth_write: bool,
    /// Depth buffer test
    pub depth_check: bool,
    /// Colour buffer writes
    pub colour_write: bool,
    /// Renormalise normals after transform
    pub normalise_normals: bool,
    /// Scissor per-light rendering to the light's range
    pub light_scissor: bool,
    /// Clip per-light rendering with user planes
    pub light_clip_planes: bool,
    /// Alpha to coverage multisampling
    pub alpha_to_coverage: bool,
    /// Whether the camera may override the polygon mode
    pub polygon_mode_overrideable: bool,
    /// Hardware culling
    pub cull_hardware: CullHardware,
    /// Software culling
    pub cull_software: CullSoftware,
    /// Shading model
    pub shading: Shading,
    /// Scene blend
    pub scene_blend: SceneBlendSetting,
    /// Blend equation
    pub scene_blend_op: SceneBlendOp,
    /// Depth comparison
    pub depth_func: DepthFunc,
    /// Rasterisation mode
    pub polygon_mode: PolygonMode,
    /// Transparent sorting
    pub transparent_sorting: TransparentSorting,
    /// Illumination stage
    pub illumination_stage: IlluminationStage,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            lighting: true,
            depth_write: true,
            depth_check: true,
            colour_write: true,
            normalise_normals: false,
            light_scissor: false,
            light_clip_planes: false,
            alpha_to_coverage: false,
            polygon_mode_overrideable: true,
            cull_hardware: CullHardware::default(),
            cull_software: CullSoftware::default(),
            shading: Shading::default(),
            scene_blend: SceneBlendSetting::default(),
            scene_blend_op: SceneBlendOp::default(),
            depth_func: DepthFunc::default(),
            polygon_mode: PolygonMode::default(),
            transparent_sorting: TransparentSorting::default(),
            illumination_stage: IlluminationStage::default(),
        }
    }
}

/// A boolean render flag and how to reach it
pub struct FlagField {
    /// Script token
    pub token: &'static str,
    /// Read the flag
    pub get: fn(&RenderState) -> bool,
    /// Write the flag
    pub set: fn(&mut RenderState, bool),
}

/// An enumerated render state and how to reach it
pub struct StateField {
    /// Script token
    pub token: &'static str,
    /// Current value as script text
    pub get: fn(&RenderState) -> String,
    /// Set from the value tokens of a line; false when they are not a known value
    pub set: fn(&mut RenderState, &[String]) -> bool,
    /// Value for which nothing is emitted
    pub implicit: Option<&'static str>,
}

macro_rules! flag {
    ($field:ident) => {
        FlagField {
            token: stringify!($field),
            get: |s| s.$field,
            set: |s, v| s.$field = v,
        }
    };
}

macro_rules! state {
    ($field:ident : $ty:ident) => {
        state!($field: $ty, None)
    };
    ($field:ident : $ty:ident, $implicit:expr) => {
        StateField {
            token: stringify!($field),
            get: |s| s.$field.token().to_string(),
            set: |s, values| match values {
                [t] => match $ty::from_token(t) {
                    Some(v) => {
                        s.$field = v;
                        true
                    }
                    None => false,
                },
                _ => false,
            },
            implicit: $implicit,
        }
    };
}

/// Boolean flags in emission order
pub static FLAG_FIELDS: &[FlagField] = &[
    flag!(lighting),
    flag!(depth_write),
    flag!(depth_check),
    flag!(colour_write),
    flag!(normalise_normals),
    flag!(light_scissor),
    flag!(light_clip_planes),
    flag!(alpha_to_coverage),
    flag!(polygon_mode_overrideable),
];

/// Enumerated states in emission order
pub static STATE_FIELDS: &[StateField] = &[
    state!(cull_hardware: CullHardware),
    state!(cull_software: CullSoftware),
    state!(shading: Shading),
    StateField {
        token: "scene_blend",
        get: |s| s.scene_blend.script_value(),
        set: |s, values| match SceneBlendSetting::from_values(values) {
            Some(v) => {
                s.scene_blend = v;
                true
            }
            None => false,
        },
        implicit: None,
    },
    state!(scene_blend_op: SceneBlendOp),
    state!(depth_func: DepthFunc),
    state!(polygon_mode: PolygonMode),
    state!(transparent_sorting: TransparentSorting),
    state!(illumination_stage: IlluminationStage, Some("auto")),
];

impl RenderState {
    /// `<token> <value>` lines for every flag and state, in table order
    pub fn tokens(&self) -> Vec<(&'static str, String)> {
        let flags = FLAG_FIELDS
            .iter()
            .map(|f| (f.token, (if (f.get)(self) { "on" } else { "off" }).to_string()));
        let states = STATE_FIELDS.iter().filter_map(|f| {
            let value = (f.get)(self);
            (f.implicit != Some(value.as_str())).then_some((f.token, value))
        });
        flags.chain(states).collect()
    }

    /// Apply one script line. Returns false when the key is not a render
    /// state or its value is not recognised.
    pub fn apply(&mut self, key: &str, values: &[String]) -> bool {
        if let Some(field) = FLAG_FIELDS.iter().find(|f| f.token == key) {
            let [value] = values else {
                return false;
            };
            return match value.as_str() {
                "on" | "true" => {
                    (field.set)(self, true);
                    true
                }
                "off" | "false" => {
                    (field.set)(self, false);
                    true
                }
                _ => false,
            };
        }
        if let Some(field) = STATE_FIELDS.iter().find(|f| f.token == key) {
            return (field.set)(self, values);
        }
        false
    }

    /// Render state described by a pass's attribute lines; defaults elsewhere
    pub fn from_attributes(attributes: &[Attribute]) -> Self {
        Self::split_attributes(attributes).0
    }

    /// Like [`from_attributes`](Self::from_attributes), also returning the
    /// lines that did not apply, in their original order
    pub fn split_attributes(attributes: &[Attribute]) -> (Self, Vec<Attribute>) {
        let mut state = Self::default();
        let rest: Vec<Attribute> = attributes
            .iter()
            .filter(|attribute| !state.apply(&attribute.key, &attribute.values))
            .cloned()
            .collect();
        (state, rest)
    }
}
