//! Material script generator
//!
//! Turns a [`MaterialGraph`] into script text. Programs and inheritance
//! parents are looked up in a [`Registry`]; anything that cannot be resolved
//! is left out of the output and recorded in the [`ExportReport`].

use std::borrow::Cow;
use std::fmt::Write;

use super::graph::{MaterialGraph, MaterialNode, TextureSlot, VertexColourChannels};
use super::model::{MaterialScript, ProgramRef};
use super::registry::Registry;
use crate::error::CodecResult;
use crate::foundation::math::{format_float, format_floats, Vec3};
use crate::report::{ExportReport, ExportWarning};

/// Identification written into the generated header comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Tool name
    pub tool_name: String,
    /// Tool version
    pub tool_version: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            tool_name: "asset_codec".to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Indenting line writer
struct ScriptWriter {
    out: String,
    depth: usize,
}

impl ScriptWriter {
    fn new() -> Self {
        Self { out: String::new(), depth: 0 }
    }

    fn line(&mut self, text: impl AsRef<str>) -> std::fmt::Result {
        writeln!(self.out, "{}{}", "    ".repeat(self.depth), text.as_ref())
    }

    fn open(&mut self, header: impl AsRef<str>) -> std::fmt::Result {
        self.line(header)?;
        self.line("{")?;
        self.depth += 1;
        Ok(())
    }

    fn close(&mut self) -> std::fmt::Result {
        self.depth = self.depth.saturating_sub(1);
        self.line("}")
    }

    /// Write pre-indented text verbatim, one line at a time
    fn block(&mut self, text: &str) -> std::fmt::Result {
        for line in text.lines() {
            self.line(line)?;
        }
        Ok(())
    }
}

/// A name as one script token; names containing whitespace are quoted
fn script_name(name: &str) -> Cow<'_, str> {
    if name.contains(char::is_whitespace) {
        Cow::Owned(format!("\"{name}\""))
    } else {
        Cow::Borrowed(name)
    }
}

/// Generate the script for a material graph.
///
/// # Arguments
/// * `graph` - Material to export
/// * `registry` - Known scripts and usable programs
/// * `options` - Tool identification for the header comment
/// * `report` - Receives every recoverable problem
pub fn generate(
    graph: &MaterialGraph,
    registry: &Registry,
    options: &GeneratorOptions,
    report: &mut ExportReport,
) -> CodecResult<String> {
    let material = graph.name();
    let passes: Vec<(&MaterialNode, Option<&MaterialScript>)> = graph
        .passes()
        .map(|node| (node, resolve_parent(node, registry, report)))
        .collect();

    let mut w = ScriptWriter::new();
    w.line(format!(
        "// {material} generated by {} {}",
        options.tool_name, options.tool_version
    ))?;

    let mut emitted: Vec<&str> = Vec::new();
    for parent in passes.iter().filter_map(|(_, parent)| *parent) {
        if emitted.contains(&parent.name.as_str()) {
            continue;
        }
        emitted.push(&parent.name);
        for (index, pass) in parent.primary_passes().iter().enumerate() {
            w.line(format!("abstract pass {}", script_name(&format!("{}/PASS{index}", parent.name))))?;
            w.block(&pass.body)?;
            w.line("")?;
        }
    }

    match &graph.parent {
        Some(parent) => w.open(format!("material {} : {}", script_name(material), script_name(parent)))?,
        None => w.open(format!("material {}", script_name(material)))?,
    }
    for attribute in &graph.material_attributes {
        w.line(attribute.script_line())?;
    }
    w.open("technique")?;
    for (node, parent) in &passes {
        write_pass(&mut w, material, node, *parent, registry, report)?;
    }
    w.close()?;
    w.close()?;

    log::debug!("Generated material '{material}' with {} pass(es)", passes.len());
    Ok(w.out)
}

fn resolve_parent<'r>(
    node: &MaterialNode,
    registry: &'r Registry,
    report: &mut ExportReport,
) -> Option<&'r MaterialScript> {
    let inheritance = node.inheritance.as_ref()?;
    let parent = registry.script(&inheritance.parent);
    if parent.is_none() {
        report.warn(ExportWarning::UnresolvedParent {
            pass: node.name.clone(),
            parent: inheritance.parent.clone(),
        });
    }
    parent
}

fn write_pass(
    w: &mut ScriptWriter,
    material: &str,
    node: &MaterialNode,
    parent: Option<&MaterialScript>,
    registry: &Registry,
    report: &mut ExportReport,
) -> CodecResult<()> {
    let name = script_name(&node.name);
    match parent {
        Some(parent) => w.open(format!("pass {name} : {}", script_name(&format!("{}/PASS0", parent.name))))?,
        None => w.open(format!("pass {name}"))?,
    }

    for (keyword, program) in [
        ("vertex_program_ref", &node.vertex_program),
        ("fragment_program_ref", &node.fragment_program),
    ] {
        let Some(program) = program else { continue };
        if registry.program(&program.name).is_some() {
            write_program_ref(w, keyword, program)?;
        } else {
            report.warn(ExportWarning::MissingShaderProgram {
                material: material.to_string(),
                program: program.name.clone(),
            });
        }
    }

    if !node.shader_only {
        write_lighting(w, node)?;
    }

    let overridden = |key: &str| node.extra_attributes.iter().any(|a| a.key == key);
    for (token, value) in node.render_state.tokens() {
        if !overridden(token) {
            w.line(format!("{token} {value}"))?;
        }
    }
    for attribute in &node.extra_attributes {
        w.line(attribute.script_line())?;
    }

    match parent {
        Some(parent) => write_bound_textures(w, node, parent, report)?,
        None => {
            for slot in &node.texture_slots {
                write_texture_slot(w, slot)?;
            }
        }
    }

    w.close()?;
    Ok(())
}

fn write_program_ref(w: &mut ScriptWriter, keyword: &str, program: &ProgramRef) -> std::fmt::Result {
    w.open(format!("{keyword} {}", program.name))?;
    for (name, value) in &program.params {
        w.line(format!("param_named {name} {}", value.to_script()))?;
    }
    w.close()
}

fn write_lighting(w: &mut ScriptWriter, node: &MaterialNode) -> std::fmt::Result {
    let colour = |rgb: Vec3| format_floats(&[rgb.x, rgb.y, rgb.z, node.alpha]);
    let channel = |flag: VertexColourChannels, factor: f32| {
        if node.vertex_colour.contains(flag) {
            "vertexcolour".to_string()
        } else {
            colour(node.base_color * factor)
        }
    };

    w.line(format!("ambient {}", channel(VertexColourChannels::AMBIENT, node.ambient)))?;
    w.line(format!("diffuse {}", channel(VertexColourChannels::DIFFUSE, node.diffuse_intensity)))?;
    let specular = if node.vertex_colour.contains(VertexColourChannels::SPECULAR) {
        "vertexcolour".to_string()
    } else {
        colour(node.specular_color * node.specular_intensity)
    };
    w.line(format!("specular {specular} {}", format_float(node.specular_hardness)))?;
    w.line(format!("emissive {}", channel(VertexColourChannels::EMISSIVE, node.emit)))
}

/// Bind texture nodes to the parent's slots by position
fn write_bound_textures(
    w: &mut ScriptWriter,
    node: &MaterialNode,
    parent: &MaterialScript,
    report: &mut ExportReport,
) -> std::fmt::Result {
    let overrides = node.inheritance.as_ref().map(|i| i.overrides.as_slice()).unwrap_or_default();
    let slots = &parent.texture_units_order;

    for (index, slot) in slots.iter().enumerate() {
        match overrides.get(index) {
            Some(texture) => {
                w.open(format!("texture_unit {slot}"))?;
                w.line(format!("texture {}", texture.image))?;
                w.close()?;
            }
            None => report.warn(ExportWarning::UnfilledTextureSlot {
                pass: node.name.clone(),
                parent: parent.name.clone(),
                index,
                slot: slot.clone(),
            }),
        }
    }
    for surplus in overrides.iter().skip(slots.len()) {
        report.warn(ExportWarning::SurplusTextureNode {
            pass: node.name.clone(),
            parent: parent.name.clone(),
            texture: surplus.image.clone(),
        });
    }
    Ok(())
}

fn write_texture_slot(w: &mut ScriptWriter, slot: &TextureSlot) -> std::fmt::Result {
    match &slot.name {
        Some(name) => w.open(format!("texture_unit {name}"))?,
        None => w.open("texture_unit")?,
    }
    let lines = [
        ("texture", format!("texture {}", slot.image)),
        ("tex_coord_set", format!("tex_coord_set {}", slot.uv_layer)),
        ("tex_address_mode", format!("tex_address_mode {}", slot.address_mode.token())),
        ("scroll", format!("scroll {}", format_floats(&slot.offset))),
        ("scale", format!("scale {}", format_floats(&slot.scale))),
        ("rotate", format!("rotate {}", format_float(slot.rotation))),
    ];
    for (key, line) in lines {
        if !slot.overrides(key) {
            w.line(line)?;
        }
    }
    if !slot.overrides("colour_op") && !slot.overrides("colour_op_ex") {
        w.line(slot.colour_op())?;
    }
    for param in &slot.extra_params {
        w.line(param.script_line())?;
    }
    w.close()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::graph::{AddressMode, BlendType, Inheritance};
    use crate::script::model::Attribute;
    use crate::script::parser::ScriptParser;
    use crate::script::render_state::{BlendFactor, RenderState, SceneBlendSetting};

    fn options() -> GeneratorOptions {
        GeneratorOptions {
            tool_name: "exporter".to_string(),
            tool_version: "1.2".to_string(),
        }
    }

    fn registry_from(text: &str) -> Registry {
        let mut report = ExportReport::new();
        let mut registry = Registry::new();
        for script in ScriptParser::parse(text, "base.material", &mut report).unwrap() {
            registry.register_script(script, &mut report);
        }
        registry
    }

    const BASE: &str = r#"
material Base
{
    technique
    {
        pass
        {
            lighting off
            texture_unit diffuse { texture default_d.png }
            texture_unit normal { texture default_n.png }
        }
        pass glow
        {
            scene_blend add
        }
    }
}
"#;

    #[test]
    fn test_header_and_plain_pass() {
        let graph = MaterialGraph::new(
            MaterialNode::new("Rock").with_texture_slot(
                TextureSlot::new("rock.png")
                    .named("diffuse")
                    .with_blend(BlendType::Add)
                    .with_address_mode(AddressMode::Extend),
            ),
        );
        let mut report = ExportReport::new();
        let text = generate(&graph, &Registry::new(), &options(), &mut report).unwrap();

        assert!(text.starts_with("// Rock generated by exporter 1.2\nmaterial Rock\n{\n    technique\n"));
        assert!(text.contains("        pass Rock\n        {\n"));
        assert!(text.contains("            texture_unit diffuse\n"));
        assert!(text.contains("                tex_address_mode clamp\n"));
        assert!(text.contains("                colour_op add\n"));
        assert!(text.contains("            lighting on\n"));
        assert!(!text.contains("illumination_stage"));
        assert!(report.is_empty());
    }

    #[test]
    fn test_material_parent_and_extra_pass_lines() {
        let mut state = RenderState::default();
        state.scene_blend = SceneBlendSetting::Factors(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
        let node = MaterialNode::new("Fx")
            .with_render_state(state)
            .with_attribute(Attribute::new("cull_hardware", vec!["sideways".to_string()]))
            .with_attribute(Attribute::new("alpha_rejection", vec!["greater".to_string(), "128".to_string()]));
        let graph = MaterialGraph::new(node).named("Effects").with_parent("Base Fx");

        let mut report = ExportReport::new();
        let text = generate(&graph, &Registry::new(), &options(), &mut report).unwrap();

        assert!(text.contains("material Effects : \"Base Fx\"\n"));
        assert!(text.contains("        pass Fx\n"));
        assert!(text.contains("            scene_blend src_alpha one_minus_src_alpha\n"));
        assert!(text.contains("            cull_hardware sideways\n"));
        assert!(!text.contains("cull_hardware clockwise"));
        assert!(text.find("depth_func").unwrap() < text.find("alpha_rejection greater 128").unwrap());
        assert!(report.is_empty());
    }

    #[test]
    fn test_lighting_block() {
        let mut node = MaterialNode::new("Lit").with_base_color(Vec3::new(1.0, 0.5, 0.0));
        node.ambient = 0.5;
        node.emit = 0.0;
        node.specular_color = Vec3::new(1.0, 1.0, 1.0);
        node.specular_intensity = 0.25;
        node.specular_hardness = 12.0;
        node.vertex_colour = VertexColourChannels::DIFFUSE;

        let mut report = ExportReport::new();
        let text = generate(&MaterialGraph::new(node), &Registry::new(), &options(), &mut report).unwrap();
        assert!(text.contains("ambient 0.5 0.25 0 1\n"));
        assert!(text.contains("diffuse vertexcolour\n"));
        assert!(text.contains("specular 0.25 0.25 0.25 1 12\n"));
        assert!(text.contains("emissive 0 0 0 1\n"));
    }

    #[test]
    fn test_shader_only_pass_has_no_lighting() {
        let mut node = MaterialNode::new("Fx");
        node.shader_only = true;
        let mut report = ExportReport::new();
        let text = generate(&MaterialGraph::new(node), &Registry::new(), &options(), &mut report).unwrap();
        assert!(!text.contains("ambient"));
        assert!(!text.contains("diffuse"));
    }

    #[test]
    fn test_missing_program_is_omitted() {
        let mut node = MaterialNode::new("Fx");
        node.vertex_program = Some(ProgramRef::new("nowhere_vs"));
        let mut report = ExportReport::new();
        let text = generate(&MaterialGraph::new(node), &Registry::new(), &options(), &mut report).unwrap();

        assert!(!text.contains("vertex_program_ref"));
        assert_eq!(
            report.warnings(),
            &[ExportWarning::MissingShaderProgram {
                material: "Fx".to_string(),
                program: "nowhere_vs".to_string(),
            }]
        );
    }

    #[test]
    fn test_inheriting_pass_binds_by_ordinal() {
        let registry = registry_from(BASE);
        let node = MaterialNode::new("Child").inheriting(Inheritance::new("Base").with_texture("child_d.png"));
        let mut report = ExportReport::new();
        let text = generate(&MaterialGraph::new(node), &registry, &options(), &mut report).unwrap();

        let abstract_at = text.find("abstract pass Base/PASS0\n{\n    lighting off\n").unwrap();
        assert!(text.contains("abstract pass Base/PASS1\n{\n    scene_blend add\n}\n"));
        assert!(abstract_at < text.find("material Child").unwrap());
        assert!(text.contains("pass Child : Base/PASS0\n"));
        assert!(text.contains("texture_unit diffuse\n            {\n                texture child_d.png\n"));
        assert!(!text.contains("texture_unit normal"));
        assert_eq!(
            report.warnings(),
            &[ExportWarning::UnfilledTextureSlot {
                pass: "Child".to_string(),
                parent: "Base".to_string(),
                index: 1,
                slot: "normal".to_string(),
            }]
        );
    }

    #[test]
    fn test_surplus_texture_nodes_and_single_abstract_copy() {
        let registry = registry_from(BASE);
        let inheritance = Inheritance::new("Base")
            .with_texture("a.png")
            .with_texture("b.png")
            .with_texture("c.png");
        let graph = MaterialGraph::new(MaterialNode::new("Child").inheriting(inheritance.clone()))
            .with_pass(MaterialNode::new("Second").inheriting(inheritance));

        let mut report = ExportReport::new();
        let text = generate(&graph, &registry, &options(), &mut report).unwrap();

        assert_eq!(text.matches("abstract pass Base/PASS0").count(), 1);
        assert_eq!(
            report.count_where(|w| matches!(w, ExportWarning::SurplusTextureNode { texture, .. } if texture == "c.png")),
            2
        );
    }

    #[test]
    fn test_unresolved_parent_degrades_to_plain_pass() {
        let node = MaterialNode::new("Orphan").inheriting(Inheritance::new("Nobody").with_texture("x.png"));
        let mut report = ExportReport::new();
        let text = generate(&MaterialGraph::new(node), &Registry::new(), &options(), &mut report).unwrap();

        assert!(text.contains("pass Orphan\n"));
        assert!(!text.contains("abstract"));
        assert_eq!(
            report.warnings(),
            &[ExportWarning::UnresolvedParent {
                pass: "Orphan".to_string(),
                parent: "Nobody".to_string(),
            }]
        );
    }
}
