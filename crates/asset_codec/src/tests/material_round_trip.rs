//! Regenerating parsed materials and parsing the output again

use crate::report::{ExportReport, ExportWarning};
use crate::script::{
    generate, GeneratorOptions, Inheritance, MaterialGraph, MaterialNode, MaterialScript, Registry, ScriptParser,
};
use crate::script::render_state::RenderState;

const ROCKS: &str = r#"
// terrain materials
material Rock
{
    receive_shadows on
    technique
    {
        pass base
        {
            ambient 0.2 0.2 0.2 1
            diffuse 0.8 0.7 0.6 1
            depth_write off
            scene_blend alpha_blend
            cull_hardware none
            texture_unit diffuse
            {
                texture rock_d.png
                tex_address_mode clamp
                scale 2 2
            }
            texture_unit detail
            {
                texture rock_detail.png
                colour_op add
            }
        }
        pass glow
        {
            lighting off
            shading flat
            illumination_stage decal
            texture_unit glow_map
            {
                texture rock_glow.png
                colour_op_ex modulate_x2 src_texture src_current
            }
        }
    }
}
"#;

const BLENDED: &str = "\
material Blended
{
    technique
    {
        pass P
        {
            scene_blend src_alpha one_minus_src_alpha
            alpha_rejection greater 128
            texture_unit t
            {
                texture g.png
                colour_op replace
                filtering trilinear
            }
        }
    }
}
";

fn parse(text: &str, report: &mut ExportReport) -> Vec<MaterialScript> {
    ScriptParser::parse(text, "rocks.material", report).unwrap()
}

/// Parse, regenerate against `registry` and parse the output again
fn regenerate(text: &str, registry: &Registry, report: &mut ExportReport) -> (MaterialScript, String) {
    let original = parse(text, report).remove(0);
    let generated = generate(
        &MaterialGraph::from_script(&original),
        registry,
        &GeneratorOptions::default(),
        report,
    )
    .unwrap();
    (original, generated)
}

fn states(script: &MaterialScript) -> Vec<RenderState> {
    script
        .primary_passes()
        .iter()
        .map(|p| RenderState::from_attributes(&p.attributes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regenerated_script_parses_back_equivalent() {
        let mut report = ExportReport::new();
        let original = parse(ROCKS, &mut report).remove(0);
        assert!(report.is_empty());

        let graph = MaterialGraph::from_script(&original);
        let text = generate(&graph, &Registry::new(), &GeneratorOptions::default(), &mut report).unwrap();
        assert!(report.is_empty(), "{report}");

        let reparsed = parse(&text, &mut report).remove(0);
        assert!(report.is_empty(), "{report}");

        assert_eq!(reparsed.name, "Rock");
        assert_eq!(reparsed.primary_passes().len(), original.primary_passes().len());
        assert_eq!(reparsed.texture_units_order, original.texture_units_order);
        assert_eq!(states(&reparsed), states(&original));
        assert_eq!(reparsed.attributes, original.attributes);
    }

    #[test]
    fn test_regenerated_slots_keep_their_settings() {
        let mut report = ExportReport::new();
        let original = parse(ROCKS, &mut report).remove(0);
        let text = generate(
            &MaterialGraph::from_script(&original),
            &Registry::new(),
            &GeneratorOptions::default(),
            &mut report,
        )
        .unwrap();
        let reparsed = parse(&text, &mut report).remove(0);

        let diffuse = reparsed.texture_unit("diffuse").unwrap();
        assert_eq!(diffuse.texture(), Some("rock_d.png"));
        assert_eq!(diffuse.param("tex_address_mode"), Some(&["clamp".to_string()][..]));
        assert_eq!(diffuse.param("scale"), Some(&["2".to_string(), "2".to_string()][..]));

        let glow = reparsed.texture_unit("glow_map").unwrap();
        assert_eq!(glow.param("colour_op_ex").and_then(|v| v.first()).map(String::as_str), Some("modulate_x2"));
    }

    #[test]
    fn test_lines_outside_the_tables_survive_regeneration() {
        let mut report = ExportReport::new();
        let (original, text) = regenerate(BLENDED, &Registry::new(), &mut report);
        let reparsed = parse(&text, &mut report).remove(0);
        assert!(report.is_empty(), "{report}");

        let before = &original.primary_passes()[0];
        let after = &reparsed.primary_passes()[0];
        for key in ["scene_blend", "alpha_rejection"] {
            assert_eq!(after.attribute(key), before.attribute(key), "{key}");
        }
        assert_eq!(text.matches("scene_blend ").count(), 1);

        let unit = reparsed.texture_unit("t").unwrap();
        assert_eq!(unit.param("colour_op"), Some(&["replace".to_string()][..]));
        assert_eq!(unit.param("filtering"), Some(&["trilinear".to_string()][..]));
        assert!(!text.contains("colour_op modulate"));
    }

    #[test]
    fn test_material_parent_and_pass_names_survive() {
        let text = "material Foo : Bar\n{\n technique\n {\n  pass P1\n  {\n   texture_unit T1\n   {\n    texture a.png\n   }\n  }\n }\n}";
        let mut report = ExportReport::new();
        let (_, generated) = regenerate(text, &Registry::new(), &mut report);
        let reparsed = parse(&generated, &mut report).remove(0);

        assert_eq!(reparsed.name, "Foo");
        assert_eq!(reparsed.parent.as_deref(), Some("Bar"));
        assert_eq!(reparsed.primary_passes()[0].name, "P1");
        assert_eq!(reparsed.texture_unit("T1").unwrap().texture(), Some("a.png"));
    }

    #[test]
    fn test_quoted_material_name_round_trips() {
        let text = "material \"My Rock\"\n{\n technique\n {\n  pass { lighting off }\n }\n}\n";
        let mut report = ExportReport::new();
        let (_, generated) = regenerate(text, &Registry::new(), &mut report);
        assert!(generated.contains("material \"My Rock\"\n"));

        let reparsed = parse(&generated, &mut report).remove(0);
        assert_eq!(reparsed.name, "My Rock");
        assert!(report.is_empty(), "{report}");
    }

    #[test]
    fn test_unresolved_pass_parent_keeps_its_textures() {
        let text = "material C\n{\n technique\n {\n  pass P : Missing/PASS0\n  {\n   texture_unit d\n   {\n    texture child.png\n    tex_address_mode clamp\n   }\n  }\n }\n}\n";
        let mut report = ExportReport::new();
        let (_, generated) = regenerate(text, &Registry::new(), &mut report);
        assert_eq!(
            report.warnings(),
            &[ExportWarning::UnresolvedParent {
                pass: "P".to_string(),
                parent: "Missing".to_string(),
            }]
        );

        let reparsed = parse(&generated, &mut report).remove(0);
        assert_eq!(reparsed.primary_passes()[0].parent, None);
        assert_eq!(reparsed.texture_units_order, vec!["d"]);
        let unit = reparsed.texture_unit("d").unwrap();
        assert_eq!(unit.texture(), Some("child.png"));
        assert_eq!(unit.param("tex_address_mode"), Some(&["clamp".to_string()][..]));
    }

    #[test]
    fn test_abstract_pass_leaves_out_pruned_units() {
        let base = "material Base\n{\n technique\n {\n  pass\n  {\n   texture_unit keep { texture k.png }\n   texture_unit empty { tex_address_mode clamp }\n  }\n }\n}\n";
        let mut report = ExportReport::new();
        let mut registry = Registry::new();
        for script in parse(base, &mut report) {
            registry.register_script(script, &mut report);
        }
        assert_eq!(report.count_where(|w| matches!(w, ExportWarning::TextureUnitWithoutTexture { .. })), 1);

        let child = MaterialGraph::new(MaterialNode::new("Child").inheriting(Inheritance::new("Base").with_texture("c.png")));
        let mut report = ExportReport::new();
        let text = generate(&child, &registry, &GeneratorOptions::default(), &mut report).unwrap();

        assert!(report.is_empty(), "{report}");
        assert!(text.contains("abstract pass Base/PASS0\n{\n    texture_unit keep\n"));
        assert!(!text.contains("empty"));
        assert!(!text.contains("tex_address_mode"));
    }

    #[test]
    fn test_generated_inheritance_reparses_as_pass_parent() {
        let base = "material Base\n{\n technique\n {\n  pass\n  {\n   texture_unit diffuse { texture d.png }\n   texture_unit normal { texture n.png }\n  }\n }\n}\n";
        let mut report = ExportReport::new();
        let mut registry = Registry::new();
        for script in parse(base, &mut report) {
            registry.register_script(script, &mut report);
        }

        let child = MaterialGraph::new(
            MaterialNode::new("Child").inheriting(
                Inheritance::new("Base")
                    .with_texture("child_d.png")
                    .with_texture("child_n.png"),
            ),
        );
        let text = generate(&child, &registry, &GeneratorOptions::default(), &mut report).unwrap();
        assert!(report.is_empty(), "{report}");

        let scripts = parse(&text, &mut report);
        // the abstract pass ahead of the material is skipped with a warning
        assert_eq!(report.count_where(|w| matches!(w, ExportWarning::InlineDefinitionIgnored { .. })), 1);
        assert_eq!(scripts.len(), 1);

        let pass = &scripts[0].primary_passes()[0];
        assert_eq!(pass.parent.as_deref(), Some("Base/PASS0"));
        assert_eq!(scripts[0].texture_units_order, registry.script("Base").unwrap().texture_units_order);
        assert_eq!(scripts[0].texture_unit("normal").unwrap().texture(), Some("child_n.png"));
    }
}
