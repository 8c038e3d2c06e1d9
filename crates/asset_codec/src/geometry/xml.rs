//! Indexed geometry XML writer

use std::fmt::Write;

use super::weld::{Submesh, WeldedMesh, WeldedVertex};
use crate::error::CodecResult;
use crate::foundation::math::{format_float, format_floats};

/// Escape text for use inside a double-quoted attribute
pub fn escape_attribute(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Render a welded mesh as shared-geometry mesh XML
pub fn write_mesh_xml(mesh: &WeldedMesh) -> CodecResult<String> {
    let mut out = String::new();
    writeln!(out, "<mesh>")?;
    writeln!(out, "    <sharedgeometry vertexcount=\"{}\">", mesh.vertices.len())?;

    let first = mesh.vertices.iter().next();
    let has_colours = first.is_some_and(|v| v.colour.is_some());
    let uv_layers = first.map_or(0, |v| v.uvs.len());

    let mut header = String::from("<vertexbuffer positions=\"true\" normals=\"true\"");
    if has_colours {
        header.push_str(" colours_diffuse=\"true\"");
    }
    if uv_layers > 0 {
        write!(header, " texture_coords=\"{uv_layers}\"")?;
        for layer in 0..uv_layers {
            write!(header, " texture_coord_dimensions_{layer}=\"2\"")?;
        }
    }
    writeln!(out, "        {header}>")?;
    for vertex in mesh.vertices.iter() {
        write_vertex(&mut out, vertex)?;
    }
    writeln!(out, "        </vertexbuffer>")?;
    writeln!(out, "    </sharedgeometry>")?;

    writeln!(out, "    <submeshes>")?;
    for submesh in &mesh.submeshes {
        write_submesh(&mut out, submesh)?;
    }
    writeln!(out, "    </submeshes>")?;
    writeln!(out, "</mesh>")?;
    Ok(out)
}

fn write_vertex(out: &mut String, vertex: &WeldedVertex) -> std::fmt::Result {
    let [x, y, z] = vertex.position.map(format_float);
    let [nx, ny, nz] = vertex.normal.map(format_float);
    writeln!(out, "            <vertex>")?;
    writeln!(out, "                <position x=\"{x}\" y=\"{y}\" z=\"{z}\" />")?;
    writeln!(out, "                <normal x=\"{nx}\" y=\"{ny}\" z=\"{nz}\" />")?;
    if let Some(colour) = vertex.colour {
        writeln!(out, "                <colour_diffuse value=\"{}\" />", format_floats(&colour))?;
    }
    for [u, v] in &vertex.uvs {
        writeln!(
            out,
            "                <texcoord u=\"{}\" v=\"{}\" />",
            format_float(*u),
            format_float(*v)
        )?;
    }
    writeln!(out, "            </vertex>")
}

fn write_submesh(out: &mut String, submesh: &Submesh) -> std::fmt::Result {
    writeln!(
        out,
        "        <submesh material=\"{}\" usesharedvertices=\"{}\" use32bitindexes=\"true\" operationtype=\"triangle_list\">",
        escape_attribute(&submesh.material_name),
        submesh.uses_shared_vertices
    )?;
    writeln!(out, "            <faces count=\"{}\">", submesh.face_count())?;
    for [a, b, c] in &submesh.faces {
        writeln!(out, "                <face v1=\"{a}\" v2=\"{b}\" v3=\"{c}\" />")?;
    }
    writeln!(out, "            </faces>")?;
    writeln!(out, "        </submesh>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::soup::{Corner, Face, MeshSoup};
    use crate::geometry::weld::{weld, WeldOptions};

    fn triangle(material: &str, uv_layers: usize, colour: bool) -> WeldedMesh {
        let corner = |v: usize| {
            let mut c = Corner::new(v);
            c.uvs = vec![[0.5, 0.25]; uv_layers];
            if colour {
                c.colour = Some([1.0, 0.0, 0.0, 1.0]);
            }
            c
        };
        let soup = MeshSoup {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            faces: vec![Face {
                corners: (0..3).map(corner).collect(),
                ..Face::new(&[], 0, [0.0, 0.0, 1.0])
            }],
            materials: vec![material.to_string()],
            uv_layers,
        };
        weld(&soup, &WeldOptions::default()).unwrap()
    }

    #[test]
    fn test_plain_triangle() {
        let xml = write_mesh_xml(&triangle("Rock", 0, false)).unwrap();
        assert!(xml.starts_with("<mesh>\n    <sharedgeometry vertexcount=\"3\">\n"));
        assert!(xml.contains("<vertexbuffer positions=\"true\" normals=\"true\">\n"));
        assert!(xml.contains("<position x=\"1\" y=\"0\" z=\"0\" />"));
        assert!(xml.contains("<normal x=\"0\" y=\"0\" z=\"1\" />"));
        assert!(xml.contains(
            "<submesh material=\"Rock\" usesharedvertices=\"true\" use32bitindexes=\"true\" operationtype=\"triangle_list\">"
        ));
        assert!(xml.contains("<faces count=\"1\">\n                <face v1=\"0\" v2=\"1\" v3=\"2\" />"));
        assert!(!xml.contains("texcoord"));
        assert!(xml.ends_with("</mesh>\n"));
    }

    #[test]
    fn test_colours_and_uv_layers() {
        let xml = write_mesh_xml(&triangle("Rock", 2, true)).unwrap();
        assert!(xml.contains(
            "colours_diffuse=\"true\" texture_coords=\"2\" texture_coord_dimensions_0=\"2\" texture_coord_dimensions_1=\"2\">"
        ));
        assert!(xml.contains("<colour_diffuse value=\"1 0 0 1\" />"));
        assert_eq!(xml.matches("<texcoord u=\"0.5\" v=\"0.25\" />").count(), 6);
    }

    #[test]
    fn test_material_name_is_escaped() {
        let xml = write_mesh_xml(&triangle("Rock & \"Dirt\" <2>", 0, false)).unwrap();
        assert!(xml.contains("material=\"Rock &amp; &quot;Dirt&quot; &lt;2&gt;\""));
    }
}
