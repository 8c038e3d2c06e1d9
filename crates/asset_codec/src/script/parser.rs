//! Material script parser
//!
//! Parses `.material` text into [`MaterialScript`] records. The text is first
//! split into lines with every brace on a line of its own, then chopped into
//! top-level blocks by their leading keyword. Each `material` block is walked
//! once with an explicit scope stack; nothing is re-read.

use std::ops::RangeInclusive;
use std::path::Path;

use super::model::{
    Attribute, MaterialScript, Pass, ProgramParam, ProgramRef, Technique, TextureUnitSpec,
};
use crate::error::{CodecError, CodecResult};
use crate::report::{ExportReport, ExportWarning};

/// A script line with comments removed and braces split out
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Line {
    /// 1-based line number in the source text
    pub number: usize,
    /// `{`, `}`, or brace-free content
    pub text: String,
}

impl Line {
    fn is_open(&self) -> bool {
        self.text == "{"
    }

    fn is_close(&self) -> bool {
        self.text == "}"
    }

    fn keyword(&self) -> &str {
        self.text.split_whitespace().next().unwrap_or("")
    }
}

/// Split text into lines, dropping `//` comments and blank lines and putting
/// each brace on its own line
pub(crate) fn split_lines(text: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let number = index + 1;
        let code = raw.find("//").map_or(raw, |at| &raw[..at]);
        let mut content = String::new();
        for ch in code.chars() {
            if ch == '{' || ch == '}' {
                push_content(&mut lines, &mut content, number);
                lines.push(Line { number, text: ch.to_string() });
            } else {
                content.push(ch);
            }
        }
        push_content(&mut lines, &mut content, number);
    }
    lines
}

fn push_content(lines: &mut Vec<Line>, content: &mut String, number: usize) {
    let trimmed = content.trim();
    if !trimmed.is_empty() {
        lines.push(Line { number, text: trimmed.to_string() });
    }
    content.clear();
}

/// Whether a keyword opens a top-level block
pub(crate) fn is_top_level_keyword(keyword: &str) -> bool {
    matches!(keyword, "material" | "abstract" | "import" | "shared_params")
        || keyword.ends_with("_program")
}

/// Indent balanced lines by nesting depth and join them
pub(crate) fn render_lines(lines: &[Line]) -> String {
    let mut depth = 0usize;
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.is_close() {
            depth = depth.saturating_sub(1);
        }
        out.push(format!("{}{}", "    ".repeat(depth), line.text));
        if line.is_open() {
            depth += 1;
        }
    }
    out.join("\n")
}

/// Trim surplus trailing closing braces until the body balances.
///
/// Returns `(opened, closed)` on failure so the caller can report the pass.
pub(crate) fn balance_body(lines: &[Line]) -> Result<&[Line], (usize, usize)> {
    let opened = lines.iter().filter(|l| l.is_open()).count();
    let mut closed = lines.iter().filter(|l| l.is_close()).count();
    let mut end = lines.len();
    while closed > opened && end > 0 && lines[end - 1].is_close() {
        end -= 1;
        closed -= 1;
    }
    if opened == closed {
        Ok(&lines[..end])
    } else {
        Err((opened, closed))
    }
}

/// Strip one pair of surrounding double quotes
fn unquote(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
        .to_string()
}

/// Split `name : parent` header text
fn split_inheritance(text: &str) -> (String, Option<String>) {
    match text.split_once(':') {
        Some((name, parent)) => {
            let parent = unquote(parent);
            (unquote(name), (!parent.is_empty()).then_some(parent))
        }
        None => (unquote(text), None),
    }
}

/// Tokens after the keyword of a line
fn rest_of(line: &Line) -> &str {
    line.text
        .split_once(char::is_whitespace)
        .map_or("", |(_, rest)| rest.trim())
}

fn attribute_of(line: &Line) -> Attribute {
    let mut tokens = line.text.split_whitespace();
    let key = tokens.next().unwrap_or_default();
    Attribute::new(key, tokens.map(str::to_string).collect())
}

/// Scope the walker is currently inside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Material,
    Technique,
    Pass,
    VertexProgramRef,
    FragmentProgramRef,
    TextureUnit,
    /// Any block the parser does not interpret
    Other,
}

/// Which program reference `param_named` lines currently feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProgramSlot {
    Vertex,
    Fragment,
}

/// Single-pass walker over one `material` block
struct MaterialWalker<'a> {
    url: &'a str,
    lines: &'a [Line],
    script: MaterialScript,
    stack: Vec<Scope>,
    pending: Option<Scope>,
    technique: Option<Technique>,
    pass: Option<Pass>,
    pass_open: usize,
    /// Units declared in the current pass, pruned ones included
    units_declared: usize,
    /// Line ranges of pruned units inside the current pass
    pruned: Vec<RangeInclusive<usize>>,
    unit: Option<TextureUnitSpec>,
    unit_open: usize,
    capture: Option<ProgramSlot>,
}

impl<'a> MaterialWalker<'a> {
    fn new(url: &'a str, lines: &'a [Line], name: String, parent: Option<String>) -> Self {
        Self {
            url,
            lines,
            script: MaterialScript {
                name,
                parent,
                url: url.to_string(),
                ..Default::default()
            },
            stack: Vec::new(),
            pending: None,
            technique: None,
            pass: None,
            pass_open: 0,
            units_declared: 0,
            pruned: Vec::new(),
            unit: None,
            unit_open: 0,
            capture: None,
        }
    }

    fn run(mut self, report: &mut ExportReport) -> CodecResult<MaterialScript> {
        let lines = self.lines;
        // Header is lines[0]; the walk starts right after it
        for (index, line) in lines.iter().enumerate().skip(1) {
            if line.is_open() {
                self.open(index);
            } else if line.is_close() {
                self.close(index, report)?;
                if self.stack.is_empty() {
                    if let Some(extra) = lines[index + 1..].first() {
                        log::debug!("{}: ignoring text after material '{}' at line {}", self.url, self.script.name, extra.number);
                    }
                    return Ok(self.finish());
                }
            } else {
                self.content(line, report);
            }
        }

        if let Some(pass) = self.pass.as_ref().filter(|_| self.stack.contains(&Scope::Pass)) {
            let body = &lines[self.pass_open..];
            let (opened, closed) = balance_body(body).err().unwrap_or((1, 0));
            return Err(CodecError::BraceMismatch {
                url: self.url.to_string(),
                material: self.script.name.clone(),
                pass: pass.name.clone(),
                opened,
                closed,
            });
        }
        Err(CodecError::UnterminatedBlock {
            url: self.url.to_string(),
            line: lines[0].number,
        })
    }

    fn open(&mut self, index: usize) {
        let scope = if self.stack.is_empty() {
            Scope::Material
        } else {
            self.pending.take().unwrap_or(Scope::Other)
        };
        match scope {
            Scope::Pass => self.pass_open = index,
            Scope::TextureUnit => self.unit_open = index,
            _ => {}
        }
        self.pending = None;
        self.stack.push(scope);
    }

    fn close(&mut self, index: usize, report: &mut ExportReport) -> CodecResult<()> {
        let lines = self.lines;
        self.pending = None;
        self.capture = None;
        let Some(scope) = self.stack.pop() else {
            return Err(CodecError::UnexpectedClose {
                url: self.url.to_string(),
                line: lines[index].number,
            });
        };
        match scope {
            Scope::TextureUnit => {
                if let (Some(unit), Some(pass)) = (self.unit.take(), self.pass.as_mut()) {
                    if unit.texture().is_some() {
                        pass.texture_units.push(unit);
                    } else {
                        report.warn(ExportWarning::TextureUnitWithoutTexture {
                            material: self.script.name.clone(),
                            unit: unit.name,
                        });
                        // the header line sits right before the opening brace
                        self.pruned.push(self.unit_open.saturating_sub(1)..=index);
                    }
                }
            }
            Scope::Pass => {
                if let Some(mut pass) = self.pass.take() {
                    let body = &lines[self.pass_open..=index];
                    let body = balance_body(body).map_err(|(opened, closed)| CodecError::BraceMismatch {
                        url: self.url.to_string(),
                        material: self.script.name.clone(),
                        pass: pass.name.clone(),
                        opened,
                        closed,
                    })?;
                    let kept: Vec<Line> = body
                        .iter()
                        .enumerate()
                        .filter(|(offset, _)| !self.pruned.iter().any(|r| r.contains(&(self.pass_open + offset))))
                        .map(|(_, line)| line.clone())
                        .collect();
                    pass.body = render_lines(&kept);
                    self.pruned.clear();
                    if let Some(technique) = self.technique.as_mut() {
                        technique.passes.push(pass);
                    }
                }
            }
            Scope::Technique => {
                if let Some(technique) = self.technique.take() {
                    self.script.techniques.push(technique);
                }
            }
            Scope::Material
            | Scope::VertexProgramRef
            | Scope::FragmentProgramRef
            | Scope::Other => {}
        }
        Ok(())
    }

    fn content(&mut self, line: &Line, report: &mut ExportReport) {
        self.pending = None;
        let keyword = line.keyword();
        match self.stack.last().copied() {
            Some(Scope::Material) => {
                if keyword == "technique" {
                    self.technique = Some(Technique {
                        name: unquote(rest_of(line)),
                        ..Default::default()
                    });
                    self.pending = Some(Scope::Technique);
                } else {
                    self.script.attributes.push(attribute_of(line));
                    self.pending = Some(Scope::Other);
                }
            }
            Some(Scope::Technique) => {
                if keyword == "pass" {
                    let (name, parent) = split_inheritance(rest_of(line));
                    self.pass = Some(Pass { name, parent, ..Default::default() });
                    self.units_declared = 0;
                    self.pending = Some(Scope::Pass);
                } else if let Some(technique) = self.technique.as_mut() {
                    technique.attributes.push(attribute_of(line));
                    self.pending = Some(Scope::Other);
                }
            }
            Some(Scope::Pass) => self.pass_content(line, keyword, report),
            Some(Scope::VertexProgramRef | Scope::FragmentProgramRef) => {
                if keyword == "param_named" {
                    self.param_named(line, report);
                } else {
                    log::debug!("{}: ignoring program parameter line {}: '{}'", self.url, line.number, line.text);
                }
            }
            Some(Scope::TextureUnit) => {
                if let Some(unit) = self.unit.as_mut() {
                    unit.params.push(attribute_of(line));
                }
                self.pending = Some(Scope::Other);
            }
            Some(Scope::Other) | None => {}
        }
    }

    fn pass_content(&mut self, line: &Line, keyword: &str, report: &mut ExportReport) {
        let Some(pass) = self.pass.as_mut() else {
            return;
        };
        match keyword {
            "vertex_program_ref" => {
                pass.vertex_program_ref = Some(ProgramRef::new(unquote(rest_of(line))));
                self.capture = Some(ProgramSlot::Vertex);
                self.pending = Some(Scope::VertexProgramRef);
            }
            "fragment_program_ref" => {
                pass.fragment_program_ref = Some(ProgramRef::new(unquote(rest_of(line))));
                self.capture = Some(ProgramSlot::Fragment);
                self.pending = Some(Scope::FragmentProgramRef);
            }
            "texture_unit" => {
                self.capture = None;
                let name = unquote(rest_of(line));
                let name = if name.is_empty() {
                    format!("unit{}", self.units_declared)
                } else {
                    name
                };
                self.units_declared += 1;
                self.unit = Some(TextureUnitSpec::new(name));
                self.pending = Some(Scope::TextureUnit);
            }
            "param_named" if self.capture.is_some() => self.param_named(line, report),
            _ => {
                pass.attributes.push(attribute_of(line));
                self.pending = Some(Scope::Other);
            }
        }
    }

    fn param_named(&mut self, line: &Line, report: &mut ExportReport) {
        let tokens: Vec<&str> = line.text.split_whitespace().collect();
        let [_, param, kind, values @ ..] = tokens.as_slice() else {
            log::debug!("{}: incomplete param_named at line {}", self.url, line.number);
            return;
        };
        let Some(pass) = self.pass.as_mut() else {
            return;
        };
        let program = match self.capture {
            Some(ProgramSlot::Vertex) => pass.vertex_program_ref.as_mut(),
            Some(ProgramSlot::Fragment) => pass.fragment_program_ref.as_mut(),
            None => None,
        };
        let Some(program) = program else {
            return;
        };
        let value = ProgramParam::parse_typed(kind, values).unwrap_or_else(|| {
            report.warn(ExportWarning::UnknownParamType {
                program: program.name.clone(),
                param: (*param).to_string(),
                kind: (*kind).to_string(),
            });
            ProgramParam::Raw(tokens[2..].join(" "))
        });
        program.params.insert((*param).to_string(), value);
    }

    fn finish(mut self) -> MaterialScript {
        self.script.rebuild_texture_order();

        if self.script.techniques.len() > 1 {
            log::warn!(
                "{}: material '{}' declares {} techniques; only the first is used for texture binding",
                self.url,
                self.script.name,
                self.script.techniques.len()
            );
        }
        self.script
    }
}

/// Material script parser
pub struct ScriptParser;

impl ScriptParser {
    /// Parse script text into material records
    ///
    /// # Arguments
    /// * `text` - Contents of a `.material` file
    /// * `url` - Where the text came from, used in messages and recorded on each script
    /// * `report` - Receives recoverable warnings
    ///
    /// # Returns
    /// The materials in file order. Brace mismatches inside a pass and
    /// unterminated blocks are fatal.
    pub fn parse(text: &str, url: &str, report: &mut ExportReport) -> CodecResult<Vec<MaterialScript>> {
        let lines = split_lines(text);
        let mut scripts = Vec::new();

        let mut start = 0;
        while start < lines.len() {
            let header = &lines[start];
            let end = lines[start + 1..]
                .iter()
                .position(|l| is_top_level_keyword(l.keyword()))
                .map_or(lines.len(), |offset| start + 1 + offset);
            let block = &lines[start..end];

            match header.keyword() {
                "material" => scripts.push(Self::parse_material(block, url, report)?),
                "import" => log::debug!("{}: skipping import at line {}", url, header.number),
                keyword if keyword == "abstract" || keyword.ends_with("_program") => {
                    report.warn(ExportWarning::InlineDefinitionIgnored {
                        url: url.to_string(),
                        keyword: keyword.to_string(),
                        line: header.number,
                    });
                }
                _ => log::debug!("{}: skipping '{}' at line {}", url, header.text, header.number),
            }
            start = end;
        }

        Ok(scripts)
    }

    /// Read and parse a `.material` file
    pub fn parse_file(path: impl AsRef<Path>, report: &mut ExportReport) -> CodecResult<Vec<MaterialScript>> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CodecError::File {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string(), report)
    }

    fn parse_material(block: &[Line], url: &str, report: &mut ExportReport) -> CodecResult<MaterialScript> {
        let header = &block[0];
        let text = rest_of(header);
        let (name, parent) = split_inheritance(text);
        let quoted = text.starts_with('"');
        if name.is_empty() || (!quoted && name.contains(char::is_whitespace)) {
            return Err(CodecError::MalformedHeader {
                url: url.to_string(),
                line: header.number,
                text: header.text.clone(),
            });
        }
        MaterialWalker::new(url, block, name, parent).run(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = "material Foo : Bar\n{\n technique\n {\n  pass P1\n  {\n   texture_unit T1\n   {\n    texture a.png\n   }\n  }\n }\n}";

    fn parse_ok(text: &str) -> (Vec<MaterialScript>, ExportReport) {
        let mut report = ExportReport::new();
        let scripts = ScriptParser::parse(text, "test.material", &mut report).unwrap();
        (scripts, report)
    }

    #[test]
    fn test_parse_simple_inheriting_material() {
        let (scripts, report) = parse_ok(SIMPLE);
        assert!(report.is_empty());
        assert_eq!(scripts.len(), 1);

        let script = &scripts[0];
        assert_eq!(script.name, "Foo");
        assert_eq!(script.parent.as_deref(), Some("Bar"));
        assert_eq!(script.techniques.len(), 1);
        assert_eq!(script.techniques[0].passes.len(), 1);
        assert_eq!(script.techniques[0].passes[0].name, "P1");
        assert_eq!(script.texture_units_order, vec!["T1"]);
        assert_eq!(script.texture_unit("T1").unwrap().texture(), Some("a.png"));
    }

    #[test]
    fn test_split_lines_braces_and_comments() {
        let lines = split_lines("material A { // trailing\n\n   // only comment\n technique{pass{}}}");
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["material A", "{", "technique", "{", "pass", "{", "}", "}", "}"]);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[2].number, 4);
    }

    #[test]
    fn test_pass_body_is_retained_balanced() {
        let text = "material M\n{\n technique\n {\n  pass Base\n  {\n   lighting off\n   texture_unit diffuse { texture d.png }\n  }\n }\n}\n";
        let (scripts, _) = parse_ok(text);
        let body = &scripts[0].techniques[0].passes[0].body;
        assert_eq!(
            body,
            "{\n    lighting off\n    texture_unit diffuse\n    {\n        texture d.png\n    }\n}"
        );
    }

    #[test]
    fn test_program_refs_and_params() {
        let text = r#"
material Shaded
{
    technique
    {
        pass
        {
            vertex_program_ref simple_vs
            {
                param_named scale float 2.5
                param_named offset float3 1 2 3
                param_named mode int 4
            }
            fragment_program_ref simple_fs
            {
                param_named tint float4 1 0.5 0.25 1
            }
        }
    }
}
"#;
        let (scripts, report) = parse_ok(text);
        let pass = &scripts[0].techniques[0].passes[0];

        let vs = pass.vertex_program_ref.as_ref().unwrap();
        assert_eq!(vs.name, "simple_vs");
        assert_eq!(vs.params["scale"], ProgramParam::Float(2.5));
        assert_eq!(vs.params["offset"], ProgramParam::Float3([1.0, 2.0, 3.0]));
        assert_eq!(vs.params["mode"], ProgramParam::Raw("int 4".to_string()));

        let fs = pass.fragment_program_ref.as_ref().unwrap();
        assert_eq!(fs.params["tint"], ProgramParam::Float4([1.0, 0.5, 0.25, 1.0]));

        assert_eq!(report.len(), 1);
        assert!(matches!(report.warnings()[0], ExportWarning::UnknownParamType { .. }));
        assert_eq!(scripts[0].program_names(), vec!["simple_vs", "simple_fs"]);
    }

    #[test]
    fn test_texture_unit_without_texture_is_pruned() {
        let text = "material M\n{\n technique\n {\n  pass\n  {\n   texture_unit keep\n   {\n    texture k.png\n   }\n   texture_unit empty\n   {\n    tex_address_mode clamp\n   }\n  }\n }\n}\n";
        let (scripts, report) = parse_ok(text);
        let script = &scripts[0];

        assert_eq!(script.texture_units_order, vec!["keep"]);
        assert!(script.texture_unit("empty").is_none());
        assert_eq!(
            script.primary_passes()[0].body,
            "{\n    texture_unit keep\n    {\n        texture k.png\n    }\n}"
        );
        assert_eq!(
            report.warnings(),
            &[ExportWarning::TextureUnitWithoutTexture {
                material: "M".to_string(),
                unit: "empty".to_string(),
            }]
        );
    }

    #[test]
    fn test_unnamed_texture_units_get_ordinal_names() {
        let text = "material M { technique { pass { texture_unit { texture a.png } texture_unit { texture b.png } } } }";
        let (scripts, _) = parse_ok(text);
        assert_eq!(scripts[0].texture_units_order, vec!["unit0", "unit1"]);
    }

    #[test]
    fn test_inline_program_definitions_are_skipped() {
        let text = r#"
vertex_program inline_vs glsl
{
    source inline.vert
}

material AfterProgram
{
    technique { pass { lighting off } }
}

abstract pass Base/PASS0
{
    lighting on
}
"#;
        let (scripts, report) = parse_ok(text);
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].name, "AfterProgram");
        assert_eq!(
            report.count_where(|w| matches!(w, ExportWarning::InlineDefinitionIgnored { .. })),
            2
        );
    }

    #[test]
    fn test_multiple_materials_and_techniques() {
        let text = r#"
material One
{
    receive_shadows off
    technique High { pass { } }
    technique Low { pass { } pass { } }
}
material Two { technique { pass Single { } } }
"#;
        let (scripts, _) = parse_ok(text);
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[0].techniques.len(), 2);
        assert_eq!(scripts[0].techniques[1].name, "Low");
        assert_eq!(scripts[0].primary_passes().len(), 1);
        assert_eq!(scripts[0].attributes[0].key, "receive_shadows");
        assert_eq!(scripts[1].techniques[0].passes[0].name, "Single");
    }

    #[test]
    fn test_unclosed_pass_is_fatal() {
        let text = "material Broken\n{\n technique\n {\n  pass P\n  {\n   lighting off\nmaterial Next\n{\n}\n";
        let mut report = ExportReport::new();
        let result = ScriptParser::parse(text, "broken.material", &mut report);
        match result {
            Err(CodecError::BraceMismatch { material, pass, opened, closed, .. }) => {
                assert_eq!(material, "Broken");
                assert_eq!(pass, "P");
                assert_eq!((opened, closed), (1, 0));
            }
            other => panic!("expected brace mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_material_is_fatal() {
        let mut report = ExportReport::new();
        let result = ScriptParser::parse("material Open\n{\n technique\n {\n", "open.material", &mut report);
        assert!(matches!(result, Err(CodecError::UnterminatedBlock { line: 1, .. })));
    }

    #[test]
    fn test_malformed_header() {
        let mut report = ExportReport::new();
        let result = ScriptParser::parse("material\n{\n}\n", "bad.material", &mut report);
        assert!(matches!(result, Err(CodecError::MalformedHeader { .. })));
    }

    #[test]
    fn test_unnamed_units_keep_ordinals_across_pruning() {
        let text = "material M { technique { pass { texture_unit { scale 2 2 } texture_unit { texture b.png } } } }";
        let (scripts, report) = parse_ok(text);
        assert_eq!(scripts[0].texture_units_order, vec!["unit1"]);
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn test_quoted_names_may_contain_spaces() {
        let text = "material \"My Rock\" : \"Base Rock\"\n{\n technique { pass { } }\n}\n";
        let (scripts, report) = parse_ok(text);
        assert!(report.is_empty());
        assert_eq!(scripts[0].name, "My Rock");
        assert_eq!(scripts[0].parent.as_deref(), Some("Base Rock"));

        let mut report = ExportReport::new();
        let result = ScriptParser::parse("material My Rock\n{\n}\n", "bad.material", &mut report);
        assert!(matches!(result, Err(CodecError::MalformedHeader { line: 1, .. })));

        let result = ScriptParser::parse("material \"\"\n{\n}\n", "bad.material", &mut report);
        assert!(matches!(result, Err(CodecError::MalformedHeader { .. })));
    }

    #[test]
    fn test_balance_body_trims_surplus_closers() {
        let lines = split_lines("{\n lighting off\n}\n}\n}");
        let trimmed = balance_body(&lines).unwrap();
        assert_eq!(trimmed.len(), 3);

        let open = split_lines("{\n{\n}");
        assert_eq!(balance_body(&open).err(), Some((2, 1)));
    }

    #[test]
    fn test_pass_header_inheritance() {
        let text = "material Child : Base\n{\n technique\n {\n  pass Child : Base/PASS0\n  {\n  }\n }\n}\n";
        let (scripts, _) = parse_ok(text);
        let pass = &scripts[0].techniques[0].passes[0];
        assert_eq!(pass.name, "Child");
        assert_eq!(pass.parent.as_deref(), Some("Base/PASS0"));
    }
}
