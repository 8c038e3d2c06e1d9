//! `.program` file chunking
//!
//! A `.program` file is a sequence of top-level chunks, each a header line
//! (`vertex_program <name> <language>`) followed by one balanced brace block.
//! Every chunk becomes a candidate [`ProgramDefinition`]; the registry decides
//! whether it is usable.

use std::collections::BTreeMap;
use std::path::Path;

use super::model::{ProgramDefinition, ProgramKind, ProgramParam};
use super::parser::{render_lines, split_lines, Line};

/// Parser for GPU program definition files
pub struct ProgramParser;

impl ProgramParser {
    /// Split program file text into candidate definitions
    ///
    /// # Arguments
    /// * `text` - Contents of a `.program` file
    /// * `url` - The file path; `source` entries resolve against its directory
    pub fn parse(text: &str, url: &Path) -> Vec<ProgramDefinition> {
        let lines = split_lines(text);
        let base_dir = url.parent().unwrap_or_else(|| Path::new(""));
        let mut definitions = Vec::new();

        let mut index = 0;
        while index < lines.len() {
            let header = &lines[index];
            if header.text == "{" || header.text == "}" {
                log::debug!("{}: stray '{}' at line {}", url.display(), header.text, header.number);
                index += 1;
                continue;
            }
            if lines.get(index + 1).map(|l| l.text.as_str()) != Some("{") {
                log::debug!("{}: skipping top-level line {}: '{}'", url.display(), header.number, header.text);
                index += 1;
                continue;
            }

            let Some(end) = Self::block_end(&lines, index + 1) else {
                log::warn!("{}: unterminated program chunk at line {}", url.display(), header.number);
                break;
            };
            let chunk = &lines[index..=end];
            if let Some(definition) = Self::parse_chunk(chunk, url, base_dir) {
                definitions.push(definition);
            }
            index = end + 1;
        }

        definitions
    }

    /// Index of the `}` closing the block opened at `open`
    fn block_end(lines: &[Line], open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (offset, line) in lines[open..].iter().enumerate() {
            match line.text.as_str() {
                "{" => depth += 1,
                "}" => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(open + offset);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn parse_chunk(chunk: &[Line], url: &Path, base_dir: &Path) -> Option<ProgramDefinition> {
        let mut header = chunk[0].text.split_whitespace();
        let keyword = header.next()?;
        let Some(kind) = ProgramKind::from_keyword(keyword) else {
            log::debug!("{}: skipping '{}' chunk at line {}", url.display(), keyword, chunk[0].number);
            return None;
        };
        let name = header.next()?.to_string();
        let language = header.next().map(str::to_string);

        let mut source = None;
        let mut params = BTreeMap::new();
        let mut depth = 0usize;
        let mut in_defaults = false;
        let mut pending_defaults = false;

        for line in &chunk[1..] {
            match line.text.as_str() {
                "{" => {
                    depth += 1;
                    in_defaults = pending_defaults && depth == 2;
                    pending_defaults = false;
                }
                "}" => {
                    if depth == 2 {
                        in_defaults = false;
                    }
                    depth = depth.saturating_sub(1);
                }
                text => {
                    let tokens: Vec<&str> = text.split_whitespace().collect();
                    pending_defaults = depth == 1 && tokens[0] == "default_params";
                    match tokens.as_slice() {
                        ["source", file, ..] if depth == 1 => source = Some(base_dir.join(file)),
                        ["param_named", param, ptype, values @ ..] if in_defaults => {
                            let value = ProgramParam::parse_typed(ptype, values)
                                .unwrap_or_else(|| ProgramParam::Raw(tokens[2..].join(" ")));
                            params.insert((*param).to_string(), value);
                        }
                        _ => {}
                    }
                }
            }
        }

        Some(ProgramDefinition {
            name,
            kind,
            language,
            source,
            params,
            url: url.to_path_buf(),
            text: render_lines(chunk),
        })
    }
}
