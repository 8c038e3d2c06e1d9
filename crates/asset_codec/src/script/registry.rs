//! Material and program registry
//!
//! Built once per configuration load from a script directory and passed by
//! reference to the generator. Rebuilding replaces the whole value; nothing
//! is merged into an existing registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::model::{MaterialScript, ProgramDefinition};
use super::parser::ScriptParser;
use super::program::ProgramParser;
use crate::error::{CodecError, CodecResult};
use crate::report::{ExportReport, ExportWarning};

/// Everything found under a script directory
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Parsed materials in file order
    pub scripts: Vec<MaterialScript>,
    /// Program chunks whose source file exists
    pub programs: Vec<ProgramDefinition>,
    /// Program chunks whose source file is absent or undeclared
    pub missing: Vec<ProgramDefinition>,
}

/// Walk `root` recursively and parse every `.material` and `.program` file.
///
/// Files are visited in sorted path order so that "last definition wins"
/// is deterministic.
pub fn scan_directory(root: impl AsRef<Path>, report: &mut ExportReport) -> CodecResult<ScanResult> {
    let root = root.as_ref();
    let mut files = Vec::new();
    collect_files(root, &mut files)?;

    let mut result = ScanResult::default();
    for path in files {
        match path.extension().and_then(|e| e.to_str()) {
            Some("material") => {
                let scripts = ScriptParser::parse_file(&path, report)?;
                log::debug!("Parsed {} material(s) from {}", scripts.len(), path.display());
                result.scripts.extend(scripts);
            }
            Some("program") => {
                let text = std::fs::read_to_string(&path).map_err(|source| CodecError::File {
                    path: path.clone(),
                    source,
                })?;
                for definition in ProgramParser::parse(&text, &path) {
                    if definition.has_source() {
                        result.programs.push(definition);
                    } else {
                        report.warn(ExportWarning::ProgramSourceMissing {
                            name: definition.name.clone(),
                            url: definition.url.display().to_string(),
                            source_file: definition
                                .source
                                .as_ref()
                                .map(|p| p.display().to_string())
                                .unwrap_or_default(),
                        });
                        result.missing.push(definition);
                    }
                }
            }
            _ => {}
        }
    }

    log::info!(
        "Scanned {}: {} material(s), {} program(s), {} missing program(s)",
        root.display(),
        result.scripts.len(),
        result.programs.len(),
        result.missing.len()
    );
    Ok(result)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> CodecResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|source| CodecError::File {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut paths: Vec<(PathBuf, std::fs::FileType)> = entries
        .map(|entry| entry.and_then(|e| Ok((e.path(), e.file_type()?))))
        .collect::<Result<_, _>>()?;
    paths.sort_by(|a, b| a.0.cmp(&b.0));

    // file_type() does not follow links, so a linked directory is never entered
    for (path, kind) in paths {
        if kind.is_dir() {
            collect_files(&path, files)?;
        } else if kind.is_symlink() && path.is_dir() {
            log::warn!("Skipping symlinked directory {}", path.display());
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Program lookup result for one material
#[derive(Debug, Clone, Default)]
pub struct ProgramResolution<'r> {
    /// Definitions found in the registry
    pub resolved: Vec<&'r ProgramDefinition>,
    /// Referenced names with no usable definition
    pub unresolved: Vec<String>,
}

/// Name-keyed tables of parsed materials and usable programs
#[derive(Debug, Clone, Default)]
pub struct Registry {
    scripts: HashMap<String, MaterialScript>,
    programs: HashMap<String, ProgramDefinition>,
    missing: Vec<ProgramDefinition>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a directory and build a registry from it
    pub fn load(root: impl AsRef<Path>, report: &mut ExportReport) -> CodecResult<Self> {
        let scan = scan_directory(root, report)?;
        Ok(Self::from_scan(scan, report))
    }

    /// Build a registry from a finished scan
    pub fn from_scan(scan: ScanResult, report: &mut ExportReport) -> Self {
        let mut registry = Self::new();
        for script in scan.scripts {
            registry.register_script(script, report);
        }
        for program in scan.programs {
            registry.register_program(program);
        }
        registry.missing = scan.missing;
        registry
    }

    /// Register a material by name; an existing entry is replaced with a warning
    pub fn register_script(&mut self, script: MaterialScript, report: &mut ExportReport) {
        if let Some(previous) = self.scripts.get(&script.name) {
            report.warn(ExportWarning::DuplicateMaterial {
                name: script.name.clone(),
                url: script.url.clone(),
                previous: previous.url.clone(),
            });
        }
        self.scripts.insert(script.name.clone(), script);
    }

    /// Register a program definition.
    ///
    /// Definitions without an existing source file go to the missing list
    /// and stay invisible to [`Registry::program`].
    pub fn register_program(&mut self, program: ProgramDefinition) {
        if !program.has_source() {
            self.missing.push(program);
            return;
        }
        if self.programs.contains_key(&program.name) {
            log::debug!("Program '{}' redefined in {}", program.name, program.url.display());
        }
        self.programs.insert(program.name.clone(), program);
    }

    /// Look up a material
    pub fn script(&self, name: &str) -> Option<&MaterialScript> {
        self.scripts.get(name)
    }

    /// Look up a usable program
    pub fn program(&self, name: &str) -> Option<&ProgramDefinition> {
        self.programs.get(name)
    }

    /// Program chunks rejected for lacking a source file
    pub fn missing(&self) -> &[ProgramDefinition] {
        &self.missing
    }

    /// Material names in sorted order
    pub fn script_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scripts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered materials
    pub fn script_count(&self) -> usize {
        self.scripts.len()
    }

    /// Number of usable programs
    pub fn program_count(&self) -> usize {
        self.programs.len()
    }
}

impl MaterialScript {
    /// Resolve every program this material references against a registry
    pub fn programs<'r>(&self, registry: &'r Registry) -> ProgramResolution<'r> {
        let mut resolution = ProgramResolution::default();
        for name in self.program_names() {
            match registry.program(name) {
                Some(definition) => resolution.resolved.push(definition),
                None => resolution.unresolved.push(name.to_string()),
            }
        }
        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::model::ProgramKind;
    use std::collections::BTreeMap;

    fn script(name: &str, url: &str) -> MaterialScript {
        MaterialScript {
            name: name.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    fn program(name: &str, source: Option<PathBuf>) -> ProgramDefinition {
        ProgramDefinition {
            name: name.to_string(),
            kind: ProgramKind::Vertex,
            language: None,
            source,
            params: BTreeMap::new(),
            url: PathBuf::from("test.program"),
            text: String::new(),
        }
    }

    #[test]
    fn test_duplicate_material_last_wins() {
        let mut report = ExportReport::new();
        let mut registry = Registry::new();
        registry.register_script(script("Rock", "a.material"), &mut report);
        registry.register_script(script("Rock", "b.material"), &mut report);

        assert_eq!(registry.script_count(), 1);
        assert_eq!(registry.script("Rock").unwrap().url, "b.material");
        assert_eq!(
            report.warnings(),
            &[ExportWarning::DuplicateMaterial {
                name: "Rock".to_string(),
                url: "b.material".to_string(),
                previous: "a.material".to_string(),
            }]
        );
    }

    #[test]
    fn test_program_without_source_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("ok.vert");
        std::fs::write(&source, "void main() {}").unwrap();

        let mut registry = Registry::new();
        registry.register_program(program("ok", Some(source)));
        registry.register_program(program("gone", Some(dir.path().join("gone.vert"))));
        registry.register_program(program("none", None));

        assert!(registry.program("ok").is_some());
        assert!(registry.program("gone").is_none());
        assert!(registry.program("none").is_none());
        assert_eq!(registry.missing().len(), 2);
        assert_eq!(registry.program_count(), 1);
    }
}
