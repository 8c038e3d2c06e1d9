//! Export report
//!
//! Recoverable conditions are logged as they happen and collected here so
//! the whole run can be summarised to the user at the end.

use std::fmt;
use thiserror::Error;

/// A recoverable condition raised during a scan, generation or weld run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportWarning {
    /// Two scripts declared the same material name; the later one won
    #[error("material '{name}' redefined in {url} (previously {previous}); last definition wins")]
    DuplicateMaterial {
        /// Material name
        name: String,
        /// Script that now owns the name
        url: String,
        /// Script that was replaced
        previous: String,
    },

    /// Texture unit dropped for lacking a `texture` parameter
    #[error("material '{material}': texture unit '{unit}' has no texture and was dropped")]
    TextureUnitWithoutTexture {
        /// Material name
        material: String,
        /// Texture unit name
        unit: String,
    },

    /// Program chunk whose source file does not exist
    #[error("program '{name}' in {url}: source '{source_file}' not found")]
    ProgramSourceMissing {
        /// Program name
        name: String,
        /// `.program` file
        url: String,
        /// Declared source, or empty when none was declared
        source_file: String,
    },

    /// A generated pass referenced a program the registry cannot provide
    #[error("material '{material}': missing shader program '{program}', exported without it")]
    MissingShaderProgram {
        /// Material name
        material: String,
        /// Program name
        program: String,
    },

    /// Inheritance parent not found in the registry
    #[error("pass '{pass}': parent script '{parent}' not found, exported as a plain pass")]
    UnresolvedParent {
        /// Pass name
        pass: String,
        /// Requested parent
        parent: String,
    },

    /// A parent slot with no texture node bound to it
    #[error("pass '{pass}': texture slot {index} ('{slot}') of '{parent}' left unfilled")]
    UnfilledTextureSlot {
        /// Pass name
        pass: String,
        /// Parent script
        parent: String,
        /// Ordinal of the slot
        index: usize,
        /// Slot name
        slot: String,
    },

    /// A texture node with no parent slot left to bind to
    #[error("pass '{pass}': texture '{texture}' has no slot in '{parent}' and was ignored")]
    SurplusTextureNode {
        /// Pass name
        pass: String,
        /// Parent script
        parent: String,
        /// Texture file of the ignored node
        texture: String,
    },

    /// Inline program or abstract definition inside a `.material` file
    #[error("{url}: inline '{keyword}' definition at line {line} ignored")]
    InlineDefinitionIgnored {
        /// Script path
        url: String,
        /// Block keyword
        keyword: String,
        /// 1-based line
        line: usize,
    },

    /// `param_named` with a type other than float/float2/float3/float4
    #[error("program '{program}': parameter '{param}' has unknown type '{kind}', kept as raw text")]
    UnknownParamType {
        /// Program name
        program: String,
        /// Parameter name
        param: String,
        /// Declared type
        kind: String,
    },
}

/// Accumulated warnings for one export run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    warnings: Vec<ExportWarning>,
}

impl ExportReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a warning and keep it for the final summary
    pub fn warn(&mut self, warning: ExportWarning) {
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// All warnings in the order they were raised
    pub fn warnings(&self) -> &[ExportWarning] {
        &self.warnings
    }

    /// Number of warnings
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// True when the run raised nothing
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Count warnings matching a predicate
    pub fn count_where(&self, predicate: impl Fn(&ExportWarning) -> bool) -> usize {
        self.warnings.iter().filter(|w| predicate(w)).count()
    }
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.warnings.is_empty() {
            return writeln!(f, "no warnings");
        }
        writeln!(f, "{} warning(s):", self.warnings.len())?;
        for warning in &self.warnings {
            writeln!(f, "  - {warning}")?;
        }
        Ok(())
    }
}
