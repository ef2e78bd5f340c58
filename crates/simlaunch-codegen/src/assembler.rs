//! Assembly of the final C++ source from fixed and user-supplied segments.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::CodegenResult;
use crate::parameters::Parameters;
use crate::templates;

/// A segment of the assembled program, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Banner,
    Includes,
    ParameterDeclarations,
    Variables,
    ParameterRead,
    Definitions,
    MainStart,
    MainBody,
    MainEnd,
}

impl Segment {
    /// Every segment, in the order it is written.
    pub const ORDER: [Segment; 9] = [
        Segment::Banner,
        Segment::Includes,
        Segment::ParameterDeclarations,
        Segment::Variables,
        Segment::ParameterRead,
        Segment::Definitions,
        Segment::MainStart,
        Segment::MainBody,
        Segment::MainEnd,
    ];
}

/// The user-controlled parts of a program.
///
/// Fixed boilerplate is always added around these; only `main_body` may be
/// left empty, which yields a program that starts, checkpoints and exits.
#[derive(Debug, Clone, Default)]
pub struct ProgramSource {
    /// Program name; the source is `<name>.cpp` and the binary `<name>`.
    pub name: String,

    /// Extra `#include` lines.
    pub includes: String,

    /// Extra global variables.
    pub variables: String,

    /// Helper functions available to the body.
    pub definitions: String,

    /// Statements run inside `main`.
    pub main_body: String,
}

impl ProgramSource {
    /// Create an empty program.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add include lines.
    pub fn with_includes(mut self, includes: impl AsRef<str>) -> Self {
        self.includes.push_str(includes.as_ref());
        self
    }

    /// Add global variables.
    pub fn with_variables(mut self, variables: impl AsRef<str>) -> Self {
        self.variables.push_str(variables.as_ref());
        self
    }

    /// Add helper definitions.
    pub fn with_definitions(mut self, definitions: impl AsRef<str>) -> Self {
        self.definitions.push_str(definitions.as_ref());
        self
    }

    /// Replace the main body.
    pub fn with_main_body(mut self, body: impl Into<String>) -> Self {
        self.main_body = body.into();
        self
    }

    /// File name of the assembled source.
    pub fn source_file_name(&self) -> String {
        format!("{}.cpp", self.name)
    }
}

/// Stitches a [`ProgramSource`] and the current parameters into one buffer.
pub struct SourceAssembler<'a> {
    parameters: &'a Parameters,
    version: &'a str,
}

impl<'a> SourceAssembler<'a> {
    /// Assembler stamping the crate version into the banner.
    pub fn new(parameters: &'a Parameters) -> Self {
        Self {
            parameters,
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Override the version written into the banner.
    pub fn with_version(mut self, version: &'a str) -> Self {
        self.version = version;
        self
    }

    /// Render each segment, in [`Segment::ORDER`].
    pub fn segments(&self, source: &ProgramSource) -> Vec<(Segment, String)> {
        let banner = templates::version_banner(self.version);
        Segment::ORDER
            .iter()
            .map(|&segment| {
                let text = match segment {
                    Segment::Banner => banner.clone(),
                    Segment::Includes => format!("{}{}", templates::INCLUDES, source.includes),
                    Segment::ParameterDeclarations => self.parameters.declarations(),
                    Segment::Variables => format!("{}{}", templates::VARIABLES, source.variables),
                    Segment::ParameterRead => self.parameters.read_code(),
                    Segment::Definitions => source.definitions.clone(),
                    Segment::MainStart => format!(
                        "{}{}",
                        templates::MAIN_START,
                        templates::banner_echo(&banner)
                    ),
                    Segment::MainBody => source.main_body.clone(),
                    Segment::MainEnd => templates::MAIN_END.to_string(),
                };
                (segment, text)
            })
            .collect()
    }

    /// Concatenate all segments.
    pub fn assemble(&self, source: &ProgramSource) -> String {
        self.segments(source)
            .into_iter()
            .map(|(_, text)| text)
            .collect()
    }

    /// Write `<name>.cpp` into `dir`. Does not compile.
    pub async fn write_src(&self, source: &ProgramSource, dir: &Path) -> CodegenResult<PathBuf> {
        fs::create_dir_all(dir).await?;
        let path = dir.join(source.source_file_name());
        fs::write(&path, self.assemble(source)).await?;
        tracing::debug!("Wrote source {}", path.display());
        Ok(path)
    }
}
