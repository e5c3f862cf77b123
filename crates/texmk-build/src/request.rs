use crate::error::CompileError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_MIN_RUNS: u32 = 1;
const DEFAULT_MAX_RUNS: u32 = 10;

/// How citations are processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BibEngine {
    /// Citations are resolved before LaTeX sees the document.
    #[default]
    Citeproc,
    Natbib,
    Biblatex,
}

impl BibEngine {
    /// The external tool that processes this style's bibliography data.
    pub fn tool(self) -> BibliographyTool {
        match self {
            BibEngine::Natbib => BibliographyTool::Bibtex,
            BibEngine::Citeproc | BibEngine::Biblatex => BibliographyTool::Biber,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BibliographyTool {
    Bibtex,
    Biber,
}

impl BibliographyTool {
    pub fn program(self) -> &'static str {
        match self {
            BibliographyTool::Bibtex => "bibtex",
            BibliographyTool::Biber => "biber",
        }
    }

    /// Extension of the control file the engine writes for this tool.
    pub fn control_extension(self) -> &'static str {
        match self {
            BibliographyTool::Bibtex => "aux",
            BibliographyTool::Biber => "bcf",
        }
    }
}

/// The programs used for one compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfEngine {
    pub pdf_engine: String,
    pub pdf_engine_opts: Vec<String>,
    pub bib_engine: BibEngine,
    pub index_engine: String,
    pub index_engine_opts: Vec<String>,
}

impl Default for PdfEngine {
    fn default() -> Self {
        Self {
            pdf_engine: "pdflatex".to_string(),
            pdf_engine_opts: Vec::new(),
            bib_engine: BibEngine::default(),
            index_engine: "makeindex".to_string(),
            index_engine_opts: Vec::new(),
        }
    }
}

impl PdfEngine {
    pub fn new(pdf_engine: impl Into<String>) -> Self {
        Self {
            pdf_engine: pdf_engine.into(),
            ..Self::default()
        }
    }

    pub fn with_bib_engine(mut self, bib_engine: BibEngine) -> Self {
        self.bib_engine = bib_engine;
        self
    }

    pub fn with_index_engine(mut self, index_engine: impl Into<String>) -> Self {
        self.index_engine = index_engine.into();
        self
    }
}

/// Everything needed to turn one `.tex` file into a PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRequest {
    pub input: PathBuf,
    /// Directory for the PDF and auxiliary files, relative to the input's
    /// directory.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Extra directory searched for inputs and bibliography styles.
    #[serde(default)]
    pub tex_input_dir: Option<PathBuf>,
    #[serde(default)]
    pub engine: PdfEngine,
    #[serde(default = "default_min_runs")]
    pub min_runs: u32,
    #[serde(default = "default_max_runs")]
    pub max_runs: u32,
    #[serde(default = "default_auto_install")]
    pub auto_install: bool,
    #[serde(default)]
    pub quiet: bool,
    /// Remove auxiliary files after a successful compilation.
    #[serde(default)]
    pub clean: bool,
}

fn default_min_runs() -> u32 {
    DEFAULT_MIN_RUNS
}

fn default_max_runs() -> u32 {
    DEFAULT_MAX_RUNS
}

fn default_auto_install() -> bool {
    true
}

impl CompileRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: None,
            tex_input_dir: None,
            engine: PdfEngine::default(),
            min_runs: DEFAULT_MIN_RUNS,
            max_runs: DEFAULT_MAX_RUNS,
            auto_install: true,
            quiet: false,
            clean: false,
        }
    }

    pub fn with_engine(mut self, engine: PdfEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_tex_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tex_input_dir = Some(dir.into());
        self
    }

    pub fn with_runs(mut self, min_runs: u32, max_runs: u32) -> Self {
        self.min_runs = min_runs;
        self.max_runs = max_runs;
        self
    }

    pub fn with_auto_install(mut self, auto_install: bool) -> Self {
        self.auto_install = auto_install;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Minimum number of engine passes; zero means the default.
    pub fn effective_min_runs(&self) -> u32 {
        if self.min_runs == 0 { DEFAULT_MIN_RUNS } else { self.min_runs }
    }

    /// Maximum number of engine passes; zero means the default.
    pub fn effective_max_runs(&self) -> u32 {
        if self.max_runs == 0 { DEFAULT_MAX_RUNS } else { self.max_runs }
    }

    pub fn validate(&self) -> Result<(), CompileError> {
        if self.stem().is_none() {
            return Err(CompileError::InvalidRequest(format!(
                "{} does not name a file",
                self.input.display()
            )));
        }
        if self.effective_min_runs() > self.effective_max_runs() {
            return Err(CompileError::InvalidRequest(format!(
                "min_runs ({}) exceeds max_runs ({})",
                self.effective_min_runs(),
                self.effective_max_runs()
            )));
        }
        Ok(())
    }

    /// The directory containing the input, where every tool runs.
    pub fn input_dir(&self) -> &Path {
        match self.input.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    pub fn file_name(&self) -> Option<&str> {
        self.input.file_name().and_then(|name| name.to_str())
    }

    pub fn stem(&self) -> Option<&str> {
        self.input.file_stem().and_then(|stem| stem.to_str())
    }

    /// Where the engine writes its output and auxiliary files.
    pub fn working_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => self.input_dir().join(dir),
            None => self.input_dir().to_path_buf(),
        }
    }

    /// `<working dir>/<stem>.<extension>`.
    pub fn artifact(&self, extension: &str) -> PathBuf {
        let stem = self.stem().unwrap_or_default();
        self.working_dir().join(format!("{stem}.{extension}"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.artifact("log")
    }

    pub fn output_path(&self) -> PathBuf {
        self.artifact("pdf")
    }
}
