use log::error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// What the user is told when a compilation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub title: String,
    /// Best-effort error text, from the log or else stderr.
    pub detail: Option<String>,
    /// The log to consult for the full story.
    pub log: Option<PathBuf>,
}

impl Diagnostic {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            detail: None,
            log: None,
        }
    }

    /// Attaches `detail` unless it is blank.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let trimmed = detail.trim();
        self.detail = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn with_log(mut self, log: impl Into<PathBuf>) -> Self {
        self.log = Some(log.into());
        self
    }

    /// Writes the diagnostic to the error log.
    pub fn report(&self) {
        error!("compilation failed- {}", self.title);
        if let Some(detail) = &self.detail {
            error!("{}", detail);
        }
        if let Some(log) = &self.log {
            error!("see {} for more information.", log.display());
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Fatal outcomes of a compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid compile request: {0}")]
    InvalidRequest(String),

    #[error("failed to run {program}: {source}")]
    ToolInvocation {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    MissingDependency(Diagnostic),

    #[error("{0}")]
    MissingLog(Diagnostic),

    #[error("{0}")]
    Engine(Diagnostic),

    #[error("{0}")]
    Index(Diagnostic),

    #[error("{0}")]
    Bibliography(Diagnostic),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CompileError {
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            CompileError::MissingDependency(d)
            | CompileError::MissingLog(d)
            | CompileError::Engine(d)
            | CompileError::Index(d)
            | CompileError::Bibliography(d) => Some(d),
            _ => None,
        }
    }

    /// Writes the failure to the error log.
    pub fn report(&self) {
        match self.diagnostic() {
            Some(diagnostic) => diagnostic.report(),
            None => error!("compilation failed- {}", self),
        }
    }
}
