use crate::request::{BibliographyTool, CompileRequest, PdfEngine};
use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// The captured result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineResult {
    pub program: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// The tool's log. It may not exist.
    pub log: PathBuf,
    /// The file the invocation is expected to produce, if any.
    pub output: Option<PathBuf>,
}

impl EngineResult {
    /// A zero exit status is only success if the declared output exists.
    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.output.as_deref().is_none_or(Path::exists)
    }

    pub fn read_log(&self) -> Option<String> {
        texmk_log::read_log(&self.log)
    }

    /// The tool's own error output, falling back to stdout.
    pub fn tool_output(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() { self.stdout.trim() } else { stderr }
    }
}

/// The external programs a compilation drives.
///
/// An `Err` means the program could not be started at all; a program that
/// ran and failed is an `Ok` with a nonzero exit code.
#[async_trait]
pub trait Toolchain: Send + Sync {
    async fn run_pdf_engine(&self, request: &CompileRequest) -> io::Result<EngineResult>;

    async fn run_index_engine(&self, index_file: &Path, engine: &PdfEngine)
    -> io::Result<EngineResult>;

    /// Runs `tool` on `control_file`, a path relative to `cwd`.
    async fn run_bib_engine(
        &self,
        tool: BibliographyTool,
        control_file: &Path,
        cwd: &Path,
    ) -> io::Result<EngineResult>;
}

/// Runs the real programs found on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct ProcessToolchain;

impl ProcessToolchain {
    pub fn new() -> Self {
        Self
    }

    async fn run(
        program: &str,
        args: &[OsString],
        cwd: &Path,
        env: &[(&str, OsString)],
        log: PathBuf,
        output: Option<PathBuf>,
    ) -> io::Result<EngineResult> {
        log::debug!("Running {} {:?} in {}", program, args, cwd.display());

        let result = Command::new(program)
            .args(args)
            .envs(env.iter().map(|(key, value)| (*key, value)))
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(EngineResult {
            program: program.to_string(),
            exit_code: result.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            log,
            output,
        })
    }
}

/// A search path entry that keeps the default path after it.
fn search_path(dir: &Path) -> OsString {
    let mut value = dir.as_os_str().to_os_string();
    value.push(if cfg!(windows) { ";" } else { ":" });
    value
}

/// Arguments for a PDF engine pass, run from the input's directory.
pub(crate) fn pdf_engine_args(request: &CompileRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = request
        .engine
        .pdf_engine_opts
        .iter()
        .map(OsString::from)
        .collect();
    args.push("-interaction=batchmode".into());
    args.push("-halt-on-error".into());
    if let Some(dir) = &request.output_dir {
        let mut arg = OsString::from("-output-directory=");
        arg.push(dir.as_os_str());
        args.push(arg);
    }
    args.push(request.file_name().unwrap_or_default().into());
    args
}

#[async_trait]
impl Toolchain for ProcessToolchain {
    async fn run_pdf_engine(&self, request: &CompileRequest) -> io::Result<EngineResult> {
        let env: Vec<(&str, OsString)> = match &request.tex_input_dir {
            Some(dir) => vec![("TEXINPUTS", search_path(dir)), ("BSTINPUTS", search_path(dir))],
            None => Vec::new(),
        };
        Self::run(
            &request.engine.pdf_engine,
            &pdf_engine_args(request),
            request.input_dir(),
            &env,
            request.log_path(),
            Some(request.output_path()),
        )
        .await
    }

    async fn run_index_engine(
        &self,
        index_file: &Path,
        engine: &PdfEngine,
    ) -> io::Result<EngineResult> {
        let cwd = match index_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut args: Vec<OsString> = engine.index_engine_opts.iter().map(OsString::from).collect();
        args.push(index_file.file_name().unwrap_or_default().to_os_string());

        Self::run(
            &engine.index_engine,
            &args,
            cwd,
            &[],
            index_file.with_extension("ilg"),
            None,
        )
        .await
    }

    async fn run_bib_engine(
        &self,
        tool: BibliographyTool,
        control_file: &Path,
        cwd: &Path,
    ) -> io::Result<EngineResult> {
        Self::run(
            tool.program(),
            &[control_file.as_os_str().to_os_string()],
            cwd,
            &[],
            cwd.join(control_file).with_extension("blg"),
            None,
        )
        .await
    }
}
