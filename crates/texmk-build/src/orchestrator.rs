use crate::cleaner;
use crate::error::{CompileError, Diagnostic};
use crate::invoker::{EngineResult, ProcessToolchain, Toolchain};
use crate::request::{BibliographyTool, CompileRequest};
use crate::stage::{Progress, Stage, Step};
use log::{info, warn};
use std::io;
use std::path::{Path, PathBuf};
use texmk_log::{
    LogScanner, MISSING_FONT_LOG, RecompilationSignal, SearchTerm, TexLiveLogScanner,
    contains_biblio_data, read_log, strip_bibdata_extensions,
};
use texmk_package::{PackageManager, PackageResolver};

/// What a successful compilation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutcome {
    pub output: PathBuf,
    /// Engine passes made, including retries after installing packages.
    pub passes: u32,
    /// The engine still asked for another pass when `max_runs` was reached.
    pub budget_exhausted: bool,
}

/// Compiles `request` with the programs on `PATH` and the detected package
/// manager.
pub async fn generate_pdf(request: CompileRequest) -> Result<CompileOutcome, CompileError> {
    Orchestrator::new(request, ProcessToolchain::new(), PackageManager::new())
        .run()
        .await
}

enum Invocation<'a> {
    PdfEngine,
    IndexEngine(&'a Path),
    BibEngine {
        tool: BibliographyTool,
        control_file: &'a Path,
        cwd: &'a Path,
    },
}

impl Invocation<'_> {
    fn program(&self, request: &CompileRequest) -> String {
        match self {
            Invocation::PdfEngine => request.engine.pdf_engine.clone(),
            Invocation::IndexEngine(_) => request.engine.index_engine.clone(),
            Invocation::BibEngine { tool, .. } => tool.program().to_string(),
        }
    }
}

fn diagnostic(title: &str, detail: &str, log: Option<&Path>) -> Diagnostic {
    let diagnostic = Diagnostic::new(title).with_detail(detail);
    match log {
        Some(log) => diagnostic.with_log(log),
        None => diagnostic,
    }
}

/// Drives one document through the engine, index and bibliography tools
/// until the output is stable.
pub struct Orchestrator<T, S = TexLiveLogScanner> {
    request: CompileRequest,
    toolchain: T,
    scanner: S,
    resolver: PackageResolver,
    strip_bib_extensions: bool,
}

impl<T: Toolchain> Orchestrator<T> {
    pub fn new(request: CompileRequest, toolchain: T, manager: PackageManager) -> Self {
        // bibtex outside TeX Live on Windows wants bare database names.
        let strip_bib_extensions = cfg!(windows) && !manager.is_texlive();
        let resolver =
            PackageResolver::new(manager, request.auto_install).with_quiet(request.quiet);
        Self {
            request,
            toolchain,
            scanner: TexLiveLogScanner::new(),
            resolver,
            strip_bib_extensions,
        }
    }
}

impl<T: Toolchain, S: LogScanner> Orchestrator<T, S> {
    pub fn with_scanner<U: LogScanner>(self, scanner: U) -> Orchestrator<T, U> {
        Orchestrator {
            request: self.request,
            toolchain: self.toolchain,
            scanner,
            resolver: self.resolver,
            strip_bib_extensions: self.strip_bib_extensions,
        }
    }

    /// Whether `.bib` is removed from `\bibdata` before bibtex runs.
    pub fn with_strip_bib_extensions(mut self, strip: bool) -> Self {
        self.strip_bib_extensions = strip;
        self
    }

    pub fn request(&self) -> &CompileRequest {
        &self.request
    }

    pub fn initial_progress(&self) -> Progress {
        Progress::new(
            self.request.effective_min_runs(),
            self.request.effective_max_runs(),
        )
    }

    /// Runs the whole compilation. A failure has already been reported to the
    /// error log when this returns.
    pub async fn run(mut self) -> Result<CompileOutcome, CompileError> {
        let result = self.compile().await;
        if let Err(e) = &result {
            e.report();
        }
        result
    }

    async fn compile(&mut self) -> Result<CompileOutcome, CompileError> {
        self.request.validate()?;
        self.prepare_workspace()?;

        let mut progress = self.initial_progress();
        let mut stage = Stage::InitialCompile;
        while stage != Stage::Done {
            let step = self.run_stage(stage, &mut progress).await?;
            stage = stage.next(step, &progress);
        }

        if self.request.clean {
            cleaner::cleanup(
                &self.request.working_dir(),
                self.request.stem().unwrap_or_default(),
            )?;
        }

        Ok(CompileOutcome {
            output: self.request.output_path(),
            passes: progress.passes,
            budget_exhausted: progress.budget_exhausted,
        })
    }

    fn prepare_workspace(&self) -> Result<(), CompileError> {
        let dir = self.request.working_dir();
        if dir.is_dir() {
            cleaner::cleanup(&dir, self.request.stem().unwrap_or_default())?;
        } else {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Runs the handler of a single stage.
    pub async fn run_stage(
        &mut self,
        stage: Stage,
        progress: &mut Progress,
    ) -> Result<Step, CompileError> {
        match stage {
            Stage::InitialCompile => self.initial_compile(progress).await,
            Stage::IndexPass => self.index_pass(progress).await,
            Stage::BibliographyPass => self.bibliography_pass(progress).await,
            Stage::RecompileLoop => self.recompile_pass(progress).await,
            Stage::Done => Ok(Step::Advance),
        }
    }

    async fn initial_compile(&mut self, progress: &mut Progress) -> Result<Step, CompileError> {
        let result = self.pdf_pass(progress, Stage::InitialCompile).await?;
        let log = result.read_log();
        let missfont_path = self.request.working_dir().join(MISSING_FONT_LOG);
        let missfont = read_log(&missfont_path);
        let succeeded = result.success();

        if !succeeded && self.resolver.auto_install() {
            self.resolver.refresh_once().await;
        }

        progress.initial_needs_rerun =
            succeeded && log.as_deref().is_some_and(|log| self.scanner.needs_rerun(log));

        let signal = self.scanner.inspect(
            log.as_deref(),
            &result.stderr,
            succeeded,
            missfont.as_deref(),
        );
        match signal {
            RecompilationSignal::NoIssue | RecompilationSignal::NeedsRerun => Ok(Step::Advance),
            RecompilationSignal::MissingHyphenationFile(package) => {
                self.install_hyphenation(package, &result.log).await
            }
            RecompilationSignal::MissingPackages(terms) => {
                let detail = self
                    .scanner
                    .latex_error(log.as_deref().unwrap_or_default(), &result.stderr);
                if !self.resolver.auto_install() {
                    return Err(CompileError::MissingDependency(diagnostic(
                        "missing packages (automatic installation disabled)",
                        &detail,
                        Some(result.log.as_path()),
                    )));
                }
                self.resolve(&terms, &detail, Some(result.log.as_path())).await?;
                // The fonts it lists are installed now.
                if let Err(e) = std::fs::remove_file(&missfont_path) {
                    if e.kind() != io::ErrorKind::NotFound {
                        return Err(e.into());
                    }
                }
                Ok(Step::Retry)
            }
            RecompilationSignal::FatalError(None) => Err(CompileError::MissingLog(diagnostic(
                "no log file was produced",
                result.tool_output(),
                Some(result.log.as_path()),
            ))),
            RecompilationSignal::FatalError(Some(detail)) => Err(CompileError::Engine(
                diagnostic("Error compiling latex", &detail, Some(result.log.as_path())),
            )),
        }
    }

    async fn install_hyphenation(
        &mut self,
        package: String,
        log: &Path,
    ) -> Result<Step, CompileError> {
        if !self.resolver.auto_install() {
            warn!(
                "{} is missing and automatic installation is disabled",
                package
            );
            return Ok(Step::Advance);
        }

        let failure = diagnostic("missing hyphenation file", &package, Some(log));
        if self.resolver.has_installed(&package) {
            return Err(CompileError::MissingDependency(failure));
        }
        let outcome = self
            .resolver
            .install_packages(std::slice::from_ref(&package))
            .await;
        if outcome.success {
            Ok(Step::Retry)
        } else {
            Err(CompileError::MissingDependency(failure))
        }
    }

    /// Searches for and installs packages providing `terms`.
    ///
    /// Packages installed earlier in this compilation are never installed
    /// again, so a file that stays missing ends the compilation.
    async fn resolve(
        &mut self,
        terms: &[SearchTerm],
        detail: &str,
        log: Option<&Path>,
    ) -> Result<(), CompileError> {
        let candidates = self.resolver.search_packages(terms).await;
        if candidates.is_empty() {
            return Err(CompileError::MissingDependency(diagnostic(
                "no matching packages",
                detail,
                log,
            )));
        }

        let fresh: Vec<String> = candidates
            .into_iter()
            .filter(|package| !self.resolver.has_installed(package))
            .collect();
        if fresh.is_empty() {
            return Err(CompileError::MissingDependency(diagnostic(
                "missing packages (automatic installation failed)",
                detail,
                log,
            )));
        }

        let outcome = self.resolver.install_packages(&fresh).await;
        if !outcome.success {
            return Err(CompileError::MissingDependency(diagnostic(
                "package installation error",
                detail,
                log,
            )));
        }
        Ok(())
    }

    async fn index_pass(&mut self, progress: &mut Progress) -> Result<Step, CompileError> {
        let index_file = self.request.artifact("idx");
        if !index_file.is_file() {
            return Ok(Step::Advance);
        }

        self.status("making index");
        let result = self
            .invoke(Invocation::IndexEngine(&index_file), Stage::IndexPass)
            .await?;
        if result.exit_code != 0 {
            return Err(CompileError::Index(diagnostic(
                &format!("error generating index (result code {})", result.exit_code),
                result.tool_output(),
                Some(result.log.as_path()),
            )));
        }
        if let Some(error) = result
            .read_log()
            .and_then(|log| self.scanner.index_error(&log))
        {
            return Err(CompileError::Index(diagnostic(
                "error generating index",
                &error,
                Some(result.log.as_path()),
            )));
        }

        progress.index_created = true;
        Ok(Step::Advance)
    }

    async fn bibliography_pass(&mut self, progress: &mut Progress) -> Result<Step, CompileError> {
        let tool = self.request.engine.bib_engine.tool();
        let control_path = self.request.artifact(tool.control_extension());
        let Ok(control) = std::fs::read(&control_path) else {
            return Ok(Step::Advance);
        };
        if tool == BibliographyTool::Bibtex {
            if !contains_biblio_data(&String::from_utf8_lossy(&control)) {
                return Ok(Step::Advance);
            }
            if self.strip_bib_extensions {
                let stripped = strip_bibdata_extensions(&control);
                if stripped != control {
                    std::fs::write(&control_path, stripped)?;
                }
            }
        }

        self.status("generating bibliography");
        let cwd = self.request.input_dir().to_path_buf();
        let control_file = control_path
            .strip_prefix(&cwd)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| control_path.clone());
        let result = self
            .invoke(
                Invocation::BibEngine {
                    tool,
                    control_file: &control_file,
                    cwd: &cwd,
                },
                Stage::BibliographyPass,
            )
            .await?;
        if result.exit_code == 0 {
            progress.bibliography_created = true;
            return Ok(Step::Advance);
        }

        let failure = diagnostic(
            "error generating bibliography",
            result.tool_output(),
            Some(result.log.as_path()),
        );
        if !self.resolver.auto_install() || progress.bibliography_recovered {
            return Err(CompileError::Bibliography(failure));
        }
        progress.bibliography_recovered = true;

        let Some(style) = result
            .read_log()
            .and_then(|log| self.scanner.bibliography_style_file(&log))
        else {
            return Err(CompileError::Bibliography(failure));
        };
        self.resolve(
            &[SearchTerm::File(style)],
            result.tool_output(),
            Some(result.log.as_path()),
        )
        .await?;
        Ok(Step::Retry)
    }

    async fn recompile_pass(&mut self, progress: &mut Progress) -> Result<Step, CompileError> {
        if progress.recompile_passes >= progress.recompile_budget() {
            warn!("maximum number of runs ({}) reached", progress.max_runs);
            progress.budget_exhausted = true;
            return Ok(Step::Advance);
        }

        let result = self.pdf_pass(progress, Stage::RecompileLoop).await?;
        let log = result.read_log();
        if !result.success() {
            let detail = self
                .scanner
                .latex_error(log.as_deref().unwrap_or_default(), &result.stderr);
            return Err(CompileError::Engine(diagnostic(
                "Error compiling latex",
                &detail,
                Some(result.log.as_path()),
            )));
        }
        progress.recompile_passes += 1;

        let rerun = log.as_deref().is_some_and(|log| self.scanner.needs_rerun(log));
        if progress.wants_another_pass(rerun) {
            Ok(Step::Retry)
        } else {
            Ok(Step::Advance)
        }
    }

    async fn pdf_pass(
        &mut self,
        progress: &mut Progress,
        stage: Stage,
    ) -> Result<EngineResult, CompileError> {
        progress.passes += 1;
        self.status(&format!(
            "running {} - {}",
            self.request.engine.pdf_engine, progress.passes
        ));
        self.invoke(Invocation::PdfEngine, stage).await
    }

    /// Runs a tool. A tool that is not installed is looked up and installed
    /// once when automatic installation is permitted and `stage` resolves
    /// packages at all: only the initial compile and the bibliography pass do.
    async fn invoke(
        &mut self,
        invocation: Invocation<'_>,
        stage: Stage,
    ) -> Result<EngineResult, CompileError> {
        let source = match self.dispatch(&invocation).await {
            Ok(result) => return Ok(result),
            Err(source) => source,
        };
        let program = invocation.program(&self.request);
        let resolves_packages = matches!(stage, Stage::InitialCompile | Stage::BibliographyPass);
        if source.kind() != io::ErrorKind::NotFound
            || !resolves_packages
            || !self.resolver.auto_install()
        {
            return Err(CompileError::ToolInvocation { program, source });
        }

        warn!("{} was not found, looking for a package that provides it", program);
        if let Err(e) = self
            .resolve(&[SearchTerm::File(program.clone())], "", None)
            .await
        {
            log::debug!("Could not install {}: {}", program, e);
            return Err(CompileError::ToolInvocation { program, source });
        }
        self.dispatch(&invocation)
            .await
            .map_err(|source| CompileError::ToolInvocation { program, source })
    }

    async fn dispatch(&self, invocation: &Invocation<'_>) -> io::Result<EngineResult> {
        match invocation {
            Invocation::PdfEngine => self.toolchain.run_pdf_engine(&self.request).await,
            Invocation::IndexEngine(index_file) => {
                self.toolchain
                    .run_index_engine(index_file, &self.request.engine)
                    .await
            }
            Invocation::BibEngine {
                tool,
                control_file,
                cwd,
            } => self.toolchain.run_bib_engine(*tool, control_file, cwd).await,
        }
    }

    fn status(&self, message: &str) {
        if !self.request.quiet {
            info!("{}", message);
        }
    }
}
