use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use texmk_build::{cleaner, generate_pdf, BibEngine, BuildConfig, CompileRequest};
use texmk_log::{read_log, LogScanner, TexLiveLogScanner, MISSING_FONT_LOG};

#[derive(Parser)]
#[command(name = "texmk")]
#[command(about = "Compile LaTeX documents to PDF, installing missing packages on the way", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .tex file to PDF
    Compile(CompileArgs),
    /// Remove the auxiliary files of a .tex file
    Clean {
        #[arg(value_name = "FILE")]
        input: PathBuf,
        /// Directory holding the auxiliary files, relative to the input
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Classify an engine log and emit the signal as JSON
    Scan {
        /// Path to the .log file
        #[arg(value_name = "FILE")]
        log: PathBuf,
        /// The engine exited with an error
        #[arg(long)]
        failed: bool,
        /// File holding the engine's captured stderr
        #[arg(long)]
        stderr: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BibArg {
    Citeproc,
    Natbib,
    Biblatex,
}

impl From<BibArg> for BibEngine {
    fn from(arg: BibArg) -> Self {
        match arg {
            BibArg::Citeproc => BibEngine::Citeproc,
            BibArg::Natbib => BibEngine::Natbib,
            BibArg::Biblatex => BibEngine::Biblatex,
        }
    }
}

#[derive(Args)]
struct CompileArgs {
    #[arg(value_name = "FILE")]
    input: PathBuf,
    /// JSON configuration; defaults to texmk.json next to the input
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// PDF engine (pdflatex, xelatex, lualatex)
    #[arg(long)]
    engine: Option<String>,
    /// Extra option passed to the PDF engine
    #[arg(long = "engine-opt", value_name = "OPT", allow_hyphen_values = true)]
    engine_opts: Vec<String>,
    #[arg(long, value_enum)]
    bib_engine: Option<BibArg>,
    /// Index engine (makeindex, xindy, texindy)
    #[arg(long)]
    index_engine: Option<String>,
    /// Extra option passed to the index engine
    #[arg(long = "index-opt", value_name = "OPT", allow_hyphen_values = true)]
    index_opts: Vec<String>,
    /// Output directory, relative to the input's directory
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Extra directory searched for inputs and bibliography styles
    #[arg(long)]
    tex_input_dir: Option<PathBuf>,
    #[arg(long)]
    min_runs: Option<u32>,
    #[arg(long)]
    max_runs: Option<u32>,
    /// Never install missing packages
    #[arg(long)]
    no_auto_install: bool,
    /// Only report warnings and errors
    #[arg(short, long)]
    quiet: bool,
    /// Remove auxiliary files after a successful compilation
    #[arg(long)]
    clean: bool,
}

impl CompileArgs {
    fn into_request(self) -> anyhow::Result<CompileRequest> {
        let config = match &self.config {
            Some(path) => BuildConfig::load(path)
                .with_context(|| format!("reading {}", path.display()))?,
            None => {
                let dir = match self.input.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent,
                    _ => Path::new("."),
                };
                BuildConfig::discover(dir)?.unwrap_or_default()
            }
        };

        let mut request = config.into_request(self.input);
        if let Some(engine) = self.engine {
            request.engine.pdf_engine = engine;
        }
        if !self.engine_opts.is_empty() {
            request.engine.pdf_engine_opts = self.engine_opts;
        }
        if let Some(bib) = self.bib_engine {
            request.engine.bib_engine = bib.into();
        }
        if let Some(index) = self.index_engine {
            request.engine.index_engine = index;
        }
        if !self.index_opts.is_empty() {
            request.engine.index_engine_opts = self.index_opts;
        }
        if self.output_dir.is_some() {
            request.output_dir = self.output_dir;
        }
        if self.tex_input_dir.is_some() {
            request.tex_input_dir = self.tex_input_dir;
        }
        if let Some(min_runs) = self.min_runs {
            request.min_runs = min_runs;
        }
        if let Some(max_runs) = self.max_runs {
            request.max_runs = max_runs;
        }
        if self.no_auto_install {
            request.auto_install = false;
        }
        request.quiet |= self.quiet;
        request.clean |= self.clean;
        Ok(request)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile(args) => {
            let request = args.into_request()?;
            match generate_pdf(request).await {
                Ok(outcome) => {
                    println!("{}", outcome.output.display());
                    Ok(ExitCode::SUCCESS)
                }
                // Already reported through the log.
                Err(_) => Ok(ExitCode::FAILURE),
            }
        }
        Commands::Clean { input, output_dir } => {
            let mut request = CompileRequest::new(input);
            request.output_dir = output_dir;
            let stem = request
                .stem()
                .with_context(|| format!("{} does not name a file", request.input.display()))?;
            for path in cleaner::cleanup(&request.working_dir(), stem)? {
                println!("removed {}", path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Scan {
            log,
            failed,
            stderr,
        } => {
            let text = read_log(&log);
            let stderr = match stderr {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => String::new(),
            };
            let missfont = log
                .parent()
                .and_then(|dir| read_log(&dir.join(MISSING_FONT_LOG)));

            let signal = TexLiveLogScanner::new().inspect(
                text.as_deref(),
                &stderr,
                !failed,
                missfont.as_deref(),
            );
            println!("{}", serde_json::to_string_pretty(&signal)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "texmk",
            "compile",
            "does-not-exist/paper.tex",
            "--engine",
            "xelatex",
            "--engine-opt",
            "-shell-escape",
            "--bib-engine",
            "natbib",
            "--max-runs",
            "3",
            "--no-auto-install",
            "--clean",
        ]);
        let Commands::Compile(args) = cli.command else {
            panic!("expected compile");
        };

        let request = args.into_request().unwrap();
        assert_eq!(request.engine.pdf_engine, "xelatex");
        assert_eq!(request.engine.pdf_engine_opts, vec!["-shell-escape".to_string()]);
        assert_eq!(request.engine.bib_engine, BibEngine::Natbib);
        assert_eq!(request.min_runs, 1);
        assert_eq!(request.max_runs, 3);
        assert!(!request.auto_install);
        assert!(request.clean);
        assert!(!request.quiet);
    }
}
