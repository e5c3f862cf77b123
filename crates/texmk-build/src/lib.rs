//! # texmk Build
//!
//! Drives a LaTeX document to a finished PDF: as many engine passes as the
//! references need, index and bibliography tools when the document uses them,
//! and missing packages installed on the way.
//!
//! ## Modules
//!
//! - [`request`] - What to compile and with which programs
//! - [`config`] - Project defaults from `texmk.json`
//! - [`invoker`] - The [`Toolchain`] seam over the external programs
//! - [`stage`] - The compilation state machine
//! - [`orchestrator`] - Stage handlers and the top-level [`generate_pdf`]
//! - [`cleaner`] - Removal of auxiliary files
//! - [`error`] - [`CompileError`] and the user-facing [`Diagnostic`]
//!
//! ```no_run
//! use texmk_build::{CompileRequest, generate_pdf};
//!
//! # async fn demo() -> Result<(), texmk_build::CompileError> {
//! let request = CompileRequest::new("paper.tex").with_runs(1, 5);
//! let outcome = generate_pdf(request).await?;
//! println!("{} after {} passes", outcome.output.display(), outcome.passes);
//! # Ok(())
//! # }
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod invoker;
pub mod orchestrator;
pub mod request;
pub mod stage;

pub use config::BuildConfig;
pub use error::{CompileError, Diagnostic};
pub use invoker::{EngineResult, ProcessToolchain, Toolchain};
pub use orchestrator::{CompileOutcome, Orchestrator, generate_pdf};
pub use request::{BibEngine, BibliographyTool, CompileRequest, PdfEngine};
pub use stage::{Progress, Stage, Step};
