//! The compilation state machine.
//!
//! A compilation walks the stages in order. Each stage handler reports a
//! [`Step`] (or fails), and [`Stage::next`] decides where to go from there:
//!
//! | from             | step    | to                                          |
//! |------------------|---------|---------------------------------------------|
//! | InitialCompile   | Retry   | InitialCompile                              |
//! | InitialCompile   | Advance | IndexPass                                   |
//! | IndexPass        | any     | BibliographyPass                            |
//! | BibliographyPass | Retry   | BibliographyPass                            |
//! | BibliographyPass | Advance | RecompileLoop if required, otherwise Done   |
//! | RecompileLoop    | Retry   | RecompileLoop                               |
//! | RecompileLoop    | Advance | Done                                        |

/// Where a compilation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// First engine pass, repeated after each successful package install.
    InitialCompile,
    /// Runs the index tool when the engine wrote an `.idx` file.
    IndexPass,
    /// Runs bibtex or biber when the engine asked for a bibliography.
    BibliographyPass,
    /// Further engine passes until references settle or the budget runs out.
    RecompileLoop,
    Done,
}

/// What a stage handler wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Run the same stage again.
    Retry,
    /// Move on.
    Advance,
}

/// Facts gathered while compiling that drive the transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Progress {
    pub min_runs: u32,
    pub max_runs: u32,
    /// Every engine pass so far, including retries of the initial compile.
    pub passes: u32,
    /// Engine passes made by the recompile loop.
    pub recompile_passes: u32,
    pub initial_needs_rerun: bool,
    pub index_created: bool,
    pub bibliography_created: bool,
    pub bibliography_recovered: bool,
    pub budget_exhausted: bool,
}

impl Progress {
    pub fn new(min_runs: u32, max_runs: u32) -> Self {
        Self {
            min_runs,
            max_runs,
            ..Self::default()
        }
    }

    /// Passes the recompile loop may make after the initial compile.
    pub fn recompile_budget(&self) -> u32 {
        self.max_runs.saturating_sub(1)
    }

    pub fn recompile_required(&self) -> bool {
        (self.index_created
            || self.bibliography_created
            || self.min_runs > 1
            || self.initial_needs_rerun)
            && self.recompile_budget() > 0
    }

    /// Whether the loop should go again after a pass.
    pub fn wants_another_pass(&self, rerun_requested: bool) -> bool {
        rerun_requested || self.recompile_passes < self.min_runs.saturating_sub(1)
    }
}

impl Stage {
    pub fn next(self, step: Step, progress: &Progress) -> Stage {
        match (self, step) {
            (Stage::InitialCompile, Step::Retry) => Stage::InitialCompile,
            (Stage::InitialCompile, Step::Advance) => Stage::IndexPass,
            (Stage::IndexPass, _) => Stage::BibliographyPass,
            (Stage::BibliographyPass, Step::Retry) => Stage::BibliographyPass,
            (Stage::BibliographyPass, Step::Advance) => {
                if progress.recompile_required() {
                    Stage::RecompileLoop
                } else {
                    Stage::Done
                }
            }
            (Stage::RecompileLoop, Step::Retry) => Stage::RecompileLoop,
            (Stage::RecompileLoop, Step::Advance) => Stage::Done,
            (Stage::Done, _) => Stage::Done,
        }
    }
}
