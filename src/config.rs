//src/config.rs

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::filter::Thresholds;
use crate::parse::ParseOptions;
use crate::rank::{RankConfig, RankKey, ToleranceWindow};
use crate::types::{InputFormat, SearchMode};

/// Output base name used when reading standard input.
pub const DEFAULT_OUTPUT_BASE: &str = "BLASTQC.out";

/// Everything a run needs, as handed over by the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// `None` reads standard input.
    pub input: Option<PathBuf>,
    pub format: InputFormat,
    pub mode: SearchMode,
    /// Reports go to `<base>.hits.txt`, `<base>.nohits.txt` and `<base>.hits.header`.
    pub output_base: PathBuf,
    /// Hits reported per query; 0 reports all.
    pub max_hits: usize,
    pub thresholds: Thresholds,
    pub order: RankKey,
    pub evalue_window: f64,
    pub bitscore_window: f64,
    pub identity_window: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input: None,
            format: InputFormat::Xml,
            mode: SearchMode::Nucleotide,
            output_base: PathBuf::from(DEFAULT_OUTPUT_BASE),
            max_hits: 0,
            thresholds: Thresholds::default(),
            order: RankKey::Evalue,
            evalue_window: 0.0,
            bitscore_window: 0.0,
            identity_window: 0.0,
        }
    }
}

impl RunConfig {
    /// Check the threshold/window/ordering combination before any input is read.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let numbers = [
            ("evalue", self.thresholds.max_evalue),
            ("bitscore", self.thresholds.min_bitscore),
            ("identity", self.thresholds.min_pct_identity),
            ("erange", self.evalue_window),
            ("brange", self.bitscore_window),
            ("irange", self.identity_window),
        ];
        if let Some(&(name, _)) = numbers.iter().find(|(_, v)| v.is_nan()) {
            return Err(ConfigError::NanThreshold(name));
        }

        let windows = [self.evalue_window, self.bitscore_window, self.identity_window];
        if let Some(&w) = windows.iter().find(|w| **w < 0.0) {
            return Err(ConfigError::NegativeWindow(w));
        }
        if windows.iter().filter(|w| **w != 0.0).count() > 1 {
            return Err(ConfigError::ConflictingWindows);
        }

        if self.evalue_window != 0.0 && self.order != RankKey::Evalue {
            return Err(ConfigError::EvalueWindowOrder);
        }
        if self.bitscore_window != 0.0 && self.order != RankKey::Bitscore {
            return Err(ConfigError::BitscoreWindowOrder);
        }
        if self.identity_window != 0.0 && self.order != RankKey::Identity {
            return Err(ConfigError::IdentityWindowOrder);
        }
        Ok(())
    }

    /// The active tolerance window, if any. Assumes `validate` passed.
    pub fn window(&self) -> ToleranceWindow {
        if self.evalue_window != 0.0 {
            ToleranceWindow::Evalue(self.evalue_window)
        } else if self.bitscore_window != 0.0 {
            ToleranceWindow::Bitscore(self.bitscore_window)
        } else if self.identity_window != 0.0 {
            ToleranceWindow::Identity(self.identity_window)
        } else {
            ToleranceWindow::None
        }
    }

    pub fn rank_config(&self) -> RankConfig {
        RankConfig {
            key: self.order,
            window: self.window(),
            max_hits: self.max_hits,
        }
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            mode: self.mode,
            thresholds: self.thresholds,
            needs_definitions: self.order == RankKey::DefinitionLevel
                || self.window() != ToleranceWindow::None
                || self.thresholds.min_def_level > 0,
        }
    }
}

/// Base name for the reports when none is given: the input path without its
/// extension (and without `.gz`), or `BLASTQC.out` for standard input.
pub fn default_output_base(input: Option<&Path>) -> PathBuf {
    let Some(path) = input else {
        return PathBuf::from(DEFAULT_OUTPUT_BASE);
    };
    let mut base = path.to_path_buf();
    if base.extension().is_some_and(|ext| ext == "gz") {
        base.set_extension("");
    }
    base.set_extension("");
    base
}
