//! Compilation driver
//!
//! Owns the diagnostic reporter and the frontend configuration for a run
//! over one or more source files.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::common::{CompileResult, DiagnosticReporter};
use crate::frontend::{self, Analysis, CompileContext, FrontendConfig};

/// Checks source files and reports the first error of each
pub struct Driver {
    reporter: DiagnosticReporter,
    config: FrontendConfig,
}

impl Driver {
    pub fn new(config: FrontendConfig) -> Self {
        Self {
            reporter: DiagnosticReporter::new(),
            config,
        }
    }

    /// Check in-memory source registered under `filename`
    pub fn check_source(&mut self, filename: &str, source: &str) -> CompileResult<Analysis> {
        let file_id = self.reporter.add_file(filename, source);
        debug!(filename, file_id, bytes = source.len(), "registered source");

        let ctx = CompileContext::new(filename.to_string(), file_id, &self.reporter);
        frontend::compile(source, &ctx, &self.config)
    }

    /// Read and check a file from disk
    pub fn check_file(&mut self, path: &Path) -> CompileResult<Analysis> {
        let source = fs::read_to_string(path)?;
        self.check_source(&path.display().to_string(), &source)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new(FrontendConfig::default())
    }
}
