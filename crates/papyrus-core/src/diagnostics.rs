//! The diagnostics sink.
//!
//! Three severities, matching the engine's compiler:
//!
//! - **warnings** are numbered, carry a location, and never halt;
//! - **errors** accumulate and halt at the next phase boundary
//!   ([`Diagnostics::check_errors`]);
//! - **fatals** halt immediately ([`Diagnostics::fatal`] returns the
//!   [`Fatal`] for the caller to propagate with `?`).
//!
//! `logical_fatal` is reserved for compiler-invariant violations.

use std::fmt;

use crate::error::Fatal;
use crate::location::FileLocation;

/// A numbered, non-halting diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// W4002: a script was imported more than once.
    DuplicateImport { name: String },
}

impl Warning {
    pub fn code(&self) -> u32 {
        match self {
            Warning::DuplicateImport { .. } => 4002,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DuplicateImport { name } => {
                write!(f, "Duplicate import of '{}'.", name)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}

/// A single rendered report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub location: Option<FileLocation>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(loc) = &self.location {
            write!(f, "{}: {}", loc, self.message)
        } else {
            f.write_str(&self.message)
        }
    }
}

/// Collects warnings and errors for one compilation job.
#[derive(Debug, Default)]
pub struct Diagnostics {
    reports: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning(&mut self, location: &FileLocation, warning: Warning) {
        self.warning_count += 1;
        self.reports.push(Diagnostic {
            severity: Severity::Warning,
            location: Some(location.clone()),
            message: format!("warning W{}: {}", warning.code(), warning),
        });
    }

    pub fn error(&mut self, location: &FileLocation, message: impl Into<String>) {
        self.error_count += 1;
        self.reports.push(Diagnostic {
            severity: Severity::Error,
            location: Some(location.clone()),
            message: message.into(),
        });
    }

    /// Record a fatal diagnostic and return it for propagation.
    #[must_use]
    pub fn fatal(&mut self, location: &FileLocation, message: impl Into<String>) -> Fatal {
        let message = message.into();
        self.reports.push(Diagnostic {
            severity: Severity::Fatal,
            location: Some(location.clone()),
            message: message.clone(),
        });
        Fatal::Compile(format!("{}: {}", location, message))
    }

    /// A compiler bug, not a script error.
    #[must_use]
    pub fn logical_fatal(&mut self, message: impl Into<String>) -> Fatal {
        let message = message.into();
        self.reports.push(Diagnostic {
            severity: Severity::Fatal,
            location: None,
            message: message.clone(),
        });
        Fatal::Logical(message)
    }

    /// The phase-boundary gate: fails if any errors have accumulated.
    pub fn check_errors(&self) -> Result<(), Fatal> {
        if self.error_count > 0 {
            return Err(Fatal::Errors(self.error_count));
        }
        Ok(())
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn reports(&self) -> &[Diagnostic] {
        &self.reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> FileLocation {
        FileLocation::new("Test.psc", 7, 2)
    }

    #[test]
    fn warnings_do_not_halt() {
        let mut diags = Diagnostics::new();
        diags.warning(&loc(), Warning::DuplicateImport { name: "Utility".into() });

        assert_eq!(diags.warning_count(), 1);
        assert_eq!(diags.error_count(), 0);
        assert!(diags.check_errors().is_ok());
    }

    #[test]
    fn duplicate_import_is_w4002() {
        let mut diags = Diagnostics::new();
        diags.warning(&loc(), Warning::DuplicateImport { name: "Utility".into() });

        let rendered = format!("{}", diags.reports()[0]);
        assert!(rendered.starts_with("Test.psc(7,2): warning W4002:"));
        assert!(rendered.contains("Utility"));
    }

    #[test]
    fn errors_accumulate_and_trip_the_gate() {
        let mut diags = Diagnostics::new();
        diags.error(&loc(), "first");
        diags.error(&loc(), "second");

        assert_eq!(diags.error_count(), 2);
        assert_eq!(diags.check_errors(), Err(Fatal::Errors(2)));
    }

    #[test]
    fn fatal_renders_location_prefix() {
        let mut diags = Diagnostics::new();
        let f = diags.fatal(&loc(), "Unable to resolve type 'Foo'!");
        assert_eq!(
            f,
            Fatal::Compile("Test.psc(7,2): Unable to resolve type 'Foo'!".into())
        );
        assert_eq!(diags.reports().len(), 1);
    }

    #[test]
    fn logical_fatal_has_no_location() {
        let mut diags = Diagnostics::new();
        let f = diags.logical_fatal("Unresolved label!");
        assert_eq!(f, Fatal::Logical("Unresolved label!".into()));
        assert!(diags.reports()[0].location.is_none());
    }
}
