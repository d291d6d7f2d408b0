//! The fatal error type threaded through the compiler.
//!
//! Resolution and emission APIs return `Result<T, Fatal>`; a `Fatal` aborts
//! the current compilation job immediately. Accumulating (non-fatal) errors
//! live in the [`Diagnostics`](crate::diagnostics::Diagnostics) sink and are
//! promoted to a `Fatal` at phase boundaries by `check_errors`.

use thiserror::Error;

/// An unrecoverable compilation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fatal {
    /// A fatal diagnostic, already rendered with its location prefix.
    #[error("{0}")]
    Compile(String),

    /// A compiler-invariant violation. Seeing one of these is a bug in the
    /// compiler, not in the script being compiled.
    #[error("internal compiler error: {0}")]
    Logical(String),

    /// Raised at a phase boundary when non-fatal errors have accumulated.
    #[error("compilation aborted after {0} error(s)")]
    Errors(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let f = Fatal::Compile("a.psc(1,0): Unable to resolve type 'Foo'!".into());
        assert_eq!(
            format!("{}", f),
            "a.psc(1,0): Unable to resolve type 'Foo'!"
        );

        let l = Fatal::Logical("Unresolved label!".into());
        assert_eq!(format!("{}", l), "internal compiler error: Unresolved label!");

        let e = Fatal::Errors(3);
        assert_eq!(format!("{}", e), "compilation aborted after 3 error(s)");
    }

    #[test]
    fn implements_std_error() {
        let f = Fatal::Errors(1);
        let _: &dyn std::error::Error = &f;
    }
}
