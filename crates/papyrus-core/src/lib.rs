//! Papyrus Core
//!
//! Value types shared by every stage of the Papyrus compiler:
//!
//! - [`location`]: Source locations (`file(line,column)`) and partial views
//! - [`caseless`]: Case-insensitive name keys (Papyrus identifiers ignore case)
//! - [`diagnostics`]: The warning/error/fatal reporting sink
//! - [`config`]: Compiler configuration
//!
//! The compiler machinery itself lives in the `papyrus-compiler` crate.

pub mod caseless;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod location;

pub use caseless::{caseless_eq, CaselessStr, CaselessString};
pub use config::CompilerConfig;
pub use diagnostics::{Diagnostic, Diagnostics, Severity, Warning};
pub use error::Fatal;
pub use location::{FileLocation, PartialLocation};
