//! Papyrus Compiler
//!
//! The semantic analysis and bytecode emission core of the Papyrus
//! compiler. Parsing (`.psc` source, `.pas` disassembly, `.pex` bytecode)
//! is an external concern behind the [`loader::Frontend`] seam; the driver
//! and on-disk writer are likewise external.
//!
//! ## Modules
//!
//! - [`ty`]: The type algebra
//! - [`value`]: Literal values
//! - [`ast`]: Script entities, expressions and statements
//! - [`ident`]: Resolved name-sites
//! - [`loader`]: On-demand script loading with per-job caching
//! - [`context`]: The per-script resolution context
//! - [`coerce`]: Implicit coercion and explicit cast rules
//! - [`pex`]: The instruction set and the function builder
//!
//! ## Compilation flow
//!
//! The driver obtains the root [`ast::Script`] from the frontend, creates a
//! [`loader::ScriptLoader`] for the job, and runs [`ast::Script::semantic`].
//! The pass resolves names and types, pulling reference scripts in through
//! the loader as it encounters them. Emission then lowers each function
//! through a [`pex::FunctionBuilder`] into a [`pex::PexFunction`] and its
//! debug line map, ready for the external writer.

pub mod ast;
pub mod coerce;
pub mod context;
pub mod ident;
pub mod loader;
pub mod pex;
pub mod ty;
pub mod value;

pub use ast::{Expression, Script, Statement};
pub use coerce::coerce_expression_free;
pub use context::ResolutionContext;
pub use ident::{ArrayFunctionKind, IdentKind, Identifier};
pub use loader::{Frontend, ScriptLoader};
pub use ty::{Ty, TyKind};
pub use value::{Value, ValueKind};
