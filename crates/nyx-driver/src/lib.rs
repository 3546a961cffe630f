//! Nyx Compiler Driver Library
//!
//! Incremental compilation of Nyx sources into a single JavaScript bundle.
//! Provides compiler instances that cache per-file work across calls,
//! compose with one another through "uses" edges, and agree on squeezed
//! identifiers across a whole build graph.

pub mod error;
pub mod issue;
pub mod hooks;
pub mod options;
pub mod squeezer;
pub mod symbols;
pub mod unit;
pub mod model;
pub mod frontend;
pub mod patch;
pub mod resolver;
pub mod dep_graph;
pub mod generator;
pub mod source_map;
pub mod output;
pub mod typecheck;
pub mod compiler;

pub use compiler::{Committed, CompilerInstance};
pub use error::{CompileError, CompileResult, CompositionError, ConfigError, FileError};
pub use frontend::{CodeGenerator, DeclarationBuilder, SourceParser, Toolchain};
pub use hooks::{CallbackFile, Hook, Interceptor};
pub use issue::Issue;
pub use options::{CompilerOptions, OutputLanguage, RawOptions, SourceFile};
pub use output::CompileOutput;
pub use squeezer::Squeezer;
pub use symbols::{symbolicate, Unsqueeze};
pub use typecheck::pool::{configure_shared_pool, TypecheckPool, TypeWorker};
