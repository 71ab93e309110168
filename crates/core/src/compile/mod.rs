//! Compilation of the `jeka-src` sources, gated by a freshness flag.

pub mod compiler;
pub mod source_parser;
pub mod tracker;

pub use compiler::{CompileOutcome, CompileSpec, Compiler, ProcessCompiler};
pub use source_parser::{ParsedSourceInfo, SourceParser};
pub use tracker::CompilationTracker;
