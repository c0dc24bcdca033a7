//! Core utilities for the Slate language toolchain.
//!
//! This crate provides the core compiler pipeline for the Slate
//! language. The pipeline is roughly:
//!
//!   source .slate
//!     -> lexer      (tokens)
//!     -> parser     (AST, with recovery at statement boundaries)
//!     -> typecheck  (symbol table + typed HIR)
//!     -> codegen_c  (C translation unit against the Slate runtime)
//!
//! Higher-level tools (CLI, build integrations, etc.) should depend on
//! this crate rather than reimplementing the pipeline.

// ---------------------------------------------------------------------
// Error handling and diagnostics
// ---------------------------------------------------------------------

pub mod span;
pub mod diagnostic;
pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod lexer;
pub mod parser;
pub mod ast;

// ---------------------------------------------------------------------
// Semantic layers: types, symbols, type checking, HIR
// ---------------------------------------------------------------------

pub mod types;
pub mod symbols;
pub mod typecheck;
pub mod hir;

// ---------------------------------------------------------------------
// Runtime interface
// ---------------------------------------------------------------------

pub mod runtime;

// ---------------------------------------------------------------------
// Back-end: code generation and compiler orchestration
// ---------------------------------------------------------------------

pub mod codegen_c;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{CompilationArtifact, CompileOptions, compile};
pub use error::CoreError;
