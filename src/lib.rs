//! # mhtml compiler
//!
//! Compiles an HTML-superset template language into static HTML at build
//! time. Templates are ordinary markup plus template-control tags
//! (`m-fragment`, `m-component`, `m-slot`, `m-if`, `m-for`, `m-var`, ...)
//! and embedded expressions (`${ expr }` inside text, `{{ expr }}` as a
//! whole value).
//!
//! ## Compilation Invariants
//!
//! 1. **Tree consistency**: a node is listed among its parent's children iff
//!    its parent link points there. Every tree mutation goes through
//!    [`dom::Dom`].
//!
//! 2. **Scope chain**: a node's effective scope is its own bindings layered
//!    over its current ancestors'. Detaching a node severs inheritance.
//!
//! 3. **Module order**: every node passes through the compiler modules in
//!    the fixed order of [`compiler::MODULES`]; fragment expansion is last.
//!
//! 4. **No surviving control tags**: after compilation no template-control
//!    tag remains. A survivor is a `M-ERR-STRUCT-002` error.
//!
//! 5. **Canonical templates**: cached fragments and components are never
//!    mutated; each use compiles a copy.
//!
//! 6. **Linked once**: resources with the same content hash are created at
//!    most once per pipeline.
//!
//! ## Entry Points
//!
//! * [`Pipeline::compile_page`] / [`Pipeline::compile_fragment`]
//! * [`discovery::discover_pages`] and [`discovery::compile_site`] for a
//!   whole source tree

pub mod compiler;
pub mod config;
pub mod discovery;
pub mod dom;
pub mod error;
pub mod expression;
pub mod parse;
pub mod paths;
pub mod pipeline;
pub mod serialize;
pub mod value;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod component_tests;
#[cfg(test)]
mod expression_tests;
#[cfg(test)]
mod pipeline_tests;

pub use config::{AnchorMode, PipelineOptions};
pub use error::{CompileError, Result};
pub use pipeline::{
    Fragment, FragmentContext, FsPipelineInterface, MemoryInterface, Page, Pipeline,
    PipelineInterface, ResourceKind,
};
pub use value::Value;
