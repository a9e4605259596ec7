//! conduit-etch: TypeScript declarations for Conduit components
//!
//! This crate generates the sandbox-facing `api.d.ts` of an application by:
//! - Parsing every TypeScript source below the project's source directory
//!   using deno_ast/SWC
//! - Reading component decorators into the same descriptors the runtime
//!   bridge serves (`conduit-weld`)
//! - Translating each component's exposed surface, and every type reachable
//!   from it, into standalone declarations
//! - Emitting `import type` statements, the declarations and a
//!   `declare global` block with one variable per component
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐
//! │ src/**/*.ts     │    │ tsconfig.json    │
//! │ (SWC parse)     │    │ (paths, baseUrl) │
//! └────────┬────────┘    └────────┬─────────┘
//!          │                      │
//!          └──────────┬───────────┘
//!                     ▼
//!              ┌──────────────┐
//!              │   Program    │  declaration arena
//!              └──────┬───────┘
//!                     ▼
//!              ┌──────────────┐
//!              │  Translator  │  worklist + replacements
//!              └──────┬───────┘
//!                     ▼
//!              ┌──────────────┐
//!              │   api.d.ts   │
//!              └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use conduit_etch::ApiBuilder;
//!
//! ApiBuilder::new(".")
//!     .src_dir("src")
//!     .out_file(".conduit/api.d.ts")
//!     .replace("Stream", "ReadableStream<Uint8Array>")
//!     .build()
//!     .expect("Failed to generate declarations");
//! ```

// Core types
pub mod node;
pub mod types;

// Parsing
pub mod decorators;
pub mod diagnostics;
pub mod parser;
pub mod program;

// Translation and output
pub mod builder;
pub mod emitter;
pub mod replace;
pub mod translator;
pub mod utils;

// Re-exports for convenience
pub use builder::{ApiBuilder, BuildOutput, SurfaceConfig};
pub use diagnostics::{EtchError, EtchResult};
pub use emitter::{emit, Statement, Translation};
pub use program::{Program, Resolved, TsConfig};
pub use replace::Replacer;
pub use translator::{translate, Translator};
pub use types::EtchType;
