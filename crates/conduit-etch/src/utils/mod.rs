//! Utilities for conduit-etch

pub mod swc;

pub use swc::{parse_typescript_file, parse_typescript_source, ParsedModule};
