//! Builder API for conduit-etch
//!
//! [`ApiBuilder`] runs one generation pass over a project and writes the
//! declaration artifact. It is what the `conduit gen` command and build
//! scripts call.

mod api_builder;

pub use api_builder::{ApiBuilder, BuildOutput, SurfaceConfig, MANIFEST};
