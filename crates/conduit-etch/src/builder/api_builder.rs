//! ApiBuilder - declaration generation for a project directory

use crate::diagnostics::{EtchError, EtchResult};
use crate::emitter::{emit, Translation};
use crate::program::Program;
use crate::replace::Replacer;
use crate::translator::translate;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Project manifest file name
pub const MANIFEST: &str = "conduit.toml";

/// `[surface]` section of `conduit.toml`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SurfaceConfig {
    /// Directory scanned for sources, relative to the project root
    pub src_dir: PathBuf,
    /// Generated declaration file, relative to the project root
    pub out_file: PathBuf,
    /// Extra host-only type substitutions, `Name = "replacement type"`
    pub replace: IndexMap<String, String>,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("src"),
            out_file: PathBuf::from(".conduit/api.d.ts"),
            replace: IndexMap::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    surface: SurfaceConfig,
}

impl SurfaceConfig {
    /// Read `[surface]` from `<project_root>/conduit.toml`; defaults when the
    /// manifest is absent
    pub fn load(project_root: &Path) -> EtchResult<Self> {
        let path = project_root.join(MANIFEST);
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "No manifest, using default surface config");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)?;
        Self::parse(&text).map_err(|e| EtchError::config(format!("{}: {}", path.display(), e)))
    }

    /// Parse manifest text
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<Manifest>(text).map(|m| m.surface)
    }
}

/// Result of one generation run
#[derive(Debug)]
pub struct BuildOutput {
    /// Where the artifact was written
    pub out_file: PathBuf,
    /// The emitted declaration text
    pub contents: String,
    pub translation: Translation,
}

impl BuildOutput {
    pub fn component_count(&self) -> usize {
        self.translation.globals.len()
    }

    pub fn declaration_count(&self) -> usize {
        self.translation.statements.len()
    }
}

/// Builder for one project's declaration artifact
///
/// # Example
///
/// ```no_run
/// use conduit_etch::ApiBuilder;
///
/// // In build.rs or a CLI command
/// ApiBuilder::from_manifest(".")
///     .and_then(|builder| builder.build())
///     .expect("Failed to generate api.d.ts");
/// ```
#[derive(Debug, Clone)]
pub struct ApiBuilder {
    project_root: PathBuf,
    config: SurfaceConfig,
}

impl ApiBuilder {
    /// Builder with the default surface config
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self::with_config(project_root, SurfaceConfig::default())
    }

    pub fn with_config(project_root: impl Into<PathBuf>, config: SurfaceConfig) -> Self {
        Self {
            project_root: project_root.into(),
            config,
        }
    }

    /// Builder configured from the project's `conduit.toml`
    pub fn from_manifest(project_root: impl Into<PathBuf>) -> EtchResult<Self> {
        let project_root = project_root.into();
        let config = SurfaceConfig::load(&project_root)?;
        Ok(Self::with_config(project_root, config))
    }

    /// Set the source directory
    pub fn src_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.src_dir = path.into();
        self
    }

    /// Set the output file
    pub fn out_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.out_file = path.into();
        self
    }

    /// Add a host-only type substitution
    pub fn replace(mut self, name: impl Into<String>, replacement: impl Into<String>) -> Self {
        self.config.replace.insert(name.into(), replacement.into());
        self
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn src_path(&self) -> PathBuf {
        self.project_root.join(&self.config.src_dir)
    }

    pub fn out_path(&self) -> PathBuf {
        self.project_root.join(&self.config.out_file)
    }

    /// Translate and print without touching the output file
    pub fn generate(&self) -> EtchResult<(Translation, String)> {
        let replacer = Replacer::with_rules(&self.config.replace)?;
        let program = Program::load(&self.src_path())?;
        let translation = translate(&program, &replacer);
        let contents = emit(&translation);
        Ok((translation, contents))
    }

    /// Generate and write the artifact. Each call starts from fresh state.
    pub fn build(&self) -> EtchResult<BuildOutput> {
        let (translation, contents) = self.generate()?;
        let out_file = self.out_path();

        if out_file.exists() {
            std::fs::remove_file(&out_file)?;
        }
        if let Some(parent) = out_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&out_file, &contents)?;

        let output = BuildOutput {
            out_file,
            contents,
            translation,
        };
        tracing::info!(
            out_file = %output.out_file.display(),
            components = output.component_count(),
            declarations = output.declaration_count(),
            "Wrote declaration file"
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    const TSCONFIG: &str = r#"{
        // decorators are needed for components
        "compilerOptions": { "experimentalDecorators": true, },
    }"#;

    fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, text) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        dir
    }

    #[test]
    fn test_build_counter() {
        let dir = project(&[
            ("tsconfig.json", TSCONFIG),
            (
                "src/counter.ts",
                r#"
                import { Component, Expose, Accessor } from "@conduit/core";

                @Component()
                export class Counter {
                    @Accessor()
                    value = 0;

                    @Expose()
                    increment(): number {
                        return ++this.value;
                    }
                }
                "#,
            ),
        ]);

        let output = ApiBuilder::new(dir.path()).build().unwrap();
        let expected = r#"// Generated by conduit. Do not edit.

export interface Counter {
    increment(): number;
    incrementAsync(): Promise<number>;
    getValue(): number;
    getValueAsync(): Promise<number>;
    setValue(value: number): void;
    setValueAsync(value: number): Promise<void>;
}

declare global {
    var counter: Counter;
}
"#;
        assert_eq!(output.contents, expected);
        assert_eq!(fs::read_to_string(dir.path().join(".conduit/api.d.ts")).unwrap(), expected);
        assert_eq!(output.component_count(), 1);
    }

    #[test]
    fn test_missing_tsconfig_aborts() {
        let dir = project(&[("src/empty.ts", "export {};")]);
        let err = ApiBuilder::new(dir.path()).build().unwrap_err();
        assert!(err.is_fatal());
        assert!(!dir.path().join(".conduit/api.d.ts").exists());
    }

    #[test]
    fn test_manifest_config_and_rebuild() {
        let dir = project(&[
            ("tsconfig.json", TSCONFIG),
            (
                "conduit.toml",
                r#"
                [surface]
                src_dir = "app"
                out_file = "types/bridge.d.ts"

                [surface.replace]
                Stream = "ReadableStream<Uint8Array>"
                "#,
            ),
            (
                "app/media.ts",
                r#"
                @Component({ as: "media" })
                export class MediaService {
                    @Expose()
                    async open(path: string): Promise<Stream> { return null!; }
                    @Expose()
                    thumbnail(path: string): Buffer { return null!; }
                }
                "#,
            ),
            ("app/broken.ts", "export class {"),
        ]);

        let builder = ApiBuilder::from_manifest(dir.path()).unwrap();
        assert_eq!(builder.config().src_dir, PathBuf::from("app"));

        let first = builder.build().unwrap();
        assert_eq!(first.out_file, dir.path().join("types/bridge.d.ts"));
        assert!(first
            .contents
            .contains("    open(path: string): Promise<ReadableStream<Uint8Array>>;\n"));
        assert!(first
            .contents
            .contains("    thumbnailAsync(path: string): Promise<Uint8Array>;\n"));
        assert!(first.contents.contains("    var media: MediaService;\n"));

        let second = builder.build().unwrap();
        assert_eq!(first.contents, second.contents);
    }

    #[test]
    fn test_surface_config_parse() {
        assert_eq!(SurfaceConfig::parse("").unwrap(), SurfaceConfig::default());
        let config = SurfaceConfig::parse("[surface]\nout_file = \"api.d.ts\"\n").unwrap();
        assert_eq!(config.src_dir, PathBuf::from("src"));
        assert_eq!(config.out_file, PathBuf::from("api.d.ts"));
        assert!(SurfaceConfig::parse("[surface]\nsrcdir = 1\n").is_err());
    }
}
