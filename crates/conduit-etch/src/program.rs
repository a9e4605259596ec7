//! Source program: tsconfig, files, declaration arena, import resolution
//!
//! Every `.ts`/`.tsx`/`.d.ts` file below the source directory is parsed once
//! and its declarations are appended to one arena. Names are resolved the
//! way the TypeScript compiler would for type positions: local declarations
//! first, then imports, which are followed through relative paths,
//! `compilerOptions.paths` aliases and re-exports. Bare specifiers that do
//! not resolve into the program are external modules.

use crate::diagnostics::{EtchError, EtchResult};
use crate::node::{
    DeclId, DeclKind, Declaration, ExportTarget, FileId, ImportBinding, ImportKind, ModuleScope,
};
use crate::parser::{parse_module, ParsedFile};
use crate::utils::swc::parse_typescript_source;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

pub const TSCONFIG: &str = "tsconfig.json";

/// Extensions tried, in order, for an extensionless specifier
const RESOLVE_SUFFIXES: &[&str] = &[
    ".ts",
    ".tsx",
    ".d.ts",
    ".mts",
    "/index.ts",
    "/index.tsx",
    "/index.d.ts",
];

lazy_static! {
    /// Strings are matched so comment markers inside them survive
    static ref JSON_COMMENTS: Regex =
        Regex::new(r#""(?:\\.|[^"\\])*"|//[^\n]*|/\*[\s\S]*?\*/"#).unwrap();
    static ref TRAILING_COMMAS: Regex = Regex::new(r",(\s*[}\]])").unwrap();
}

/// The parts of `tsconfig.json` that affect module resolution
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TsConfig {
    pub path: PathBuf,
    pub base_url: Option<PathBuf>,
    pub paths: IndexMap<String, Vec<String>>,
}

impl TsConfig {
    /// Find `tsconfig.json` in `start` or the closest ancestor
    pub fn find(start: &Path) -> EtchResult<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(TSCONFIG))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| EtchError::ConfigNotFound(start.to_path_buf()))
    }

    /// Read leniently; an unreadable file yields defaults
    pub fn load(path: &Path) -> Self {
        let mut config = TsConfig {
            path: path.to_path_buf(),
            ..Default::default()
        };
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not read tsconfig, using defaults");
                return config;
            }
        };
        let json: serde_json::Value = match serde_json::from_str(&strip_json_comments(&text)) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not parse tsconfig, using defaults");
                return config;
            }
        };

        let options = &json["compilerOptions"];
        if let Some(base_url) = options["baseUrl"].as_str() {
            config.base_url = Some(normalize(&config.dir().join(base_url)));
        }
        if let Some(paths) = options["paths"].as_object() {
            for (pattern, targets) in paths {
                let targets = targets
                    .as_array()
                    .map(|t| t.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                    .unwrap_or_default();
                config.paths.insert(pattern.clone(), targets);
            }
        }
        tracing::debug!(
            path = %path.display(),
            base_url = ?config.base_url,
            paths = config.paths.len(),
            "Loaded tsconfig"
        );
        config
    }

    /// Directory holding the tsconfig
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("/"))
    }

    /// Base for `paths` targets: `baseUrl`, else the tsconfig directory
    fn paths_base(&self) -> &Path {
        self.base_url.as_deref().unwrap_or_else(|| self.dir())
    }

    /// Candidate base paths for a non-relative specifier
    fn alias_candidates(&self, specifier: &str) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        for (pattern, targets) in &self.paths {
            let Some(captured) = match_path_pattern(pattern, specifier) else {
                continue;
            };
            for target in targets {
                candidates.push(self.paths_base().join(target.replacen('*', captured, 1)));
            }
        }
        if let Some(base_url) = &self.base_url {
            candidates.push(base_url.join(specifier));
        }
        candidates
    }
}

/// Strip comments and trailing commas so serde_json accepts the text
pub fn strip_json_comments(text: &str) -> String {
    let without_comments = JSON_COMMENTS.replace_all(text, |caps: &regex::Captures| {
        let matched = &caps[0];
        if matched.starts_with('"') {
            matched.to_string()
        } else {
            String::new()
        }
    });
    TRAILING_COMMAS.replace_all(&without_comments, "$1").into_owned()
}

/// Match `@app/*` style patterns, returning what `*` captured
fn match_path_pattern<'a>(pattern: &str, specifier: &'a str) -> Option<&'a str> {
    match pattern.split_once('*') {
        Some((prefix, suffix)) => {
            if specifier.len() >= prefix.len() + suffix.len()
                && specifier.starts_with(prefix)
                && specifier.ends_with(suffix)
            {
                Some(&specifier[prefix.len()..specifier.len() - suffix.len()])
            } else {
                None
            }
        }
        None => (pattern == specifier).then_some(""),
    }
}

pub fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".."
}

/// Lexically resolve `.` and `..`
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn append(path: &Path, suffix: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

fn is_source_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    [".ts", ".tsx", ".mts"].iter().any(|ext| name.ends_with(ext))
}

/// One parsed file
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub scope: ModuleScope,
    /// Declared name to arena entry
    pub locals: IndexMap<String, DeclId>,
}

/// Result of resolving a name used in a type position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Decl(DeclId),
    /// `import * as ns` of a module inside the program
    Namespace(FileId),
    /// Imported from a module outside the program
    External { specifier: String, kind: ImportKind },
    /// Relative import that does not lead to a declaration
    Missing { specifier: String },
    /// Not declared or imported: a global such as `Promise`
    Global,
}

/// The loaded program
#[derive(Debug, Clone)]
pub struct Program {
    config: TsConfig,
    files: Vec<SourceFile>,
    by_path: HashMap<PathBuf, FileId>,
    decls: Vec<Declaration>,
}

impl Program {
    pub fn new(config: TsConfig) -> Self {
        Self {
            config,
            files: Vec::new(),
            by_path: HashMap::new(),
            decls: Vec::new(),
        }
    }

    /// Find the tsconfig for `src_dir` and load every source file below it
    pub fn load(src_dir: &Path) -> EtchResult<Self> {
        let src_dir = if src_dir.is_absolute() {
            normalize(src_dir)
        } else {
            normalize(&std::env::current_dir()?.join(src_dir))
        };
        let config = TsConfig::load(&TsConfig::find(&src_dir)?);
        let mut program = Program::new(config);

        let walker = WalkDir::new(&src_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                entry.depth() == 0 || !(name == "node_modules" || name.starts_with('.'))
            });
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable path");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_source_file(entry.path()) {
                continue;
            }
            match std::fs::read_to_string(entry.path()) {
                Ok(text) => {
                    program.add_source(entry.path(), text);
                }
                Err(e) => {
                    tracing::warn!(file = %entry.path().display(), error = %e, "Skipping unreadable source file")
                }
            }
        }

        tracing::info!(
            files = program.files.len(),
            declarations = program.decls.len(),
            components = program.components().count(),
            "Program loaded"
        );
        Ok(program)
    }

    /// Parse and add one file; unparsable files are skipped
    pub fn add_source(&mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Option<FileId> {
        let path = normalize(path.as_ref());
        let text: String = text.into();
        match parse_typescript_source(&path, text) {
            Ok(parsed) => Some(self.insert_file(path, parse_module(&parsed))),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "Skipping unparsable source file");
                None
            }
        }
    }

    fn insert_file(&mut self, path: PathBuf, parsed: ParsedFile) -> FileId {
        let id = FileId(self.files.len());
        let mut locals: IndexMap<String, DeclId> = IndexMap::new();

        for decl in parsed.declarations {
            if let Some(existing) = locals.get(&decl.name) {
                // interface declarations merge
                let existing = &mut self.decls[existing.0];
                if let (DeclKind::Interface(into), DeclKind::Interface(from)) =
                    (&mut existing.kind, decl.kind)
                {
                    into.extends.extend(from.extends);
                    into.members.extend(from.members);
                } else {
                    tracing::debug!(name = %decl.name, file = %path.display(), "Keeping first of duplicate declarations");
                }
                continue;
            }
            let decl_id = DeclId(self.decls.len());
            locals.insert(decl.name.clone(), decl_id);
            self.decls.push(Declaration {
                id: decl_id,
                file: id,
                name: decl.name,
                kind: decl.kind,
            });
        }

        self.by_path.insert(path.clone(), id);
        self.files.push(SourceFile {
            id,
            path,
            scope: parsed.scope,
            locals,
        });
        id
    }

    pub fn config(&self) -> &TsConfig {
        &self.config
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0]
    }

    pub fn file_by_path(&self, path: &Path) -> Option<FileId> {
        self.by_path.get(&normalize(path)).copied()
    }

    pub fn decls(&self) -> &[Declaration] {
        &self.decls
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0]
    }

    /// Annotated component classes in load order
    pub fn components(&self) -> impl Iterator<Item = &Declaration> {
        self.decls.iter().filter(|d| d.component().is_some())
    }

    /// The program file `specifier` refers to from `from`
    pub fn resolve_module(&self, from: FileId, specifier: &str) -> Option<FileId> {
        let bases = if is_relative(specifier) {
            let dir = self.file(from).path.parent().unwrap_or_else(|| Path::new("/"));
            vec![dir.join(specifier)]
        } else {
            self.config.alias_candidates(specifier)
        };

        bases.iter().find_map(|base| self.lookup_file(&normalize(base)))
    }

    fn lookup_file(&self, base: &Path) -> Option<FileId> {
        if let Some(id) = self.by_path.get(base) {
            return Some(*id);
        }
        // ESM-style `./user.js` names the compiled output of `./user.ts`
        let stem = base.to_str().and_then(|s| s.strip_suffix(".js")).map(PathBuf::from);
        std::iter::once(base)
            .chain(stem.as_deref())
            .flat_map(|base| RESOLVE_SUFFIXES.iter().map(move |suffix| append(base, suffix)))
            .find_map(|candidate| self.by_path.get(&candidate).copied())
    }

    /// Resolve `name` as seen from `file`
    pub fn resolve_name(&self, file: FileId, name: &str) -> Resolved {
        self.resolve_name_inner(file, name, &mut Vec::new())
    }

    fn resolve_name_inner(&self, file: FileId, name: &str, seen: &mut Vec<FileId>) -> Resolved {
        let source = self.file(file);
        if let Some(id) = source.locals.get(name) {
            return Resolved::Decl(*id);
        }
        match source.scope.imports.get(name) {
            Some(binding) => self.resolve_import(file, binding, seen),
            None => Resolved::Global,
        }
    }

    fn resolve_import(&self, file: FileId, binding: &ImportBinding, seen: &mut Vec<FileId>) -> Resolved {
        let Some(target) = self.resolve_module(file, &binding.specifier) else {
            return if is_relative(&binding.specifier) {
                Resolved::Missing {
                    specifier: binding.specifier.clone(),
                }
            } else {
                Resolved::External {
                    specifier: binding.specifier.clone(),
                    kind: binding.kind.clone(),
                }
            };
        };

        let exported = match &binding.kind {
            ImportKind::Namespace => return Resolved::Namespace(target),
            ImportKind::Default => "default",
            ImportKind::Named(name) => name.as_str(),
        };
        match self.export_of_inner(target, exported, seen) {
            Some(id) => Resolved::Decl(id),
            None => Resolved::Missing {
                specifier: binding.specifier.clone(),
            },
        }
    }

    /// The declaration `file` exports as `name`
    pub fn export_of(&self, file: FileId, name: &str) -> Option<DeclId> {
        self.export_of_inner(file, name, &mut Vec::new())
    }

    fn export_of_inner(&self, file: FileId, name: &str, seen: &mut Vec<FileId>) -> Option<DeclId> {
        if seen.contains(&file) {
            return None;
        }
        seen.push(file);

        let source = self.file(file);
        match source.scope.exports.get(name) {
            Some(ExportTarget::Local(local)) => match self.resolve_name_inner(file, local, seen) {
                Resolved::Decl(id) => Some(id),
                _ => None,
            },
            Some(ExportTarget::ReExport { specifier, name }) => {
                let target = self.resolve_module(file, specifier)?;
                self.export_of_inner(target, name, seen)
            }
            None if name == "default" => None,
            None => source.scope.star_exports.iter().find_map(|specifier| {
                let target = self.resolve_module(file, specifier)?;
                self.export_of_inner(target, name, seen)
            }),
        }
    }
}
