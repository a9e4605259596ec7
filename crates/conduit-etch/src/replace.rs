//! Host-only type substitution
//!
//! A few types exist only in the privileged runtime and cannot cross the
//! bridge as-is. References to them are swapped for portable equivalents
//! before anything else happens to the reference.

use crate::diagnostics::{EtchError, EtchResult};
use crate::node::DeclKind;
use crate::parser::{parse_module, ParsedFile};
use crate::types::EtchType;
use crate::utils::swc::parse_typescript_source;
use indexmap::IndexMap;

/// Binary buffers travel as byte arrays; callables never travel
const BUILTIN_RULES: &[(&str, &str)] = &[("Buffer", "Uint8Array"), ("Function", "never")];

/// Name-to-type substitution table
#[derive(Debug, Clone)]
pub struct Replacer {
    rules: IndexMap<String, EtchType>,
}

impl Default for Replacer {
    fn default() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .filter_map(|(name, replacement)| {
                parse_type_text(replacement).ok().map(|ty| (name.to_string(), ty))
            })
            .collect();
        Self { rules }
    }
}

impl Replacer {
    /// Builtin rules plus `extra`; later rules win
    pub fn with_rules(extra: &IndexMap<String, String>) -> EtchResult<Self> {
        let mut replacer = Self::default();
        for (name, replacement) in extra {
            let ty = parse_type_text(replacement).map_err(|e| {
                EtchError::config(format!("Invalid replacement for {}: {}", name, e))
            })?;
            replacer.rules.insert(name.clone(), ty);
        }
        Ok(replacer)
    }

    /// Portable type for a reference to `name`, if it is host-only
    pub fn replace(&self, name: &str) -> Option<EtchType> {
        self.rules.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Parse a standalone type expression such as `Record<string, number>`
pub fn parse_type_text(text: &str) -> EtchResult<EtchType> {
    let source = format!("type __Replacement = {};", text);
    let parsed = parse_typescript_source("/__conduit__/replacement.ts", source)?;
    let ParsedFile { declarations, .. } = parse_module(&parsed);
    declarations
        .into_iter()
        .find_map(|decl| match decl.kind {
            DeclKind::TypeAlias(alias) => Some(alias.ty),
            _ => None,
        })
        .ok_or_else(|| EtchError::other(format!("Not a type: {}", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_rules() {
        let replacer = Replacer::default();
        assert_eq!(replacer.replace("Buffer"), Some(EtchType::simple_ref("Uint8Array")));
        assert_eq!(replacer.replace("Function"), Some(EtchType::never()));
        assert_eq!(replacer.replace("Date"), None);
    }

    #[test]
    fn test_extra_rules_override_builtins() {
        let mut extra = IndexMap::new();
        extra.insert("Function".to_string(), "(...args: any[]) => unknown".to_string());
        extra.insert("Stream".to_string(), "AsyncIterable<Uint8Array>".to_string());
        let replacer = Replacer::with_rules(&extra).unwrap();

        assert_eq!(replacer.len(), 3);
        assert_eq!(
            replacer.replace("Function").unwrap().to_typescript(),
            "(...args: any[]) => unknown"
        );
        assert_eq!(
            replacer.replace("Stream").unwrap().to_typescript(),
            "AsyncIterable<Uint8Array>"
        );
    }

    #[test]
    fn test_invalid_rule() {
        let mut extra = IndexMap::new();
        extra.insert("Broken".to_string(), "<<".to_string());
        let err = Replacer::with_rules(&extra).unwrap_err();
        assert!(matches!(err, EtchError::Config(_)));
    }
}
