//! Skill taxonomy normalizer — folds raw skill tokens onto canonical display names.
//!
//! The alias table is an explicit, immutable value handed to the normalizer;
//! nothing here is process-global.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use tracing::info;

use crate::errors::PipelineError;
use crate::storage::{read_json, write_json_atomic};

const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("python", "Python"),
    ("py", "Python"),
    ("pandas", "Pandas"),
    ("numpy", "NumPy"),
    ("sql", "SQL"),
    ("postgres", "PostgreSQL"),
    ("postgresql", "PostgreSQL"),
    ("mysql", "MySQL"),
    ("excel", "Excel"),
    ("javascript", "JavaScript"),
    ("js", "JavaScript"),
    ("typescript", "TypeScript"),
    ("react", "React"),
    ("node", "Node.js"),
    ("node.js", "Node.js"),
    ("aws", "AWS"),
    ("azure", "Azure"),
    ("gcp", "GCP"),
    ("ml", "Machine Learning"),
    ("machine learning", "Machine Learning"),
    ("deep learning", "Deep Learning"),
    ("nlp", "NLP"),
    ("git", "Git"),
    ("docker", "Docker"),
];

/// Lowercase alias → canonical display string. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillAliases {
    table: BTreeMap<String, String>,
}

impl Default for SkillAliases {
    fn default() -> Self {
        Self::builtin()
    }
}

impl SkillAliases {
    pub fn builtin() -> Self {
        Self::from_pairs(BUILTIN_ALIASES.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    /// Keys are trimmed and lower-cased so lookups stay case-insensitive.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let table = pairs
            .into_iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        SkillAliases { table }
    }

    /// Loads a JSON object of alias → canonical name.
    pub fn from_json_file(path: &Path) -> Result<Self, PipelineError> {
        let table: BTreeMap<String, String> = read_json(path)?;
        let aliases = Self::from_pairs(table);
        info!("Loaded {} skill aliases from {}", aliases.len(), path.display());
        Ok(aliases)
    }

    /// Persists the exact mapping in use so downstream consumers can read it.
    pub fn export_json(&self, path: &Path) -> Result<(), PipelineError> {
        write_json_atomic(path, &self.table)?;
        info!("Skill aliases exported to {}", path.display());
        Ok(())
    }

    pub fn canonical(&self, key: &str) -> Option<&str> {
        self.table.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }
}

/// Maps raw skill tokens to canonical names, de-duplicated in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct SkillNormalizer {
    aliases: SkillAliases,
}

impl SkillNormalizer {
    pub fn new(aliases: SkillAliases) -> Self {
        SkillNormalizer { aliases }
    }

    /// Canonical form of one token, or `None` for blank input.
    ///
    /// The lookup key is the trimmed lowercase token; misses keep the trimmed
    /// original casing. Canonical values are not re-lowered, which is what makes
    /// [`SkillNormalizer::normalize`] idempotent.
    pub fn normalize_token(&self, token: &str) -> Option<String> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return None;
        }
        let key = trimmed.to_lowercase();
        Some(
            self.aliases
                .canonical(&key)
                .map(String::from)
                .unwrap_or_else(|| trimmed.to_string()),
        )
    }

    pub fn normalize<I, S>(&self, tokens: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for token in tokens {
            if let Some(norm) = self.normalize_token(token.as_ref()) {
                if seen.insert(norm.clone()) {
                    out.push(norm);
                }
            }
        }
        out
    }
}
