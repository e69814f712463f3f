//! Brand synonym table.
//!
//! Maps a canonical brand name to its aliases ("VOLKSWAGEN" ↔ "VW",
//! "Фольксваген"). Lookups go both ways and ignore case.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::info;

use crate::error::CatalogError;

#[derive(Debug, Clone)]
struct Family {
    canonical: String,
    aliases: Vec<String>,
}

/// Immutable synonym table, built once and shared.
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    families: Vec<Family>,
    /// Lowercased canonical or alias → family index.
    by_name: HashMap<String, usize>,
    /// Longest name in words, bounds span matching during expansion.
    max_span: usize,
}

impl SynonymTable {
    /// Build from `canonical → aliases` pairs.
    ///
    /// An alias claimed by two different canonical names is rejected.
    pub fn new<I, A>(entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (String, A)>,
        A: IntoIterator<Item = String>,
    {
        let mut table = Self::default();
        for (canonical, aliases) in entries {
            let canonical = canonical.trim().to_string();
            if canonical.is_empty() {
                continue;
            }
            let idx = match table.by_name.get(&canonical.to_lowercase()) {
                Some(&existing) if table.families[existing].canonical == canonical => existing,
                Some(&existing) => {
                    return Err(CatalogError::ConflictingAlias {
                        alias: canonical.clone(),
                        first: table.families[existing].canonical.clone(),
                        second: canonical,
                    });
                }
                None => {
                    table.families.push(Family {
                        canonical: canonical.clone(),
                        aliases: Vec::new(),
                    });
                    let idx = table.families.len() - 1;
                    table.claim(&canonical, idx)?;
                    idx
                }
            };
            for alias in aliases {
                let alias = alias.trim().to_string();
                if alias.is_empty() {
                    continue;
                }
                table.claim(&alias, idx)?;
                let family = &mut table.families[idx];
                if alias.to_lowercase() != family.canonical.to_lowercase()
                    && !family.aliases.iter().any(|a| a.to_lowercase() == alias.to_lowercase())
                {
                    family.aliases.push(alias);
                }
            }
        }
        Ok(table)
    }

    fn claim(&mut self, name: &str, idx: usize) -> Result<(), CatalogError> {
        let key = name.to_lowercase();
        match self.by_name.get(&key) {
            Some(&owner) if owner != idx => Err(CatalogError::ConflictingAlias {
                alias: name.to_string(),
                first: self.families[owner].canonical.clone(),
                second: self.families[idx].canonical.clone(),
            }),
            Some(_) => Ok(()),
            None => {
                self.max_span = self.max_span.max(key.split_whitespace().count());
                self.by_name.insert(key, idx);
                Ok(())
            }
        }
    }

    /// Load a JSON object of `"CANONICAL": ["alias", ...]`.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let data = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let raw: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&data).map_err(|source| CatalogError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        let table = Self::new(raw)?;
        info!(path = %path.display(), brands = table.families.len(), "Synonyms loaded");
        Ok(table)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.families.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Aliases of the family `brand` belongs to. `brand` may be the
    /// canonical name or any alias.
    #[must_use]
    pub fn aliases_of(&self, brand: &str) -> &[String] {
        self.family_index(brand)
            .map_or(&[][..], |idx| self.families[idx].aliases.as_slice())
    }

    /// Canonical name for an alias (or for the canonical name itself).
    #[must_use]
    pub fn canonical_of(&self, alias: &str) -> Option<&str> {
        self.family_index(alias)
            .map(|idx| self.families[idx].canonical.as_str())
    }

    /// Canonical name followed by every alias, or `None` for unknown names.
    #[must_use]
    pub fn family(&self, name: &str) -> Option<Vec<&str>> {
        self.family_index(name).map(|idx| {
            let family = &self.families[idx];
            std::iter::once(family.canonical.as_str())
                .chain(family.aliases.iter().map(String::as_str))
                .collect()
        })
    }

    /// Longest contiguous word span that names a family.
    #[must_use]
    pub fn max_span(&self) -> usize {
        self.max_span
    }

    fn family_index(&self, name: &str) -> Option<usize> {
        let key = name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        self.by_name.get(&key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SynonymTable {
        SynonymTable::new([
            (
                "VOLKSWAGEN".to_string(),
                vec!["VW".to_string(), "Фольксваген".to_string()],
            ),
            (
                "MERCEDES-BENZ".to_string(),
                vec!["mercedes".to_string(), "mercedes benz".to_string()],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn lookups_are_bidirectional_and_case_insensitive() {
        let table = table();
        assert_eq!(table.canonical_of("vw"), Some("VOLKSWAGEN"));
        assert_eq!(table.canonical_of("фольксваген"), Some("VOLKSWAGEN"));
        assert_eq!(table.canonical_of("Volkswagen"), Some("VOLKSWAGEN"));
        assert_eq!(table.aliases_of("VW"), table.aliases_of("volkswagen"));
        assert_eq!(table.aliases_of("VOLKSWAGEN").len(), 2);
        assert_eq!(table.canonical_of("lada"), None);
        assert!(table.aliases_of("lada").is_empty());
    }

    #[test]
    fn family_starts_with_canonical() {
        let table = table();
        assert_eq!(
            table.family("vw").unwrap(),
            vec!["VOLKSWAGEN", "VW", "Фольксваген"]
        );
        assert_eq!(table.max_span(), 2);
        assert_eq!(table.canonical_of("Mercedes   Benz"), Some("MERCEDES-BENZ"));
    }

    #[test]
    fn alias_claimed_twice_is_rejected() {
        let err = SynonymTable::new([
            ("KIA".to_string(), vec!["K".to_string()]),
            ("KAMAZ".to_string(), vec!["k".to_string()]),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::ConflictingAlias { .. }));
    }

    #[test]
    fn load_reads_json_object() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"VOLKSWAGEN": ["VW"]}"#).unwrap();
        let table = SynonymTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.canonical_of("vw"), Some("VOLKSWAGEN"));
    }
}
