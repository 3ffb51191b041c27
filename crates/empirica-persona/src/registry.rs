use crate::profile::{PersonaError, PersonaProfile};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid persona {persona_id}: {source}")]
    Invalid {
        persona_id: String,
        #[source]
        source: PersonaError,
    },
    #[error("unknown persona: {0}")]
    Unknown(String),
}

/// In-memory registry of [`PersonaProfile`]s, loaded from one TOML file per
/// persona under a directory (default `~/.empirica/personas/`).
#[derive(Debug, Default)]
pub struct PersonaRegistry {
    personas: HashMap<String, PersonaProfile>,
}

impl PersonaRegistry {
    pub fn new() -> Self {
        Self {
            personas: HashMap::new(),
        }
    }

    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".empirica")
            .join("personas")
    }

    /// Load every `*.toml` file in `dir`, validating each profile. Returns
    /// an empty registry if `dir` does not exist.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let dir = dir.as_ref();
        let mut registry = Self::new();

        if !dir.exists() {
            return Ok(registry);
        }

        let entries = std::fs::read_dir(dir).map_err(|source| RegistryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| RegistryError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            registry.load_file(&path)?;
        }

        Ok(registry)
    }

    fn load_file(&mut self, path: &Path) -> Result<(), RegistryError> {
        let text = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let profile: PersonaProfile =
            toml::from_str(&text).map_err(|source| RegistryError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        self.insert(profile)?;
        Ok(())
    }

    /// Validate and insert a profile, keyed by `persona_id`.
    pub fn insert(&mut self, profile: PersonaProfile) -> Result<(), RegistryError> {
        profile
            .validate()
            .map_err(|source| RegistryError::Invalid {
                persona_id: profile.persona_id.clone(),
                source,
            })?;
        self.personas.insert(profile.persona_id.clone(), profile);
        Ok(())
    }

    pub fn get(&self, persona_id: &str) -> Result<&PersonaProfile, RegistryError> {
        self.personas
            .get(persona_id)
            .ok_or_else(|| RegistryError::Unknown(persona_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.personas.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PersonaTierWeights;
    use empirica_vector::CANONICAL_NAMES;
    use std::collections::HashMap as StdHashMap;

    fn persona(id: &str) -> PersonaProfile {
        let priors: StdHashMap<String, f64> = CANONICAL_NAMES
            .iter()
            .map(|n| (n.to_string(), 0.5))
            .collect();
        PersonaProfile {
            persona_id: id.into(),
            display_name: id.into(),
            persona_type: "generalist".into(),
            priors,
            tier_weights: PersonaTierWeights {
                engagement: 0.15,
                foundation: 0.35,
                comprehension: 0.25,
                execution: 0.25,
            },
            critical_thresholds: vec![],
            focus_domains: vec![],
            investigation_profile: Default::default(),
        }
    }

    #[test]
    fn insert_and_get_round_trips() {
        let mut registry = PersonaRegistry::new();
        registry.insert(persona("security-reviewer")).unwrap();
        assert_eq!(registry.get("security-reviewer").unwrap().persona_id, "security-reviewer");
    }

    #[test]
    fn unknown_persona_errors() {
        let registry = PersonaRegistry::new();
        assert!(matches!(
            registry.get("nope").unwrap_err(),
            RegistryError::Unknown(_)
        ));
    }

    #[test]
    fn invalid_profile_rejected_on_insert() {
        let mut profile = persona("broken");
        profile.priors.remove("uncertainty");
        let mut registry = PersonaRegistry::new();
        assert!(matches!(
            registry.insert(profile).unwrap_err(),
            RegistryError::Invalid { .. }
        ));
    }

    #[test]
    fn load_dir_reads_toml_files() {
        let dir = tempfile::tempdir().unwrap();
        let toml_text = toml::to_string(&persona("ops-reviewer")).unwrap();
        std::fs::write(dir.path().join("ops-reviewer.toml"), toml_text).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = PersonaRegistry::load_dir(dir.path()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("ops-reviewer").is_ok());
    }

    #[test]
    fn load_dir_missing_directory_is_empty() {
        let registry = PersonaRegistry::load_dir("/nonexistent/empirica/personas").unwrap();
        assert!(registry.is_empty());
    }
}
