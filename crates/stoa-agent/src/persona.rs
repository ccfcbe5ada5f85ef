// SPDX-FileCopyrightText: 2026 Stoa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The fixed persona roster.

use std::collections::HashMap;

use stoa_config::PersonaConfig;
use stoa_core::error::StoaError;
use stoa_core::types::PersonaDescriptor;

/// Immutable lookup of persona descriptors by id, built once at startup.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Vec<PersonaDescriptor>,
    index: HashMap<String, usize>,
}

impl PersonaRegistry {
    /// Builds a registry, rejecting an empty roster, blank ids or names,
    /// and duplicate ids.
    pub fn new(personas: Vec<PersonaDescriptor>) -> Result<Self, StoaError> {
        if personas.is_empty() {
            return Err(StoaError::Config(
                "at least one persona must be registered".to_string(),
            ));
        }

        let mut index = HashMap::with_capacity(personas.len());
        for (i, persona) in personas.iter().enumerate() {
            if persona.id.trim().is_empty() || persona.name.trim().is_empty() {
                return Err(StoaError::Config(format!(
                    "persona #{i} must have a non-empty id and name"
                )));
            }
            if index.insert(persona.id.clone(), i).is_some() {
                return Err(StoaError::Config(format!(
                    "duplicate persona id `{}`",
                    persona.id
                )));
            }
        }

        Ok(Self { personas, index })
    }

    pub fn from_config(personas: &[PersonaConfig]) -> Result<Self, StoaError> {
        Self::new(
            personas
                .iter()
                .map(|p| PersonaDescriptor {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    perspective: p.perspective.clone(),
                    style: p.style.clone(),
                })
                .collect(),
        )
    }

    /// Looks up a persona. Unknown ids are an error, never a default.
    pub fn get(&self, id: &str) -> Result<&PersonaDescriptor, StoaError> {
        self.index
            .get(id)
            .map(|&i| &self.personas[i])
            .ok_or_else(|| StoaError::unknown_persona(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All personas in configured order.
    pub fn list(&self) -> &[PersonaDescriptor] {
        &self.personas
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.personas.iter().map(|p| p.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stoa_config::model::default_personas;

    fn descriptor(id: &str, name: &str) -> PersonaDescriptor {
        PersonaDescriptor {
            id: id.into(),
            name: name.into(),
            perspective: String::new(),
            style: String::new(),
        }
    }

    #[test]
    fn default_roster_loads() {
        let registry = PersonaRegistry::from_config(&default_personas()).unwrap();
        assert_eq!(registry.len(), 10);
        assert_eq!(registry.get("turing").unwrap().name, "Alan Turing");
        assert_eq!(registry.list()[0].id, "socrates");
        assert_eq!(registry.ids().last(), Some("dennett"));
    }

    #[test]
    fn unknown_persona_is_an_error() {
        let registry = PersonaRegistry::from_config(&default_personas()).unwrap();
        let err = registry.get("kant").unwrap_err();
        assert!(matches!(err, StoaError::UnknownPersona { id } if id == "kant"));
        assert!(!registry.contains("kant"));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let err = PersonaRegistry::new(vec![
            descriptor("plato", "Plato"),
            descriptor("plato", "Aristocles"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate persona id `plato`"));
    }

    #[test]
    fn empty_and_blank_rosters_rejected() {
        assert!(PersonaRegistry::new(vec![]).is_err());
        assert!(PersonaRegistry::new(vec![descriptor(" ", "Nobody")]).is_err());
        assert!(PersonaRegistry::new(vec![descriptor("nobody", "")]).is_err());
    }
}
