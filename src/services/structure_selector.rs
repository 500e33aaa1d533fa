use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use rand::seq::SliceRandom;

use crate::constants::structures::{QuestionStructure, STRUCTURES};

/// Chooses a question format per request, never repeating a session's
/// previous format while an alternative exists.
pub struct StructureSelector {
    catalog: &'static [QuestionStructure],
    last_used: Mutex<HashMap<String, &'static str>>,
}

impl Default for StructureSelector {
    fn default() -> Self {
        Self::new(STRUCTURES)
    }
}

impl StructureSelector {
    pub fn new(catalog: &'static [QuestionStructure]) -> Self {
        Self {
            catalog,
            last_used: Mutex::new(HashMap::new()),
        }
    }

    pub fn select_structure(&self, session_id: &str) -> &'static QuestionStructure {
        let catalog: &'static [QuestionStructure] = self.catalog;
        let mut last_used = self.table();
        let previous = last_used.get(session_id).copied();

        let candidates: Vec<&'static QuestionStructure> = catalog
            .iter()
            .filter(|structure| catalog.len() < 2 || Some(structure.name) != previous)
            .collect();

        let chosen = candidates
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(&catalog[0]);

        last_used.insert(session_id.to_string(), chosen.name);
        log::debug!("Structure for session {}: {}", session_id, chosen.name);

        chosen
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, &'static str>> {
        self.last_used
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
