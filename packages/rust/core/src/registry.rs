//! Subject registry: identifier → canonical subject record.

use std::collections::BTreeMap;

use dossier_shared::{AppConfig, DossierError, Result, Subject};

/// Fixed set of known subjects, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SubjectRegistry {
    subjects: BTreeMap<String, Subject>,
}

impl SubjectRegistry {
    /// Build from an explicit list. Duplicate or empty ids are rejected.
    pub fn new(subjects: impl IntoIterator<Item = Subject>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for subject in subjects {
            if subject.id.trim().is_empty() {
                return Err(DossierError::validation("subject id must not be empty"));
            }
            if map.contains_key(&subject.id) {
                return Err(DossierError::validation(format!(
                    "duplicate subject id '{}'",
                    subject.id
                )));
            }
            map.insert(subject.id.clone(), subject);
        }
        Ok(Self { subjects: map })
    }

    /// Build from the `[[subjects]]` table.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.subjects.iter().cloned())
    }

    /// Look up a subject by id.
    pub fn resolve(&self, subject_id: &str) -> Result<Subject> {
        self.subjects
            .get(subject_id)
            .cloned()
            .ok_or_else(|| DossierError::unknown_subject(subject_id))
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// Subjects in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.values()
    }
}
