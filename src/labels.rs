//! Class id to label resolution.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Label used when a class id has no entry in the table.
pub const UNKNOWN_LABEL: &str = "unknown";

/// The detector's label table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassLabels {
    labels: BTreeMap<u32, String>,
}

impl ClassLabels {
    /// Build from labels in class-id order (index 0 is class 0).
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (i as u32, name.into()))
            .collect();
        Self { labels }
    }

    /// Build from an explicit id -> label map.
    pub fn from_map(labels: BTreeMap<u32, String>) -> Self {
        Self { labels }
    }

    /// Label for a class id, or [`UNKNOWN_LABEL`].
    pub fn label(&self, class_id: u32) -> &str {
        self.labels
            .get(&class_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_LABEL)
    }

    /// Class ids whose label is in `names`.
    ///
    /// An empty `names` list selects every known class. Names that match no
    /// label are ignored.
    pub fn class_ids_for_names<S: AsRef<str>>(&self, names: &[S]) -> BTreeSet<u32> {
        if names.is_empty() {
            return self.labels.keys().copied().collect();
        }
        self.labels
            .iter()
            .filter(|(_, label)| names.iter().any(|n| n.as_ref() == label.as_str()))
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
