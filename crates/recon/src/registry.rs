use std::collections::HashSet;

use serde::{Serialize, Serializer};

use crate::error::TaxonomyError;
use crate::hierarchy::HierarchyStore;
use crate::model::{Level, Source, SourceClassEntry};

/// A source together with the classes it defines, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceDataset {
    #[serde(rename = "meta")]
    pub source: Source,
    #[serde(serialize_with = "classes_by_code")]
    pub classes: Vec<SourceClassEntry>,
}

fn classes_by_code<S: Serializer>(
    classes: &[SourceClassEntry],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_map(classes.iter().map(|c| (&c.code, c)))
}

impl SourceDataset {
    pub fn new(source: Source, classes: Vec<SourceClassEntry>) -> Self {
        Self { source, classes }
    }

    pub fn id(&self) -> &str {
        &self.source.id
    }

    pub fn entry(&self, code: &str) -> Option<&SourceClassEntry> {
        self.classes.iter().find(|c| c.code == code)
    }
}

/// Every registered source, in registration order.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    datasets: Vec<SourceDataset>,
}

impl SourceRegistry {
    /// Build the registry. Source ids and per-source codes must be unique and
    /// every class must name an L0 node the hierarchy defines. Finer levels
    /// are not checked here; the indexer records them as unresolved.
    pub fn new(
        datasets: Vec<SourceDataset>,
        hierarchy: &HierarchyStore,
    ) -> Result<Self, TaxonomyError> {
        Self::validate(&datasets, hierarchy)?;
        Ok(Self { datasets })
    }

    fn validate(datasets: &[SourceDataset], hierarchy: &HierarchyStore) -> Result<(), TaxonomyError> {
        let mut ids = HashSet::new();
        for dataset in datasets {
            if !ids.insert(dataset.id()) {
                return Err(TaxonomyError::DuplicateSource(dataset.id().to_string()));
            }

            let mut codes = HashSet::new();
            for class in &dataset.classes {
                if !codes.insert(class.code.as_str()) {
                    return Err(TaxonomyError::DuplicateCode {
                        source_id: dataset.id().to_string(),
                        code: class.code.clone(),
                    });
                }
                if !hierarchy.contains(Level::L0, &class.l0) {
                    return Err(TaxonomyError::UnknownLandSurface {
                        source_id: dataset.id().to_string(),
                        code: class.code.clone(),
                        l0: class.l0.clone(),
                    });
                }
            }
            log::debug!("registered source '{}' ({} classes)", dataset.id(), dataset.classes.len());
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&SourceDataset> {
        self.datasets.iter().find(|d| d.id() == id)
    }

    pub fn get_entry(&self, id: &str, code: &str) -> Option<&SourceClassEntry> {
        self.get(id)?.entry(code)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SourceDataset> {
        self.datasets.iter()
    }

    /// Mutable access for the resolver. Each dataset is an independent
    /// partition; nothing outside a dataset is reachable through it.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, SourceDataset> {
        self.datasets.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    pub fn total_classes(&self) -> usize {
        self.datasets.iter().map(|d| d.classes.len()).sum()
    }
}

impl<'a> IntoIterator for &'a SourceRegistry {
    type Item = &'a SourceDataset;
    type IntoIter = std::slice::Iter<'a, SourceDataset>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// `{id: {meta, classes: {code: entry}}}` in registration order.
impl Serialize for SourceRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.datasets.iter().map(|d| (d.id(), d)))
    }
}
