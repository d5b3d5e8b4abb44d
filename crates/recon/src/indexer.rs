use std::collections::BTreeMap;

use crate::hierarchy::HierarchyStore;
use crate::model::{
    CrossReferenceEntry, Level, LineageConflict, Occurrence, SourceClassEntry, SummaryRecord,
    UnresolvedReference,
};
use crate::registry::{SourceDataset, SourceRegistry};

/// Derived views over the resolved registry.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationIndex {
    /// Keyed by L2 taxon name.
    pub cross_reference: BTreeMap<String, CrossReferenceEntry>,
    /// One record per source, in registration order.
    pub summaries: Vec<SummaryRecord>,
    pub unresolved: Vec<UnresolvedReference>,
    pub conflicts: Vec<LineageConflict>,
}

impl ReconciliationIndex {
    pub fn summary(&self, source_id: &str) -> Option<&SummaryRecord> {
        self.summaries.iter().find(|s| s.source_id == source_id)
    }

    /// Crop types defined by at least `min_sources` distinct sources, most
    /// corroborated first, ties by name.
    pub fn shared_taxa(&self, min_sources: usize) -> Vec<&CrossReferenceEntry> {
        let mut shared: Vec<&CrossReferenceEntry> = self
            .cross_reference
            .values()
            .filter(|e| e.source_count() >= min_sources)
            .collect();
        shared.sort_by(|a, b| {
            b.source_count()
                .cmp(&a.source_count())
                .then_with(|| a.taxon.cmp(&b.taxon))
        });
        shared
    }
}

/// Which of an entry's optional references the hierarchy knows about.
/// `l0` is validated at registry construction and always resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResolvedRefs {
    l1: bool,
    l2: bool,
    l3: bool,
}

fn check_entry(
    hierarchy: &HierarchyStore,
    source_id: &str,
    entry: &SourceClassEntry,
    unresolved: &mut Vec<UnresolvedReference>,
    conflicts: &mut Vec<LineageConflict>,
) -> ResolvedRefs {
    let mut known = [true; 4];

    for level in [Level::L1, Level::L2, Level::L3] {
        let Some(name) = entry.name_at(level) else {
            known[level.index()] = false;
            continue;
        };
        if !hierarchy.contains(level, name) {
            log::warn!("{source_id}/{}: unresolved {level} reference '{name}'", entry.code);
            unresolved.push(UnresolvedReference {
                source_id: source_id.to_string(),
                code: entry.code.clone(),
                level,
                name: name.to_string(),
            });
            known[level.index()] = false;
        }
    }

    // Parentage is only comparable when both the taxon and the coarser name
    // the entry declares are known.
    for level in [Level::L1, Level::L2, Level::L3] {
        let Some(parent_level) = level.parent_level() else {
            continue;
        };
        if !known[level.index()] || !known[parent_level.index()] {
            continue;
        }
        let (Some(name), Some(declared)) = (entry.name_at(level), entry.name_at(parent_level))
        else {
            continue;
        };
        let Some(parent) = hierarchy.parent_of(level, name) else {
            continue;
        };
        if parent.name != declared {
            log::warn!(
                "{source_id}/{}: {level} '{name}' declared under '{declared}' but hierarchy parent is '{}'",
                entry.code,
                parent.name,
            );
            conflicts.push(LineageConflict {
                source_id: source_id.to_string(),
                code: entry.code.clone(),
                level,
                name: name.to_string(),
                expected_parent: declared.to_string(),
                found_parent: parent.name.clone(),
            });
        }
    }

    ResolvedRefs {
        l1: known[Level::L1.index()],
        l2: known[Level::L2.index()],
        l3: known[Level::L3.index()],
    }
}

fn summarize(dataset: &SourceDataset, refs: &[ResolvedRefs]) -> SummaryRecord {
    let mut l0_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut l1_distribution: BTreeMap<String, usize> = BTreeMap::new();

    for (entry, r) in dataset.classes.iter().zip(refs) {
        *l0_distribution.entry(entry.l0.clone()).or_insert(0) += 1;
        if let (true, Some(l1)) = (r.l1, entry.l1.as_ref()) {
            *l1_distribution.entry(l1.clone()).or_insert(0) += 1;
        }
    }

    let source = &dataset.source;
    SummaryRecord {
        source_id: source.id.clone(),
        label: source.label.clone(),
        country: source.country.clone(),
        resolution: source.resolution.clone(),
        encoding: source.encoding,
        total_classes: dataset.classes.len(),
        l0_distribution,
        l1_distribution,
    }
}

/// Build the L2 cross-reference and per-source summaries in one pass over
/// the registry. References the hierarchy does not know are recorded and
/// excluded from the level they name; coarser levels still count.
pub fn build_index(hierarchy: &HierarchyStore, registry: &SourceRegistry) -> ReconciliationIndex {
    let mut index = ReconciliationIndex::default();

    for dataset in registry {
        let source_id = dataset.id();
        let refs: Vec<ResolvedRefs> = dataset
            .classes
            .iter()
            .map(|entry| {
                check_entry(
                    hierarchy,
                    source_id,
                    entry,
                    &mut index.unresolved,
                    &mut index.conflicts,
                )
            })
            .collect();

        for (entry, r) in dataset.classes.iter().zip(&refs) {
            let (true, Some(l2)) = (r.l2, entry.l2.as_ref()) else {
                continue;
            };
            let occurrence = Occurrence {
                code: entry.code.clone(),
                name: entry.display_name.clone(),
                l3: if r.l3 { entry.l3.clone() } else { None },
            };
            index
                .cross_reference
                .entry(l2.clone())
                .or_insert_with(|| CrossReferenceEntry::new(l2.clone()))
                .push(source_id, occurrence);
        }

        let summary = summarize(dataset, &refs);
        log::debug!(
            "source '{}': {} classes, {} L0 keys, {} L1 keys",
            source_id,
            summary.total_classes,
            summary.l0_distribution.len(),
            summary.l1_distribution.len(),
        );
        index.summaries.push(summary);
    }

    log::info!(
        "indexed {} sources: {} crop types cross-referenced, {} unresolved references, {} lineage conflicts",
        index.summaries.len(),
        index.cross_reference.len(),
        index.unresolved.len(),
        index.conflicts.len(),
    );
    index
}
