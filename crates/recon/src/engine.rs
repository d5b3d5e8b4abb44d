use crate::catalogue::Catalogue;
use crate::hierarchy::HierarchyStore;
use crate::indexer::{build_index, ReconciliationIndex};
use crate::model::{Level, SourceClassEntry, CROPLAND};
use crate::registry::{SourceDataset, SourceRegistry};
use crate::resolver::DurationResolver;

/// Everything the emitter needs: reference data with resolved durations plus
/// the derived views.
#[derive(Debug, Clone)]
pub struct ReconciledModel {
    pub hierarchy: HierarchyStore,
    pub registry: SourceRegistry,
    pub index: ReconciliationIndex,
}

impl ReconciledModel {
    /// Cropland classes of `dataset` that carry no usable L2 mapping, in
    /// declaration order.
    pub fn unreconciled<'d>(&self, dataset: &'d SourceDataset) -> Vec<&'d SourceClassEntry> {
        dataset
            .classes
            .iter()
            .filter(|c| c.l0 == CROPLAND)
            .filter(|c| match c.l2.as_deref() {
                Some(l2) => !self.hierarchy.contains(Level::L2, l2),
                None => true,
            })
            .collect()
    }
}

/// Run the pipeline: resolve every entry, then index the enriched registry.
///
/// Consumes the catalogue; all validation already happened when it was
/// built, so nothing here can fail.
pub fn run(catalogue: Catalogue) -> ReconciledModel {
    let Catalogue {
        hierarchy,
        mut registry,
    } = catalogue;

    let resolved = DurationResolver::new(&hierarchy).resolve_registry(&mut registry);
    log::info!(
        "resolved durations for {}/{} classes",
        resolved,
        registry.total_classes()
    );

    let index = build_index(&hierarchy, &registry);

    ReconciledModel {
        hierarchy,
        registry,
        index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Duration, Encoding, HierarchyNode, Source, YearId};

    fn catalogue() -> Catalogue {
        let hierarchy = HierarchyStore::new(vec![
            HierarchyNode::new(Level::L0, "Cropland", "#f5c71a"),
            HierarchyNode::new(Level::L0, "Grassland", "#7cfc00"),
            HierarchyNode::new(Level::L1, "Cereals", "#d4a017")
                .with_parent("Cropland")
                .with_duration(Duration::Annual),
            HierarchyNode::new(Level::L2, "Wheat", "#d4a017")
                .with_parent("Cereals")
                .with_duration(Duration::Annual),
        ])
        .unwrap();
        let source = Source {
            id: "a".into(),
            label: "A".into(),
            country: "Testland".into(),
            institution: "Test".into(),
            resolution: "30m".into(),
            encoding: Encoding::Raster,
            years: vec![YearId::Year(2023)],
            reference_url: String::new(),
        };
        let registry = SourceRegistry::new(
            vec![SourceDataset::new(
                source,
                vec![
                    SourceClassEntry::new("1", "Wheat", "Cropland").with_l2("Wheat"),
                    SourceClassEntry::new("2", "Sorghum", "Cropland").with_l2("Sorghum"),
                    SourceClassEntry::new("3", "Other crops", "Cropland"),
                    SourceClassEntry::new("4", "Pasture", "Grassland"),
                ],
            )],
            &hierarchy,
        )
        .unwrap();
        Catalogue::new(hierarchy, registry)
    }

    #[test]
    fn run_resolves_then_indexes() {
        let model = run(catalogue());
        let a = model.registry.get("a").unwrap();
        assert_eq!(a.entry("1").unwrap().duration, Some(Duration::Annual));
        assert_eq!(a.entry("3").unwrap().duration, None);
        assert_eq!(a.entry("4").unwrap().duration, Some(Duration::Perennial));
        assert_eq!(model.index.cross_reference["Wheat"].source_count(), 1);
        assert_eq!(model.index.unresolved.len(), 1);
    }

    #[test]
    fn unreconciled_includes_missing_and_unknown_l2() {
        let model = run(catalogue());
        let a = model.registry.get("a").unwrap();
        let names: Vec<&str> = model
            .unreconciled(a)
            .iter()
            .map(|c| c.display_name.as_str())
            .collect();
        assert_eq!(names, ["Sorghum", "Other crops"]);
    }
}
