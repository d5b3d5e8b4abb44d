//! Lifecycle duration resolution.
//!
//! Duration is a property of the crop type, not of any one source's encoding
//! of it, so the most specific level that carries a value wins. The
//! precedence is an explicit rule list rather than inline branching:
//!
//! 1. `Override`: the entry's own `duration_override`
//! 2. `CropType`: the L2 taxon's duration
//! 3. `CropCategory`: the L1 taxon's duration (derived from the L2 parent
//!    when the entry omits `l1`)
//! 4. `LandSurfaceDefault`: fixed table for non-crop L0 types
//!
//! No match leaves the duration undefined, which is a valid outcome.

use serde::Serialize;

use crate::hierarchy::HierarchyStore;
use crate::model::{Duration, Level, SourceClassEntry};
use crate::registry::SourceRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionRule {
    Override,
    CropType,
    CropCategory,
    LandSurfaceDefault,
}

impl ResolutionRule {
    pub const DEFAULT_CHAIN: [ResolutionRule; 4] = [
        Self::Override,
        Self::CropType,
        Self::CropCategory,
        Self::LandSurfaceDefault,
    ];

    /// Evaluate this single rule. `None` means "no opinion, try the next".
    pub fn apply(self, entry: &SourceClassEntry, hierarchy: &HierarchyStore) -> Option<Duration> {
        match self {
            Self::Override => entry.duration_override,
            Self::CropType => {
                let l2 = entry.l2.as_deref()?;
                hierarchy.get_node(Level::L2, l2)?.duration
            }
            Self::CropCategory => match entry.l1.as_deref() {
                Some(l1) => hierarchy.get_node(Level::L1, l1)?.duration,
                None => {
                    let l2 = entry.l2.as_deref()?;
                    hierarchy.parent_of(Level::L2, l2)?.duration
                }
            },
            Self::LandSurfaceDefault => land_surface_default(&entry.l0),
        }
    }
}

impl std::fmt::Display for ResolutionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Override => write!(f, "override"),
            Self::CropType => write!(f, "crop_type"),
            Self::CropCategory => write!(f, "crop_category"),
            Self::LandSurfaceDefault => write!(f, "land_surface_default"),
        }
    }
}

/// Duration for non-crop land surface types. Perennial vegetation covers
/// resolve to `Perennial`; everything else (Water, Urban, Bare, Snow/Ice,
/// Wetland, Unknown, Fallow, Cropland) has no default.
pub fn land_surface_default(l0: &str) -> Option<Duration> {
    match l0 {
        "Grassland" | "Forest" | "Shrubland" => Some(Duration::Perennial),
        _ => None,
    }
}

/// A resolved value together with the rule that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub duration: Duration,
    pub rule: ResolutionRule,
}

pub struct DurationResolver<'a> {
    hierarchy: &'a HierarchyStore,
    rules: Vec<ResolutionRule>,
}

impl<'a> DurationResolver<'a> {
    pub fn new(hierarchy: &'a HierarchyStore) -> Self {
        Self::with_rules(hierarchy, ResolutionRule::DEFAULT_CHAIN.to_vec())
    }

    pub fn with_rules(hierarchy: &'a HierarchyStore, rules: Vec<ResolutionRule>) -> Self {
        Self { hierarchy, rules }
    }

    pub fn rules(&self) -> &[ResolutionRule] {
        &self.rules
    }

    /// First rule, in priority order, that yields a value.
    pub fn explain(&self, entry: &SourceClassEntry) -> Option<Resolution> {
        self.rules.iter().find_map(|&rule| {
            rule.apply(entry, self.hierarchy)
                .map(|duration| Resolution { duration, rule })
        })
    }

    pub fn resolve(&self, entry: &SourceClassEntry) -> Option<Duration> {
        self.explain(entry).map(|r| r.duration)
    }

    /// Write the resolved duration onto the entry. The computation reads only
    /// the override and the hierarchy, never a previously resolved value, so
    /// repeated calls leave the entry unchanged.
    pub fn apply(&self, entry: &mut SourceClassEntry) -> Option<Duration> {
        let duration = self.resolve(entry);
        if entry.duration != duration {
            entry.duration = duration;
        }
        duration
    }

    /// Resolve every entry of every source exactly once. Returns how many
    /// entries ended up with a defined duration.
    pub fn resolve_registry(&self, registry: &mut SourceRegistry) -> usize {
        let mut resolved = 0;
        for dataset in registry.iter_mut() {
            let mut in_source = 0;
            for entry in dataset.classes.iter_mut() {
                if self.apply(entry).is_some() {
                    in_source += 1;
                }
            }
            log::debug!(
                "source '{}': {}/{} classes have a duration",
                dataset.source.id,
                in_source,
                dataset.classes.len(),
            );
            resolved += in_source;
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HierarchyNode;

    fn hierarchy() -> HierarchyStore {
        HierarchyStore::new(vec![
            HierarchyNode::new(Level::L0, "Cropland", "#f5c71a"),
            HierarchyNode::new(Level::L0, "Grassland", "#7cfc00"),
            HierarchyNode::new(Level::L0, "Forest", "#006400"),
            HierarchyNode::new(Level::L0, "Shrubland", "#9acd32"),
            HierarchyNode::new(Level::L0, "Water", "#4682b4"),
            HierarchyNode::new(Level::L0, "Fallow", "#d2b48c"),
            HierarchyNode::new(Level::L1, "Cereals", "#d4a017")
                .with_parent("Cropland")
                .with_duration(Duration::Annual),
            HierarchyNode::new(Level::L1, "Legumes", "#228b22")
                .with_parent("Cropland")
                .with_duration(Duration::Annual),
            HierarchyNode::new(Level::L1, "Fodder Crops", "#90ee90")
                .with_parent("Cropland")
                .with_duration(Duration::Mixed),
            HierarchyNode::new(Level::L1, "Unrated", "#000000").with_parent("Cropland"),
            HierarchyNode::new(Level::L2, "Wheat", "#d4a017")
                .with_parent("Cereals")
                .with_duration(Duration::Annual),
            HierarchyNode::new(Level::L2, "Clover", "#00cd66")
                .with_parent("Legumes")
                .with_duration(Duration::Perennial),
            HierarchyNode::new(Level::L2, "Vetch", "#267000").with_parent("Legumes"),
            HierarchyNode::new(Level::L2, "Mystery", "#000000").with_parent("Unrated"),
        ])
        .unwrap()
    }

    #[test]
    fn override_beats_crop_type() {
        let h = hierarchy();
        let entry = SourceClassEntry::new("1", "Wheat cover", "Cropland")
            .with_l1("Cereals")
            .with_l2("Wheat")
            .with_override(Duration::Biennial);
        let r = DurationResolver::new(&h).explain(&entry).unwrap();
        assert_eq!(r.duration, Duration::Biennial);
        assert_eq!(r.rule, ResolutionRule::Override);
    }

    #[test]
    fn crop_type_beats_crop_category() {
        let h = hierarchy();
        let entry = SourceClassEntry::new("14", "Clover", "Cropland")
            .with_l1("Legumes")
            .with_l2("Clover");
        let r = DurationResolver::new(&h).explain(&entry).unwrap();
        assert_eq!(r.duration, Duration::Perennial);
        assert_eq!(r.rule, ResolutionRule::CropType);
    }

    #[test]
    fn crop_category_used_when_crop_type_has_no_duration() {
        let h = hierarchy();
        let entry = SourceClassEntry::new("224", "Vetch", "Cropland")
            .with_l1("Legumes")
            .with_l2("Vetch");
        let r = DurationResolver::new(&h).explain(&entry).unwrap();
        assert_eq!(r.duration, Duration::Annual);
        assert_eq!(r.rule, ResolutionRule::CropCategory);
    }

    #[test]
    fn crop_category_derived_from_crop_type_parent() {
        let h = hierarchy();
        let entry = SourceClassEntry::new("9", "Vetch", "Cropland").with_l2("Vetch");
        let r = DurationResolver::new(&h).explain(&entry).unwrap();
        assert_eq!(r.duration, Duration::Annual);
        assert_eq!(r.rule, ResolutionRule::CropCategory);
        // Derivation never writes l1 back.
        assert!(entry.l1.is_none());
    }

    #[test]
    fn category_only_entry() {
        let h = hierarchy();
        let entry = SourceClassEntry::new("CA02", "Cover Crop", "Cropland").with_l1("Fodder Crops");
        assert_eq!(DurationResolver::new(&h).resolve(&entry), Some(Duration::Mixed));
    }

    #[test]
    fn land_surface_defaults() {
        let h = hierarchy();
        let resolver = DurationResolver::new(&h);
        for l0 in ["Grassland", "Forest", "Shrubland"] {
            let entry = SourceClassEntry::new("x", l0, l0);
            assert_eq!(resolver.resolve(&entry), Some(Duration::Perennial), "{l0}");
        }
        for l0 in ["Water", "Fallow", "Cropland"] {
            let entry = SourceClassEntry::new("x", l0, l0);
            assert_eq!(resolver.resolve(&entry), None, "{l0}");
        }
        for l0 in ["Urban", "Bare", "Snow/Ice", "Wetland", "Unknown"] {
            assert_eq!(land_surface_default(l0), None, "{l0}");
        }
    }

    #[test]
    fn unknown_taxa_fall_through_to_undefined() {
        let h = hierarchy();
        let entry = SourceClassEntry::new("1", "Quinoa", "Cropland")
            .with_l1("Pseudocereals")
            .with_l2("Quinoa");
        assert_eq!(DurationResolver::new(&h).explain(&entry), None);

        let no_values = SourceClassEntry::new("2", "Mystery", "Cropland").with_l2("Mystery");
        assert_eq!(DurationResolver::new(&h).resolve(&no_values), None);
    }

    #[test]
    fn rule_order_is_data() {
        let h = hierarchy();
        let entry = SourceClassEntry::new("14", "Clover", "Cropland")
            .with_l1("Legumes")
            .with_l2("Clover");
        let category_first = DurationResolver::with_rules(
            &h,
            vec![ResolutionRule::CropCategory, ResolutionRule::CropType],
        );
        assert_eq!(category_first.resolve(&entry), Some(Duration::Annual));
        assert_eq!(category_first.rules().len(), 2);
    }

    #[test]
    fn apply_is_idempotent() {
        let h = hierarchy();
        let resolver = DurationResolver::new(&h);
        let mut entry = SourceClassEntry::new("AC66", "Winter Wheat", "Cropland")
            .with_l1("Cereals")
            .with_l2("Wheat");
        assert_eq!(resolver.apply(&mut entry), Some(Duration::Annual));
        let snapshot = entry.clone();
        assert_eq!(resolver.apply(&mut entry), Some(Duration::Annual));
        assert_eq!(entry, snapshot);
    }

    #[test]
    fn apply_clears_stale_value() {
        let h = hierarchy();
        let mut entry = SourceClassEntry::new("83", "Water", "Water");
        entry.duration = Some(Duration::Annual);
        assert_eq!(DurationResolver::new(&h).apply(&mut entry), None);
        assert_eq!(entry.duration, None);
    }
}
