//! Presentation over an already reconciled model: the JSON document and the
//! column-aligned text report. Nothing here feeds back into resolution.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};
use std::io;

use serde::{Serialize, Serializer};

use crate::config::ReportSettings;
use crate::engine::ReconciledModel;
use crate::error::TaxonomyError;
use crate::hierarchy::HierarchyStore;
use crate::model::{CrossReferenceEntry, Duration, LineageConflict, SummaryRecord, UnresolvedReference};
use crate::registry::{SourceDataset, SourceRegistry};

const RULE_WIDTH: usize = 70;
const ID_WIDTH: usize = 25;
const LABEL_WIDTH: usize = 40;
const L0_WIDTH: usize = 10;
const TAXON_WIDTH: usize = 20;

// ---------------------------------------------------------------------------
// Structured document
// ---------------------------------------------------------------------------

/// The persisted artifact. Field order here is the key order on disk.
#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    #[serde(rename = "_description")]
    pub description: &'a str,
    #[serde(rename = "_generated")]
    pub generated: &'a str,
    pub hierarchy: &'a HierarchyStore,
    pub datasets: &'a SourceRegistry,
    #[serde(rename = "cross_reference_L2")]
    pub cross_reference: &'a BTreeMap<String, CrossReferenceEntry>,
    pub summary: SummariesBySource<'a>,
    pub unresolved_references: &'a [UnresolvedReference],
    pub lineage_conflicts: &'a [LineageConflict],
}

/// `{source_id: summary}` in registration order.
#[derive(Debug)]
pub struct SummariesBySource<'a>(pub &'a [SummaryRecord]);

impl Serialize for SummariesBySource<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|s| (&s.source_id, s)))
    }
}

impl<'a> ReportDocument<'a> {
    pub fn new(model: &'a ReconciledModel, settings: &'a ReportSettings) -> Self {
        Self {
            description: &settings.description,
            generated: &settings.generated,
            hierarchy: &model.hierarchy,
            datasets: &model.registry,
            cross_reference: &model.index.cross_reference,
            summary: SummariesBySource(&model.index.summaries),
            unresolved_references: &model.index.unresolved,
            lineage_conflicts: &model.index.conflicts,
        }
    }
}

/// Pretty-printed JSON document, two-space indent.
pub fn to_json(model: &ReconciledModel, settings: &ReportSettings) -> Result<String, TaxonomyError> {
    serde_json::to_string_pretty(&ReportDocument::new(model, settings))
        .map_err(|e| TaxonomyError::Serialize(e.to_string()))
}

// ---------------------------------------------------------------------------
// Text report
// ---------------------------------------------------------------------------

/// Annual / perennial / mixed counts for one source. Biennial is not tallied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DurationTally {
    pub annual: usize,
    pub perennial: usize,
    pub mixed: usize,
}

impl DurationTally {
    pub fn of(dataset: &SourceDataset) -> Self {
        let mut tally = Self::default();
        for class in &dataset.classes {
            match class.duration {
                Some(Duration::Annual) => tally.annual += 1,
                Some(Duration::Perennial) => tally.perennial += 1,
                Some(Duration::Mixed) => tally.mixed += 1,
                Some(Duration::Biennial) | None => {}
            }
        }
        tally
    }

    pub fn total(&self) -> usize {
        self.annual + self.perennial + self.mixed
    }
}

pub fn write_text<W: io::Write>(
    out: &mut W,
    model: &ReconciledModel,
    settings: &ReportSettings,
) -> io::Result<()> {
    out.write_all(render_text(model, settings).as_bytes())
}

pub fn render_text(model: &ReconciledModel, settings: &ReportSettings) -> String {
    let mut text = String::new();
    // fmt::Write into a String never fails.
    let _ = render(&mut text, model, settings);
    text
}

fn heading(out: &mut impl fmt::Write, title: &str) -> fmt::Result {
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))
}

fn render(out: &mut impl fmt::Write, model: &ReconciledModel, settings: &ReportSettings) -> fmt::Result {
    let summaries = &model.index.summaries;

    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out, "CROP / LAND-COVER CLASSIFICATION ANALYSIS")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;
    writeln!(out)?;

    heading(out, "DATASETS:")?;
    for s in summaries {
        writeln!(
            out,
            "  {:<ID_WIDTH$} {:<LABEL_WIDTH$} {:>3} classes  ({})",
            s.source_id, s.label, s.total_classes, s.resolution
        )?;
    }
    writeln!(out)?;

    heading(out, "L0 (LAND SURFACE TYPE): classes per dataset")?;
    let all_l0: BTreeSet<&str> = summaries
        .iter()
        .flat_map(|s| s.l0_distribution.keys().map(String::as_str))
        .collect();
    write!(out, "{:<ID_WIDTH$}", "Dataset")?;
    for l0 in &all_l0 {
        write!(out, "{l0:>L0_WIDTH$}")?;
    }
    writeln!(out)?;
    for s in summaries {
        write!(out, "{:<ID_WIDTH$}", s.source_id)?;
        for l0 in &all_l0 {
            match s.l0_distribution.get(*l0) {
                Some(n) => write!(out, "{n:>L0_WIDTH$}")?,
                None => write!(out, "{:>L0_WIDTH$}", "")?,
            }
        }
        writeln!(out)?;
    }
    writeln!(out)?;

    heading(out, "L2 (CROP TYPE): cross-dataset availability")?;
    for entry in model.index.shared_taxa(settings.min_shared_sources) {
        let mut ids: Vec<&str> = entry.source_ids().collect();
        ids.sort_unstable();
        writeln!(
            out,
            "  {:<TAXON_WIDTH$} ({} datasets): {}",
            entry.taxon,
            entry.source_count(),
            ids.join(", ")
        )?;
    }
    writeln!(out)?;

    heading(out, "ANNUAL vs PERENNIAL CROPS per dataset:")?;
    for dataset in &model.registry {
        let t = DurationTally::of(dataset);
        if t.total() > 0 {
            writeln!(
                out,
                "  {:<ID_WIDTH$} annual={:>3}  perennial={:>3}  mixed={:>3}",
                dataset.id(),
                t.annual,
                t.perennial,
                t.mixed
            )?;
        }
    }
    writeln!(out)?;

    heading(out, "DATASET-SPECIFIC CROP CLASSES (not in hierarchy):")?;
    let limit = settings.max_unreconciled_listed;
    for dataset in &model.registry {
        let unreconciled = model.unreconciled(dataset);
        if unreconciled.is_empty() {
            continue;
        }
        let names: Vec<&str> = unreconciled
            .iter()
            .take(limit)
            .map(|c| c.display_name.as_str())
            .collect();
        write!(out, "  {}: {}", dataset.id(), names.join(", "))?;
        if unreconciled.len() > limit {
            write!(out, " (+{} more)", unreconciled.len() - limit)?;
        }
        writeln!(out)?;
    }

    if !model.index.unresolved.is_empty() {
        writeln!(out)?;
        heading(out, "UNRESOLVED REFERENCES:")?;
        for r in &model.index.unresolved {
            writeln!(out, "  {}/{}: {} '{}'", r.source_id, r.code, r.level, r.name)?;
        }
    }

    if !model.index.conflicts.is_empty() {
        writeln!(out)?;
        heading(out, "LINEAGE CONFLICTS:")?;
        for c in &model.index.conflicts {
            writeln!(
                out,
                "  {}/{}: {} '{}' declared under '{}', hierarchy parent '{}'",
                c.source_id, c.code, c.level, c.name, c.expected_parent, c.found_parent
            )?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::Catalogue;
    use crate::engine::run;
    use crate::model::{Encoding, HierarchyNode, Level, Source, SourceClassEntry, YearId};

    fn source(id: &str, label: &str) -> Source {
        Source {
            id: id.into(),
            label: label.into(),
            country: "Testland".into(),
            institution: "Test".into(),
            resolution: "10m".into(),
            encoding: Encoding::Raster,
            years: vec![YearId::Year(2021)],
            reference_url: String::new(),
        }
    }

    fn model() -> ReconciledModel {
        let hierarchy = HierarchyStore::new(vec![
            HierarchyNode::new(Level::L0, "Cropland", "#f5c71a"),
            HierarchyNode::new(Level::L0, "Grassland", "#7cfc00"),
            HierarchyNode::new(Level::L1, "Cereals", "#d4a017")
                .with_parent("Cropland")
                .with_duration(Duration::Annual),
            HierarchyNode::new(Level::L2, "Wheat", "#d4a017")
                .with_parent("Cereals")
                .with_duration(Duration::Annual),
            HierarchyNode::new(Level::L2, "Barley", "#ccaa00")
                .with_parent("Cereals")
                .with_duration(Duration::Annual),
        ])
        .unwrap();
        let crops: Vec<SourceClassEntry> = (1..=12)
            .map(|i| SourceClassEntry::new(i.to_string(), format!("Crop {i}"), "Cropland"))
            .collect();
        let registry = SourceRegistry::new(
            vec![
                SourceDataset::new(
                    source("beta", "Beta map"),
                    vec![
                        SourceClassEntry::new("W", "Wheat", "Cropland").with_l2("Wheat"),
                        SourceClassEntry::new("B", "Barley", "Cropland").with_l2("Barley"),
                        SourceClassEntry::new("G", "Grass", "Grassland"),
                    ],
                ),
                SourceDataset::new(
                    source("alpha", "Alpha map"),
                    vec![
                        SourceClassEntry::new("1", "Wheat", "Cropland").with_l1("Cereals").with_l2("Wheat"),
                        SourceClassEntry::new("2", "Quinoa", "Cropland").with_l2("Quinoa"),
                    ],
                ),
                SourceDataset::new(source("gamma", "Gamma map"), crops),
            ],
            &hierarchy,
        )
        .unwrap();
        run(Catalogue::new(hierarchy, registry))
    }

    #[test]
    fn document_key_order() {
        let model = model();
        let json = to_json(&model, &ReportSettings::default()).unwrap();
        let keys = [
            "\"_description\"",
            "\"_generated\"",
            "\"hierarchy\"",
            "\"datasets\"",
            "\"cross_reference_L2\"",
            "\"summary\"",
            "\"unresolved_references\"",
            "\"lineage_conflicts\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    }

    #[test]
    fn document_content() {
        let model = model();
        let settings = ReportSettings {
            generated: "fixed".into(),
            ..ReportSettings::default()
        };
        let value: serde_json::Value = serde_json::from_str(&to_json(&model, &settings).unwrap()).unwrap();
        assert_eq!(value["_generated"], "fixed");
        assert_eq!(value["hierarchy"]["L2"]["Wheat"]["parent"], "Cereals");
        assert!(value["hierarchy"].get("L3").is_none());
        assert_eq!(value["datasets"]["beta"]["classes"]["W"]["duration"], "annual");
        assert_eq!(value["cross_reference_L2"]["Wheat"]["source_count"], 2);
        assert_eq!(value["cross_reference_L2"]["Wheat"]["sources"]["alpha"][0]["code"], "1");
        assert!(value["cross_reference_L2"]["Wheat"]["sources"]["alpha"][0]["L3"].is_null());
        assert_eq!(value["summary"]["gamma"]["total_classes"], 12);
        assert_eq!(value["summary"]["beta"]["L0_distribution"]["Grassland"], 1);
        assert_eq!(value["unresolved_references"][0]["name"], "Quinoa");
        assert_eq!(value["unresolved_references"][0]["level"], "L2");
        assert_eq!(value["lineage_conflicts"], serde_json::json!([]));
    }

    #[test]
    fn document_is_deterministic() {
        let settings = ReportSettings::default();
        assert_eq!(
            to_json(&model(), &settings).unwrap(),
            to_json(&model(), &settings).unwrap()
        );
    }

    #[test]
    fn text_sections_and_layout() {
        let text = render_text(&model(), &ReportSettings::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "=".repeat(70));
        assert!(lines.contains(&"  beta                      Beta map                                   3 classes  (10m)"));
        // L0 matrix: sorted columns, blanks for zero.
        assert!(lines.contains(&"Dataset                    Cropland Grassland"));
        assert!(lines.contains(&"alpha                             2          "));
        assert!(lines.contains(&"  Wheat                (2 datasets): alpha, beta"));
        assert!(!text.contains("  Barley "));
        assert!(lines.contains(&"  beta                      annual=  2  perennial=  1  mixed=  0"));
        assert!(!lines.iter().any(|l| l.starts_with("  gamma ") && l.contains("annual=")));
        assert!(lines.contains(&"  alpha: Quinoa"));
        assert!(text.contains("UNRESOLVED REFERENCES:"));
        assert!(lines.contains(&"  alpha/2: L2 'Quinoa'"));
        assert!(!text.contains("LINEAGE CONFLICTS:"));
    }

    #[test]
    fn unreconciled_list_is_truncated() {
        let settings = ReportSettings {
            max_unreconciled_listed: 10,
            ..ReportSettings::default()
        };
        let text = render_text(&model(), &settings);
        let line = text.lines().find(|l| l.starts_with("  gamma: ")).unwrap();
        assert!(line.ends_with("Crop 10 (+2 more)"), "{line}");
        assert!(!line.contains("Crop 11"));
    }

    #[test]
    fn min_shared_sources_setting() {
        let settings = ReportSettings {
            min_shared_sources: 1,
            ..ReportSettings::default()
        };
        let text = render_text(&model(), &settings);
        assert!(text.contains("  Barley               (1 datasets): beta"));
    }

    #[test]
    fn duration_tally_skips_biennial() {
        let mut dataset = SourceDataset::new(
            source("a", "A"),
            vec![
                SourceClassEntry::new("1", "x", "Cropland"),
                SourceClassEntry::new("2", "y", "Cropland"),
            ],
        );
        dataset.classes[0].duration = Some(Duration::Biennial);
        dataset.classes[1].duration = Some(Duration::Mixed);
        let t = DurationTally::of(&dataset);
        assert_eq!(t, DurationTally { annual: 0, perennial: 0, mixed: 1 });
        assert_eq!(t.total(), 1);
    }

    #[test]
    fn write_text_matches_render() {
        let model = model();
        let settings = ReportSettings::default();
        let mut buf = Vec::new();
        write_text(&mut buf, &model, &settings).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), render_text(&model, &settings));
    }
}
