//! Static reference data: the canonical hierarchy and the source registry,
//! read from TOML.
//!
//! A catalogue directory holds two files:
//! - `hierarchy.toml`: `[[l0]]` .. `[[l3]]` node tables
//! - `sources.toml`: `[[source]]` tables with an inline `classes` array
//!
//! The built-in catalogue is compiled into the crate from `catalogue/`.

use std::path::Path;

use serde::Deserialize;

use crate::error::TaxonomyError;
use crate::hierarchy::HierarchyStore;
use crate::model::{Duration, Encoding, HierarchyNode, Level, Source, SourceClassEntry, YearId};
use crate::registry::{SourceDataset, SourceRegistry};

pub const HIERARCHY_FILE: &str = "hierarchy.toml";
pub const SOURCES_FILE: &str = "sources.toml";

const BUILTIN_HIERARCHY: &str = include_str!("../catalogue/hierarchy.toml");
const BUILTIN_SOURCES: &str = include_str!("../catalogue/sources.toml");

// ---------------------------------------------------------------------------
// File shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct HierarchyFile {
    l0: Vec<NodeDef>,
    l1: Vec<NodeDef>,
    l2: Vec<NodeDef>,
    l3: Vec<NodeDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeDef {
    name: String,
    color: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    duration: Option<Duration>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

impl NodeDef {
    fn into_node(self, level: Level) -> HierarchyNode {
        HierarchyNode {
            level,
            name: self.name,
            display_color: self.color,
            parent: self.parent,
            duration: self.duration,
            description: self.description,
            note: self.note,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SourcesFile {
    #[serde(rename = "source")]
    sources: Vec<SourceDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourceDef {
    id: String,
    label: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    institution: String,
    #[serde(default)]
    resolution: String,
    encoding: Encoding,
    #[serde(default)]
    years: Vec<YearId>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    classes: Vec<ClassDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ClassDef {
    code: String,
    name: String,
    #[serde(default)]
    color: String,
    l0: String,
    #[serde(default)]
    l1: Option<String>,
    #[serde(default)]
    l2: Option<String>,
    #[serde(default)]
    l3: Option<String>,
    /// Source-supplied lifecycle, authoritative over the hierarchy.
    #[serde(default)]
    duration: Option<Duration>,
}

impl SourceDef {
    fn into_dataset(self) -> SourceDataset {
        let classes = self
            .classes
            .into_iter()
            .map(|c| SourceClassEntry {
                code: c.code,
                display_name: c.name,
                display_color: c.color,
                l0: c.l0,
                l1: c.l1,
                l2: c.l2,
                l3: c.l3,
                duration_override: c.duration,
                duration: None,
            })
            .collect();
        let source = Source {
            id: self.id,
            label: self.label,
            country: self.country,
            institution: self.institution,
            resolution: self.resolution,
            encoding: self.encoding,
            years: self.years,
            reference_url: self.url,
        };
        SourceDataset::new(source, classes)
    }
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// Validated reference data, ready to hand to the engine.
#[derive(Debug, Clone)]
pub struct Catalogue {
    pub hierarchy: HierarchyStore,
    pub registry: SourceRegistry,
}

impl Catalogue {
    pub fn new(hierarchy: HierarchyStore, registry: SourceRegistry) -> Self {
        Self { hierarchy, registry }
    }

    /// The catalogue shipped with the crate.
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::from_toml(BUILTIN_HIERARCHY, BUILTIN_SOURCES)
    }

    pub fn from_toml(hierarchy_toml: &str, sources_toml: &str) -> Result<Self, TaxonomyError> {
        let hierarchy = parse_hierarchy(hierarchy_toml)?;
        let registry = parse_sources(sources_toml, &hierarchy)?;
        log::info!(
            "catalogue loaded: {} taxa, {} sources, {} classes",
            hierarchy.len(),
            registry.len(),
            registry.total_classes(),
        );
        Ok(Self { hierarchy, registry })
    }

    /// Read `hierarchy.toml` and `sources.toml` from `dir`.
    pub fn load_dir(dir: &Path) -> Result<Self, TaxonomyError> {
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read_to_string(&path)
                .map_err(|e| TaxonomyError::Io(format!("cannot read {}: {e}", path.display())))
        };
        let hierarchy = read(HIERARCHY_FILE)?;
        let sources = read(SOURCES_FILE)?;
        Self::from_toml(&hierarchy, &sources)
    }
}

pub fn parse_hierarchy(input: &str) -> Result<HierarchyStore, TaxonomyError> {
    let file: HierarchyFile = toml::from_str(input).map_err(|e| TaxonomyError::CatalogueParse {
        file: HIERARCHY_FILE.into(),
        message: e.to_string(),
    })?;

    let nodes = file
        .l0
        .into_iter()
        .map(|n| n.into_node(Level::L0))
        .chain(file.l1.into_iter().map(|n| n.into_node(Level::L1)))
        .chain(file.l2.into_iter().map(|n| n.into_node(Level::L2)))
        .chain(file.l3.into_iter().map(|n| n.into_node(Level::L3)));

    HierarchyStore::new(nodes)
}

pub fn parse_sources(input: &str, hierarchy: &HierarchyStore) -> Result<SourceRegistry, TaxonomyError> {
    let file: SourcesFile = toml::from_str(input).map_err(|e| TaxonomyError::CatalogueParse {
        file: SOURCES_FILE.into(),
        message: e.to_string(),
    })?;

    let datasets = file.sources.into_iter().map(SourceDef::into_dataset).collect();
    SourceRegistry::new(datasets, hierarchy)
}
