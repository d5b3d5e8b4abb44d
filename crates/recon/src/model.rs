use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// L0 name whose classes are expected to carry a crop-type mapping.
pub const CROPLAND: &str = "Cropland";

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// Depth in the canonical taxonomy. Ordered coarse to fine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    /// Land surface type (Cropland, Forest, Water, ...)
    L0,
    /// Crop category (Cereals, Legumes, ...)
    L1,
    /// Crop type (Wheat, Clover, ...)
    L2,
    /// Seasonal or cultivar variant (Winter Wheat, ...)
    L3,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::L0, Level::L1, Level::L2, Level::L3];

    pub fn index(self) -> usize {
        self as usize
    }

    /// The immediately enclosing level, `None` for L0.
    pub fn parent_level(self) -> Option<Level> {
        match self {
            Self::L0 => None,
            Self::L1 => Some(Self::L0),
            Self::L2 => Some(Self::L1),
            Self::L3 => Some(Self::L2),
        }
    }

    pub fn child_level(self) -> Option<Level> {
        match self {
            Self::L0 => Some(Self::L1),
            Self::L1 => Some(Self::L2),
            Self::L2 => Some(Self::L3),
            Self::L3 => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::L0 => "L0",
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crop lifecycle duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Duration {
    Annual,
    Perennial,
    Biennial,
    Mixed,
}

impl std::fmt::Display for Duration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Annual => write!(f, "annual"),
            Self::Perennial => write!(f, "perennial"),
            Self::Biennial => write!(f, "biennial"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

/// One taxon of the canonical hierarchy.
///
/// Serialized without `level` and `name`: the document keys nodes by both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HierarchyNode {
    #[serde(skip)]
    pub level: Level,
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "color")]
    pub display_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl HierarchyNode {
    pub fn new(level: Level, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            level,
            name: name.into(),
            display_color: color.into(),
            parent: None,
            duration: None,
            description: None,
            note: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Vector,
    Raster,
}

/// A product year: either a calendar year or a symbolic label ("current").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearId {
    Year(i64),
    Label(String),
}

impl std::fmt::Display for YearId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Year(y) => write!(f, "{y}"),
            Self::Label(s) => f.write_str(s),
        }
    }
}

/// One external classification product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Source {
    #[serde(skip)]
    pub id: String,
    pub label: String,
    pub country: String,
    #[serde(rename = "source")]
    pub institution: String,
    pub resolution: String,
    #[serde(rename = "type")]
    pub encoding: Encoding,
    pub years: Vec<YearId>,
    #[serde(rename = "url")]
    pub reference_url: String,
}

/// One code defined by one source, mapped onto the hierarchy.
///
/// `duration_override` is what the source supplied; `duration` is what the
/// resolver computed and is the only field written after load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceClassEntry {
    #[serde(skip)]
    pub code: String,
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "color")]
    pub display_color: String,
    #[serde(rename = "L0")]
    pub l0: String,
    #[serde(rename = "L1", skip_serializing_if = "Option::is_none")]
    pub l1: Option<String>,
    #[serde(rename = "L2", skip_serializing_if = "Option::is_none")]
    pub l2: Option<String>,
    #[serde(rename = "L3", skip_serializing_if = "Option::is_none")]
    pub l3: Option<String>,
    #[serde(skip)]
    pub duration_override: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

impl SourceClassEntry {
    pub fn new(code: impl Into<String>, name: impl Into<String>, l0: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            display_name: name.into(),
            display_color: String::new(),
            l0: l0.into(),
            l1: None,
            l2: None,
            l3: None,
            duration_override: None,
            duration: None,
        }
    }

    pub fn with_l1(mut self, l1: impl Into<String>) -> Self {
        self.l1 = Some(l1.into());
        self
    }

    pub fn with_l2(mut self, l2: impl Into<String>) -> Self {
        self.l2 = Some(l2.into());
        self
    }

    pub fn with_l3(mut self, l3: impl Into<String>) -> Self {
        self.l3 = Some(l3.into());
        self
    }

    pub fn with_override(mut self, duration: Duration) -> Self {
        self.duration_override = Some(duration);
        self
    }

    /// The name this entry declares at `level`, if any.
    pub fn name_at(&self, level: Level) -> Option<&str> {
        match level {
            Level::L0 => Some(self.l0.as_str()),
            Level::L1 => self.l1.as_deref(),
            Level::L2 => self.l2.as_deref(),
            Level::L3 => self.l3.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Cross-reference
// ---------------------------------------------------------------------------

/// One source code that maps onto a crop type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub code: String,
    pub name: String,
    /// Always emitted; null when the entry has no (known) variant.
    #[serde(rename = "L3")]
    pub l3: Option<String>,
}

/// Occurrences of one crop type within one source, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOccurrences {
    pub source_id: String,
    pub occurrences: Vec<Occurrence>,
}

/// All source codes mapped onto one L2 crop type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossReferenceEntry {
    pub taxon: String,
    /// Sources in registration order; each id appears once.
    pub sources: Vec<SourceOccurrences>,
}

impl CrossReferenceEntry {
    pub fn new(taxon: impl Into<String>) -> Self {
        Self {
            taxon: taxon.into(),
            sources: Vec::new(),
        }
    }

    /// Number of distinct sources that define this crop type.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.source_id.as_str())
    }

    pub fn occurrences_for(&self, source_id: &str) -> Option<&[Occurrence]> {
        self.sources
            .iter()
            .find(|s| s.source_id == source_id)
            .map(|s| s.occurrences.as_slice())
    }

    /// Append an occurrence. Callers visit sources in registration order, so
    /// the current source is either the last group or a new one.
    pub fn push(&mut self, source_id: &str, occurrence: Occurrence) {
        match self.sources.last_mut() {
            Some(last) if last.source_id == source_id => last.occurrences.push(occurrence),
            _ => self.sources.push(SourceOccurrences {
                source_id: source_id.to_string(),
                occurrences: vec![occurrence],
            }),
        }
    }
}

struct OccurrencesBySource<'a>(&'a [SourceOccurrences]);

impl Serialize for OccurrencesBySource<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|s| (&s.source_id, &s.occurrences)))
    }
}

impl Serialize for CrossReferenceEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("source_count", &self.source_count())?;
        map.serialize_entry("sources", &OccurrencesBySource(&self.sources))?;
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Summary + diagnostics
// ---------------------------------------------------------------------------

/// Per-source aggregate. Distributions are sparse: zero counts never appear.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    #[serde(skip)]
    pub source_id: String,
    pub label: String,
    pub country: String,
    pub resolution: String,
    #[serde(rename = "type")]
    pub encoding: Encoding,
    pub total_classes: usize,
    #[serde(rename = "L0_distribution")]
    pub l0_distribution: BTreeMap<String, usize>,
    #[serde(rename = "L1_distribution")]
    pub l1_distribution: BTreeMap<String, usize>,
}

/// An entry names a taxon the hierarchy does not define.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    pub source_id: String,
    pub code: String,
    pub level: Level,
    pub name: String,
}

/// An entry names two known taxa whose hierarchy parentage disagrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineageConflict {
    pub source_id: String,
    pub code: String,
    pub level: Level,
    pub name: String,
    /// Parent as declared on the entry (its coarser level field).
    pub expected_parent: String,
    /// Parent as recorded in the hierarchy.
    pub found_parent: String,
}
