use serde::Deserialize;

use crate::error::TaxonomyError;

pub const DEFAULT_DESCRIPTION: &str = "Crop and land cover classification hierarchy across all map datasets. \
L0=Land surface type, L1=Crop category, L2=Crop type, L3=Seasonal variant.";

pub const DEFAULT_OUTPUT: &str = "crop_classification_hierarchy.json";

// ---------------------------------------------------------------------------
// Report settings
// ---------------------------------------------------------------------------

/// Presentation settings for the emitted document and text report.
///
/// None of these reach the resolver or the indexer; they only shape output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSettings {
    /// Free-text `_description` of the document.
    pub description: String,
    /// `_generated` marker. Fixed by default so identical input yields an
    /// identical document.
    pub generated: String,
    /// Minimum distinct sources for a crop type to be listed as shared.
    pub min_shared_sources: usize,
    /// How many unreconciled class names to list per source before "+N more".
    pub max_unreconciled_listed: usize,
    /// Artifact path, relative to the working directory.
    pub output: String,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            description: DEFAULT_DESCRIPTION.to_string(),
            generated: default_generated(),
            min_shared_sources: 2,
            max_unreconciled_listed: 10,
            output: DEFAULT_OUTPUT.to_string(),
        }
    }
}

fn default_generated() -> String {
    format!("croptaxa {}", env!("CARGO_PKG_VERSION"))
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReportSettings {
    pub fn from_toml(input: &str) -> Result<Self, TaxonomyError> {
        let settings: ReportSettings =
            toml::from_str(input).map_err(|e| TaxonomyError::ConfigParse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), TaxonomyError> {
        if self.min_shared_sources == 0 {
            return Err(TaxonomyError::ConfigValidation(
                "min_shared_sources must be at least 1".into(),
            ));
        }

        if self.max_unreconciled_listed == 0 {
            return Err(TaxonomyError::ConfigValidation(
                "max_unreconciled_listed must be at least 1".into(),
            ));
        }

        if self.output.trim().is_empty() {
            return Err(TaxonomyError::ConfigValidation("output path is empty".into()));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_gives_defaults() {
        let settings = ReportSettings::from_toml("").unwrap();
        assert_eq!(settings, ReportSettings::default());
        assert_eq!(settings.min_shared_sources, 2);
        assert_eq!(settings.max_unreconciled_listed, 10);
        assert_eq!(settings.output, DEFAULT_OUTPUT);
        assert!(settings.generated.starts_with("croptaxa "));
    }

    #[test]
    fn parse_overrides() {
        let settings = ReportSettings::from_toml(
            r#"
generated = "2026-03-01"
min_shared_sources = 3
max_unreconciled_listed = 5
output = "out/hierarchy.json"
"#,
        )
        .unwrap();
        assert_eq!(settings.generated, "2026-03-01");
        assert_eq!(settings.min_shared_sources, 3);
        assert_eq!(settings.max_unreconciled_listed, 5);
        assert_eq!(settings.output, "out/hierarchy.json");
        assert_eq!(settings.description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn reject_zero_thresholds() {
        let err = ReportSettings::from_toml("min_shared_sources = 0").unwrap_err();
        assert!(matches!(err, TaxonomyError::ConfigValidation(_)));

        let err = ReportSettings::from_toml("max_unreconciled_listed = 0").unwrap_err();
        assert!(matches!(err, TaxonomyError::ConfigValidation(_)));
    }

    #[test]
    fn reject_unknown_key() {
        let err = ReportSettings::from_toml("min_shared = 2").unwrap_err();
        assert!(matches!(err, TaxonomyError::ConfigParse(_)), "typo should fail deserialization");
    }

    #[test]
    fn reject_wrong_type() {
        assert!(ReportSettings::from_toml("min_shared_sources = \"two\"").is_err());
    }
}
