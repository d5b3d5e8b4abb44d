use thiserror::Error;

use crate::model::Level;

#[derive(Debug, Error)]
pub enum TaxonomyError {
    /// A node's declared parent is missing from the enclosing level, or the
    /// parent field is present/absent where the level forbids/requires it.
    #[error("schema violation: {level} node '{name}': {reason}")]
    SchemaViolation {
        level: Level,
        name: String,
        reason: String,
    },
    /// Two nodes share a name within one level.
    #[error("duplicate {level} node '{name}'")]
    DuplicateNode { level: Level, name: String },
    /// Two sources share an id.
    #[error("duplicate source id '{0}'")]
    DuplicateSource(String),
    /// Two classes of one source share a code.
    #[error("source '{source_id}': duplicate class code '{code}'")]
    DuplicateCode { source_id: String, code: String },
    /// A class names an L0 land surface type the hierarchy does not define.
    #[error("source '{source_id}', class '{code}': unknown land surface type '{l0}'")]
    UnknownLandSurface {
        source_id: String,
        code: String,
        l0: String,
    },
    /// TOML parse / deserialization error in a catalogue file.
    #[error("catalogue parse error in {file}: {message}")]
    CatalogueParse { file: String, message: String },
    /// TOML parse / deserialization error in the report settings.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Report settings parsed but hold an unusable value.
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// JSON rendering of the reconciled document failed.
    #[error("serialization error: {0}")]
    Serialize(String),
    /// IO error (file read, etc.).
    #[error("IO error: {0}")]
    Io(String),
}

impl TaxonomyError {
    /// True for errors raised while building the hierarchy or the registry.
    pub fn is_catalogue_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaViolation { .. }
                | Self::DuplicateNode { .. }
                | Self::DuplicateSource(_)
                | Self::DuplicateCode { .. }
                | Self::UnknownLandSurface { .. }
                | Self::CatalogueParse { .. }
        )
    }
}
