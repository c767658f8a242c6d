use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub mod bag;
pub mod chart;
pub mod types;

pub use bag::PropertyBag;
pub use chart::{ChartIdentity, ChartSource, PortSource, SOURCE_DELIMITER};
pub use types::{DataProviderName, DataType, HistoryType};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("source component '{component}' contains reserved delimiter '{delimiter}'")]
    ReservedDelimiter { component: String, delimiter: char },
    #[error("source list contains an empty component")]
    EmptySourceComponent,
    #[error("unsupported chart identity encoding: {bag}")]
    UnsupportedEncoding { bag: String },
    #[error("chart identity is missing key '{0}'")]
    MissingKey(&'static str),
    #[error("invalid value '{value}' for chart identity key '{key}'")]
    InvalidValue { key: &'static str, value: String },
}

/// One pinned chart as stored on the pin board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinDescription {
    pub provider: String,
    pub name: String,
    pub description: String,
    pub arguments: PropertyBag,
}

impl PinDescription {
    pub fn from_identity(
        provider: impl Into<String>,
        identity: &ChartIdentity,
    ) -> Result<Self, IdentityError> {
        Ok(Self {
            provider: provider.into(),
            name: identity.full_name().to_string(),
            description: identity.source().describe(),
            arguments: identity.encode()?,
        })
    }

    pub fn identity(&self) -> Result<ChartIdentity, IdentityError> {
        ChartIdentity::decode(&self.arguments)
    }

    /// Short chart name carried in the arguments; keys the pin's board slot.
    pub fn chart_name(&self) -> &str {
        self.arguments.get(chart::keys::NAME).unwrap_or(self.name.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PinBoardDefinition {
    pub name: String,
    #[serde(default)]
    pub pins: Vec<PinDescription>,
}

#[derive(thiserror::Error, Debug)]
pub enum PinBoardError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PinBoardDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pins: Vec::new(),
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), PinBoardError> {
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PinBoardError> {
        let data = fs::read(path)?;
        let definition = serde_json::from_slice(&data)?;
        Ok(definition)
    }
}
