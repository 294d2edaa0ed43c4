//! `_info`: provenance kept outside the hashed region

use crate::schema::FixtureFormat;
use serde::{Deserialize, Serialize};

/// Metadata attached to every written fixture. Nothing here is hashed, and
/// nothing here depends on when or where the fixture was filled.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureInfo {
    /// Integrity hash of the fixture body
    pub hash: String,
    /// Free-form comment
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
    /// Name and version of the engine that filled the fixture
    #[serde(rename = "filling-transition-tool")]
    pub filling_transition_tool: String,
    /// Fixture format
    #[serde(rename = "fixture-format")]
    pub fixture_format: FixtureFormat,
    /// Scenario description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Caller-supplied provenance
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Provenance {
    /// Engine name and version
    pub transition_tool: String,
    /// Comment
    pub comment: String,
    /// Description
    pub description: String,
}

impl Provenance {
    /// Provenance naming the filling engine
    pub fn new(transition_tool: impl Into<String>) -> Self {
        Provenance {
            transition_tool: transition_tool.into(),
            ..Default::default()
        }
    }

    /// Set the comment
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Set the description
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub(crate) fn info(&self, hash: String, format: FixtureFormat) -> FixtureInfo {
        FixtureInfo {
            hash,
            comment: self.comment.clone(),
            filling_transition_tool: self.transition_tool.clone(),
            fixture_format: format,
            description: self.description.clone(),
        }
    }
}
