// ============================================================================
// spark-fields - Field Group Configuration
// Declarative description of which controls drive which field groups
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::dom::page::DEFAULT_HIDDEN_CLASS;
use crate::error::{ConfigurationError, Result};

/// Option the school select shows when the school is not in the list
pub const OTHER_SCHOOL: &str = "--jiná--";

fn default_container_class() -> Option<String> {
    Some("column".to_string())
}

fn default_hidden_class() -> String {
    DEFAULT_HIDDEN_CLASS.to_string()
}

/// One trigger, the fields it reveals and the value that reveals them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldGroupConfig {
    /// Id of the select whose value is watched
    pub trigger: String,
    /// Ids of the fields shown together
    #[serde(default)]
    pub dependents: Vec<String>,
    pub sentinel: String,
    /// Class of the ancestor that is shown or hidden for each field.
    /// `null` toggles the field element itself.
    #[serde(default = "default_container_class")]
    pub container_class: Option<String>,
}

impl FieldGroupConfig {
    pub fn new(trigger: &str, sentinel: &str) -> Self {
        Self {
            trigger: trigger.to_string(),
            dependents: Vec::new(),
            sentinel: sentinel.to_string(),
            container_class: default_container_class(),
        }
    }

    pub fn dependent(mut self, id: &str) -> Self {
        self.dependents.push(id.to_string());
        self
    }

    /// Toggle each field's closest `class` ancestor; `None` toggles the field.
    pub fn container_class(mut self, class: Option<&str>) -> Self {
        self.container_class = class.map(String::from);
        self
    }

    /// The registration form's alternate school address.
    pub fn school_selector() -> Self {
        Self::new("id_school", OTHER_SCHOOL)
            .dependent("id_school_alt_name")
            .dependent("id_school_alt_street")
            .dependent("id_school_alt_zip_code")
            .dependent("id_school_alt_city")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject blank ids.
    pub fn validate(&self) -> Result<()> {
        if self.trigger.trim().is_empty() {
            return Err(ConfigurationError::EmptyReference { role: "trigger" });
        }
        if self.dependents.iter().any(|id| id.trim().is_empty()) {
            return Err(ConfigurationError::EmptyReference { role: "dependent" });
        }
        Ok(())
    }
}

/// All conditional groups of one form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormConfig {
    #[serde(default = "default_hidden_class")]
    pub hidden_class: String,
    #[serde(default)]
    pub groups: Vec<FieldGroupConfig>,
}

impl FormConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.groups.iter().try_for_each(FieldGroupConfig::validate)
    }
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            hidden_class: default_hidden_class(),
            groups: Vec::new(),
        }
    }
}
