use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::calendar::{BusinessCalendar, CalendarError};
use crate::error::ErrorCode;
use crate::machine::TicketStateMachine;
use crate::model::{Category, SupportGroup};
use crate::routing::{CategoryRouter, builtin_groups};
use crate::service::{AccessPolicy, DEFAULT_AGENT_ROLE};
use crate::sla::{DEFAULT_SLA_HOURS, SlaPolicy, builtin_hours};
use crate::store::file::STORE_DIR;

/// Engine configuration as read from `.helpdesk/config.toml`.
///
/// The `hours` and `groups` tables are overlays: entries replace or extend
/// the built-in tables rather than replacing them wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub sla: SlaConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub access: AccessConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_opening_hour")]
    pub opening_hour: u32,
    #[serde(default = "default_closing_hour")]
    pub closing_hour: u32,
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            opening_hour: default_opening_hour(),
            closing_hour: default_closing_hour(),
            utc_offset_minutes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaConfig {
    #[serde(default = "default_sla_hours")]
    pub default_hours: u32,
    #[serde(default)]
    pub hours: BTreeMap<String, u32>,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            default_hours: default_sla_hours(),
            hours: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_group")]
    pub default_group: String,
    #[serde(default)]
    pub groups: BTreeMap<String, String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_group: default_group(),
            groups: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default = "default_agent_role")]
    pub agent_role: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            agent_role: default_agent_role(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error("{0} must not be blank")]
    Blank(&'static str),
    #[error("SLA of {hours}h for {key} exceeds the limit of {MAX_SLA_HOURS}h")]
    SlaHoursOutOfRange { key: String, hours: u32 },
}

/// Largest accepted SLA entry: ten years of wall-clock hours.
pub const MAX_SLA_HOURS: u32 = 24 * 365 * 10;

fn check_sla_hours(key: &str, hours: u32) -> Result<(), ConfigError> {
    if hours > MAX_SLA_HOURS {
        return Err(ConfigError::SlaHoursOutOfRange {
            key: key.to_string(),
            hours,
        });
    }
    Ok(())
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::InvalidConfig
    }
}

impl EngineConfig {
    /// Build the state machine described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for invalid working hours, an out-of-range
    /// offset, an SLA entry above [`MAX_SLA_HOURS`] or a blank default group.
    pub fn build(&self) -> Result<TicketStateMachine, ConfigError> {
        let calendar = BusinessCalendar::new(
            self.calendar.opening_hour,
            self.calendar.closing_hour,
            self.calendar.utc_offset_minutes,
        )?;

        check_sla_hours("sla.default_hours", self.sla.default_hours)?;
        let mut hours = builtin_hours();
        for (name, h) in &self.sla.hours {
            check_sla_hours(name, *h)?;
            hours.insert(Category::new(name.as_str()), *h);
        }

        if self.routing.default_group.trim().is_empty() {
            return Err(ConfigError::Blank("routing.default_group"));
        }
        let mut groups = builtin_groups();
        groups.extend(self.routing.groups.iter().map(|(name, group)| {
            (
                Category::new(name.as_str()),
                SupportGroup::new(group.as_str()),
            )
        }));

        Ok(TicketStateMachine::new(
            SlaPolicy::new(calendar, hours, self.sla.default_hours),
            CategoryRouter::new(groups, SupportGroup::new(self.routing.default_group.as_str())),
        ))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Blank`] for a blank agent role.
    pub fn access_policy(&self) -> Result<AccessPolicy, ConfigError> {
        if self.access.agent_role.trim().is_empty() {
            return Err(ConfigError::Blank("access.agent_role"));
        }
        Ok(AccessPolicy {
            agent_role: self.access.agent_role.clone(),
        })
    }
}

/// Path of the project config file under `project_root`.
#[must_use]
pub fn config_path(project_root: &Path) -> PathBuf {
    project_root.join(STORE_DIR).join("config.toml")
}

/// Load `<root>/.helpdesk/config.toml`, falling back to defaults when absent.
///
/// # Errors
///
/// Read or parse failures of an existing file.
pub fn load_engine_config(project_root: &Path) -> Result<EngineConfig> {
    let path = config_path(project_root);
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    load_config_file(&path)
}

/// Load an explicit config file.
///
/// # Errors
///
/// Read or parse failures.
pub fn load_config_file(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<EngineConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_opening_hour() -> u32 {
    8
}

const fn default_closing_hour() -> u32 {
    16
}

const fn default_sla_hours() -> u32 {
    DEFAULT_SLA_HOURS
}

fn default_group() -> String {
    SupportGroup::FIRST_LINE.to_string()
}

fn default_agent_role() -> String {
    DEFAULT_AGENT_ROLE.to_string()
}
