use std::{fs, path::Path};

use serde::Deserialize;
use shared::domain::PersonField;
use tracing::warn;

pub const DEFAULT_SETTINGS_FILE: &str = "people.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub batch_group: String,
    pub default_age: u32,
    pub search_field: PersonField,
    pub sort_field: PersonField,
    pub layout: LayoutSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            batch_group: "peopleGroup".into(),
            default_age: 18,
            search_field: PersonField::LastName,
            sort_field: PersonField::LastName,
            layout: LayoutSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub detail_width_percent: u8,
    pub collapsed_width_percent: u8,
    pub search_width_expanded_percent: u8,
    pub search_width_collapsed_percent: u8,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            detail_width_percent: 60,
            collapsed_width_percent: 100,
            search_width_expanded_percent: 40,
            search_width_collapsed_percent: 25,
        }
    }
}

/// Defaults, then the TOML file at `path` (when readable), then `APP__*`
/// environment overrides. Unparsable input is logged and ignored.
pub fn load_settings(path: &Path) -> SessionSettings {
    let mut settings = match fs::read_to_string(path) {
        Ok(raw) => parse_settings(&raw).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "ignoring unparsable settings file");
            SessionSettings::default()
        }),
        Err(_) => SessionSettings::default(),
    };
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub fn parse_settings(raw: &str) -> Result<SessionSettings, toml::de::Error> {
    toml::from_str(raw)
}

fn apply_env_overrides(settings: &mut SessionSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__BATCH_GROUP") {
        if !v.trim().is_empty() {
            settings.batch_group = v.trim().to_string();
        }
    }
    if let Some(v) = lookup("APP__DEFAULT_AGE") {
        if let Ok(parsed) = v.trim().parse::<u32>() {
            settings.default_age = parsed;
        }
    }
    if let Some(field) = lookup("APP__SEARCH_FIELD").and_then(|v| PersonField::parse(&v)) {
        settings.search_field = field;
    }
    if let Some(field) = lookup("APP__SORT_FIELD").and_then(|v| PersonField::parse(&v)) {
        settings.sort_field = field;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
