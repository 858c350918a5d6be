//! Run parameters: the identifier lists read from a key-value parameter source
//! at the start of every run.

use std::collections::HashMap;

pub const GROUP_IDS: &str = "group_ids";
pub const EVENT_IDS: &str = "event_ids";
pub const KEYWORDS: &str = "keywords";

/// A read-only key-value store of named parameters.
pub trait ParameterSource {
    /// `Ok(None)` when the parameter is not set.
    fn get(&self, name: &str) -> anyhow::Result<Option<String>>;
}

impl ParameterSource for HashMap<String, String> {
    fn get(&self, name: &str) -> anyhow::Result<Option<String>> {
        Ok(HashMap::get(self, name).cloned())
    }
}

/// Reads `<PREFIX><NAME>` from the process environment, upper-cased.
pub struct EnvParameterSource {
    prefix: String,
}

impl EnvParameterSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn var_name(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name.to_uppercase())
    }
}

impl ParameterSource for EnvParameterSource {
    fn get(&self, name: &str) -> anyhow::Result<Option<String>> {
        match std::env::var(self.var_name(name)) {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("{}: {}", self.var_name(name), e)),
        }
    }
}

/// Consults each layer in order; the first one that has the parameter wins.
#[derive(Default)]
pub struct LayeredParameters {
    layers: Vec<Box<dyn ParameterSource + Send + Sync>>,
}

impl LayeredParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, layer: impl ParameterSource + Send + Sync + 'static) -> Self {
        self.layers.push(Box::new(layer));
        self
    }
}

impl ParameterSource for LayeredParameters {
    fn get(&self, name: &str) -> anyhow::Result<Option<String>> {
        for layer in &self.layers {
            if let Some(value) = layer.get(name)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

/// Identifier lists for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunParameters {
    pub group_ids: Vec<String>,
    pub event_ids: Vec<String>,
    pub keywords: Vec<String>,
}

impl RunParameters {
    /// Missing parameters are treated as empty lists.
    pub fn read(source: &impl ParameterSource) -> anyhow::Result<Self> {
        let read_list = |name: &str| -> anyhow::Result<Vec<String>> {
            Ok(source
                .get(name)?
                .map(|value| split_list(&value))
                .unwrap_or_default())
        };

        Ok(Self {
            group_ids: read_list(GROUP_IDS)?,
            event_ids: read_list(EVENT_IDS)?,
            keywords: read_list(KEYWORDS)?,
        })
    }

    /// Appends keywords from configuration after those read from parameters.
    pub fn with_keywords(mut self, keywords: &[String]) -> Self {
        for keyword in keywords {
            let keyword = keyword.trim();
            if !keyword.is_empty() && !self.keywords.iter().any(|k| k == keyword) {
                self.keywords.push(keyword.to_string());
            }
        }
        self
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
