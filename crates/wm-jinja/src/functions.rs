//! Jinja template functions: config(), var(), ref(), source() and
//! surrogate_key().

use minijinja::value::{Kwargs, Value};
use minijinja::{Error, ErrorKind};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use wm_core::source::SourceLookup;
use wm_core::surrogate_key::sql_expression;

/// Captured config values from config() calls
pub(crate) type ConfigCapture = Arc<Mutex<HashMap<String, Value>>>;

/// Relations referenced during a render
pub(crate) type RelationCapture = Arc<Mutex<CapturedRelations>>;

/// What ref() and source() saw while rendering one template
#[derive(Debug, Clone, Default)]
pub(crate) struct CapturedRelations {
    /// Model names passed to ref()
    pub refs: BTreeSet<String>,
    /// `source.table` pairs passed to source()
    pub sources: BTreeSet<String>,
    /// First reference that failed to resolve
    pub unresolved: Option<Unresolved>,
}

/// A reference that did not resolve
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Unresolved {
    Model(String),
    Source { source_name: String, table: String },
}

/// Relation names that ref() and source() resolve to
#[derive(Debug, Clone, Default)]
pub struct Relations {
    models: HashMap<String, String>,
    sources: SourceLookup,
}

impl Relations {
    /// Create a resolver from model relations and declared sources
    pub fn new(models: HashMap<String, String>, sources: SourceLookup) -> Self {
        Self { models, sources }
    }

    /// Quoted relation for `ref(name)`
    pub fn model(&self, name: &str) -> Option<&str> {
        self.models.get(name).map(String::as_str)
    }

    /// Quoted relation for `source(source_name, table)`
    pub fn source(&self, source_name: &str, table: &str) -> Option<&str> {
        self.sources.resolve(source_name, table)
    }

    /// Sorted model names, for error messages
    pub fn known_models(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.keys().cloned().collect();
        names.sort();
        names
    }

    /// Sorted `source.table` names, for error messages
    pub fn known_sources(&self) -> Vec<String> {
        self.sources.known()
    }
}

/// State for is_incremental()
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncrementalState {
    /// Model is configured as incremental
    pub is_incremental_model: bool,
    /// Target relation already exists
    pub model_exists: bool,
    /// --full-refresh was given
    pub full_refresh: bool,
}

impl IncrementalState {
    pub fn new(is_incremental_model: bool, model_exists: bool, full_refresh: bool) -> Self {
        Self {
            is_incremental_model,
            model_exists,
            full_refresh,
        }
    }

    /// True only for an incremental model whose table exists, without --full-refresh
    pub fn is_incremental_run(&self) -> bool {
        self.is_incremental_model && self.model_exists && !self.full_refresh
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, Error> {
    mutex.lock().map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("{what} mutex poisoned: {e}"),
        )
    })
}

/// Create the config() function that captures model configuration
///
/// ```jinja
/// {{ config(materialized='table', unique_key='unique_key') }}
/// ```
pub(crate) fn make_config_fn(
    capture: ConfigCapture,
) -> impl Fn(Kwargs) -> Result<String, Error> + Send + Sync + Clone + 'static {
    move |kwargs: Kwargs| {
        let mut captured = lock(&capture, "config")?;
        for key in kwargs.args() {
            let value = kwargs.get::<Value>(key)?;
            captured.insert(key.to_string(), value);
        }
        Ok(String::new())
    }
}

/// Create the var() function that reads project variables
///
/// ```jinja
/// {{ var('min_temperature', -90) }}
/// ```
pub(crate) fn make_var_fn(
    vars: HashMap<String, serde_json::Value>,
) -> impl Fn(&str, Option<Value>) -> Result<Value, Error> + Send + Sync + Clone + 'static {
    move |name: &str, default: Option<Value>| {
        if let Some(value) = vars.get(name) {
            Ok(json_to_minijinja_value(value))
        } else if let Some(default_val) = default {
            Ok(default_val)
        } else {
            Err(Error::new(
                ErrorKind::UndefinedError,
                format!("Variable '{}' is not defined and no default provided", name),
            ))
        }
    }
}

/// Create the ref() function resolving a model name to its relation
///
/// ```jinja
/// select * from {{ ref('stg_weather') }}
/// ```
pub(crate) fn make_ref_fn(
    relations: Arc<Relations>,
    capture: RelationCapture,
) -> impl Fn(&str) -> Result<String, Error> + Send + Sync + Clone + 'static {
    move |name: &str| {
        let mut captured = lock(&capture, "ref")?;
        match relations.model(name) {
            Some(relation) => {
                captured.refs.insert(name.to_string());
                Ok(relation.to_string())
            }
            None => {
                captured
                    .unresolved
                    .get_or_insert_with(|| Unresolved::Model(name.to_string()));
                Err(Error::new(
                    ErrorKind::InvalidOperation,
                    format!("ref('{}') does not match any model", name),
                ))
            }
        }
    }
}

/// Create the source() function resolving a declared source table
///
/// ```jinja
/// select * from {{ source('raw', 'weather') }}
/// ```
pub(crate) fn make_source_fn(
    relations: Arc<Relations>,
    capture: RelationCapture,
) -> impl Fn(&str, &str) -> Result<String, Error> + Send + Sync + Clone + 'static {
    move |source_name: &str, table: &str| {
        let mut captured = lock(&capture, "source")?;
        match relations.source(source_name, table) {
            Some(relation) => {
                captured.sources.insert(format!("{}.{}", source_name, table));
                Ok(relation.to_string())
            }
            None => {
                captured
                    .unresolved
                    .get_or_insert_with(|| Unresolved::Source {
                        source_name: source_name.to_string(),
                        table: table.to_string(),
                    });
                Err(Error::new(
                    ErrorKind::InvalidOperation,
                    format!("source('{}', '{}') is not declared", source_name, table),
                ))
            }
        }
    }
}

/// Create the surrogate_key() function
///
/// ```jinja
/// {{ surrogate_key(['weather.weather_id', 'country.country_id']) }}
/// ```
pub(crate) fn make_surrogate_key_fn(
) -> impl Fn(Value) -> Result<String, Error> + Send + Sync + Clone + 'static {
    move |columns: Value| {
        let cols = extract_column_array(columns, "surrogate_key")?;
        Ok(sql_expression(&cols))
    }
}

fn extract_column_array(value: Value, fn_name: &str) -> Result<Vec<String>, Error> {
    let cols: Vec<String> = value
        .try_iter()
        .map_err(|_| {
            Error::new(
                ErrorKind::InvalidOperation,
                format!("{fn_name} requires an array of column names"),
            )
        })?
        .map(|v| {
            v.as_str().map(String::from).ok_or_else(|| {
                Error::new(
                    ErrorKind::InvalidOperation,
                    format!("{fn_name}: expected string element, got {}", v.kind()),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if cols.is_empty() {
        return Err(Error::new(
            ErrorKind::InvalidOperation,
            format!("{fn_name} requires a non-empty array of column names"),
        ));
    }
    Ok(cols)
}

/// Convert serde_json::Value to minijinja::Value
pub(crate) fn json_to_minijinja_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::from(()),
        serde_json::Value::Bool(b) => Value::from(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(f) = n.as_f64() {
                Value::from(f)
            } else {
                Value::from(n.to_string())
            }
        }
        serde_json::Value::String(s) => Value::from(s.as_str()),
        serde_json::Value::Array(arr) => {
            Value::from(arr.iter().map(json_to_minijinja_value).collect::<Vec<_>>())
        }
        serde_json::Value::Object(obj) => Value::from_iter(
            obj.iter()
                .map(|(k, v)| (k.clone(), json_to_minijinja_value(v))),
        ),
    }
}

/// Convert serde_yaml::Value to serde_json::Value
pub fn yaml_to_json(yaml: &serde_yaml::Value) -> serde_json::Value {
    match yaml {
        serde_yaml::Value::Null => serde_json::Value::Null,
        serde_yaml::Value::Bool(b) => serde_json::Value::Bool(*b),
        serde_yaml::Value::Number(n) => convert_yaml_number(n),
        serde_yaml::Value::String(s) => serde_json::Value::String(s.clone()),
        serde_yaml::Value::Sequence(seq) => {
            serde_json::Value::Array(seq.iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(map) => serde_json::Value::Object(
            map.iter()
                .filter_map(|(k, v)| k.as_str().map(|key| (key.to_string(), yaml_to_json(v))))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

fn convert_yaml_number(n: &serde_yaml::Number) -> serde_json::Value {
    if let Some(i) = n.as_i64() {
        return serde_json::Value::Number(i.into());
    }
    match n.as_f64().and_then(serde_json::Number::from_f64) {
        Some(num) => serde_json::Value::Number(num),
        None => {
            log::warn!("YAML number {} is NaN or Infinity; converting to null", n);
            serde_json::Value::Null
        }
    }
}

#[cfg(test)]
#[path = "functions_test.rs"]
mod tests;
