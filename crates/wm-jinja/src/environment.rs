//! Jinja environment setup for Weathermart

use crate::error::{JinjaError, JinjaResult};
use crate::functions::{
    make_config_fn, make_ref_fn, make_source_fn, make_surrogate_key_fn, make_var_fn,
    yaml_to_json, ConfigCapture, IncrementalState, RelationCapture, Relations, Unresolved,
};
use minijinja::{context, Environment, Value};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};
use wm_core::config::Materialization;
use wm_core::model::ModelConfig;
use wm_core::model_name::ModelName;

/// Per-model values exposed to a template as `this` and `is_incremental()`
#[derive(Debug, Clone, Default)]
pub struct ModelContext {
    /// Quoted relation the model materializes into
    pub this: String,
    pub incremental: IncrementalState,
}

/// Result of rendering a model template
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedModel {
    /// Rendered SQL, trimmed
    pub sql: String,
    /// Configuration from config()
    pub config: ModelConfig,
    /// Models referenced with ref(), sorted
    pub refs: Vec<ModelName>,
    /// `source.table` pairs referenced with source(), sorted
    pub sources: Vec<String>,
}

/// Jinja templating environment for Weathermart
pub struct JinjaEnvironment<'a> {
    env: Environment<'a>,
    config_capture: ConfigCapture,
    relation_capture: RelationCapture,
    relations: Arc<Relations>,
}

impl<'a> JinjaEnvironment<'a> {
    /// Environment with `config()`, `var()` and `surrogate_key()`; no relations resolve
    pub fn new(vars: &HashMap<String, serde_yaml::Value>) -> Self {
        Self::with_relations(vars, Relations::default())
    }

    /// Environment that also resolves `ref()` and `source()` against `relations`
    pub fn with_relations(vars: &HashMap<String, serde_yaml::Value>, relations: Relations) -> Self {
        let mut env = Environment::new();
        let config_capture: ConfigCapture = Arc::new(Mutex::new(HashMap::new()));
        let relation_capture: RelationCapture = Arc::new(Mutex::new(Default::default()));
        let relations = Arc::new(relations);

        let json_vars: HashMap<String, serde_json::Value> = vars
            .iter()
            .map(|(k, v)| (k.clone(), yaml_to_json(v)))
            .collect();

        env.add_function("config", make_config_fn(config_capture.clone()));
        env.add_function("var", make_var_fn(json_vars));
        env.add_function(
            "ref",
            make_ref_fn(relations.clone(), relation_capture.clone()),
        );
        env.add_function(
            "source",
            make_source_fn(relations.clone(), relation_capture.clone()),
        );
        env.add_function("surrogate_key", make_surrogate_key_fn());

        Self {
            env,
            config_capture,
            relation_capture,
            relations,
        }
    }

    fn reset_captures(&self) -> JinjaResult<()> {
        lock(&self.config_capture)?.clear();
        *lock(&self.relation_capture)? = Default::default();
        Ok(())
    }

    /// Render a template string without model context
    pub fn render(&self, template: &str) -> JinjaResult<String> {
        self.render_model(template, &ModelContext::default())
            .map(|rendered| rendered.sql)
    }

    /// Render a model template, capturing its config and references.
    ///
    /// A `ref()` or `source()` that does not resolve fails the render with
    /// [`JinjaError::UnknownModel`] or [`JinjaError::UnknownSource`].
    pub fn render_model(&self, template: &str, model: &ModelContext) -> JinjaResult<RenderedModel> {
        self.reset_captures()?;

        let state = model.incremental;
        let ctx = context! {
            this => model.this.as_str(),
            is_incremental => Value::from_function(move || state.is_incremental_run()),
        };

        let rendered = match self.env.render_str(template, ctx) {
            Ok(sql) => sql,
            Err(err) => return Err(self.unresolved_error()?.unwrap_or_else(|| err.into())),
        };

        let captured_config = lock(&self.config_capture)?;
        let config = parse_model_config(&captured_config)?;
        let captured = lock(&self.relation_capture)?.clone();
        let refs = captured
            .refs
            .into_iter()
            .map(|r| ModelName::parse(r).map_err(|e| JinjaError::Internal(e.to_string())))
            .collect::<JinjaResult<Vec<_>>>()?;

        Ok(RenderedModel {
            sql: rendered.trim().to_string(),
            config,
            refs,
            sources: captured.sources.into_iter().collect(),
        })
    }

    fn unresolved_error(&self) -> JinjaResult<Option<JinjaError>> {
        let unresolved = lock(&self.relation_capture)?.unresolved.clone();
        Ok(unresolved.map(|u| match u {
            Unresolved::Model(name) => JinjaError::UnknownModel {
                name,
                known: join_or_none(self.relations.known_models()),
            },
            Unresolved::Source { source_name, table } => JinjaError::UnknownSource {
                source_name,
                table,
                known: join_or_none(self.relations.known_sources()),
            },
        }))
    }
}

impl Default for JinjaEnvironment<'_> {
    fn default() -> Self {
        Self::new(&HashMap::new())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> JinjaResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| JinjaError::Internal(format!("capture mutex poisoned: {e}")))
}

fn join_or_none(names: Vec<String>) -> String {
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join(", ")
    }
}

/// Convert captured config() kwargs into a typed [`ModelConfig`]
pub(crate) fn parse_model_config(captured: &HashMap<String, Value>) -> JinjaResult<ModelConfig> {
    let mut config = ModelConfig::default();
    let mut keys: Vec<&String> = captured.keys().collect();
    keys.sort();

    for key in keys {
        let value = &captured[key];
        match key.as_str() {
            "materialized" => {
                let raw = expect_str(key, value)?;
                let parsed = Materialization::from_str(raw).map_err(|e| {
                    JinjaError::InvalidConfigValue {
                        key: key.clone(),
                        message: e.to_string(),
                    }
                })?;
                config.materialized = Some(parsed);
            }
            "schema" => config.schema = Some(expect_str(key, value)?.to_string()),
            "unique_key" => config.unique_key = Some(unique_key_value(key, value)?),
            _ => return Err(JinjaError::InvalidConfigKey { key: key.clone() }),
        }
    }

    Ok(config)
}

fn expect_str<'v>(key: &str, value: &'v Value) -> JinjaResult<&'v str> {
    value.as_str().ok_or_else(|| JinjaError::InvalidConfigValue {
        key: key.to_string(),
        message: format!("expected a string, got {}", value.kind()),
    })
}

fn unique_key_value(key: &str, value: &Value) -> JinjaResult<String> {
    if let Some(s) = value.as_str() {
        return Ok(s.to_string());
    }
    let invalid = || JinjaError::InvalidConfigValue {
        key: key.to_string(),
        message: "expected a column name or a list of column names".to_string(),
    };
    let columns = value
        .try_iter()
        .map_err(|_| invalid())?
        .map(|v| v.as_str().map(String::from).ok_or_else(invalid))
        .collect::<JinjaResult<Vec<_>>>()?;
    Ok(columns.join(","))
}

#[cfg(test)]
#[path = "environment_test.rs"]
mod tests;
