use std::collections::HashMap;

use serde_json::Value as Json;

use super::inspectors::{
    FormatJson, MetaCondition, MetaNegate, NegateSettings, NestedSettings, NumberCompare,
    NumberOp, StringCompare, StringOp,
};
use super::operator::{Condition, Inspector};
use crate::config::{ConditionConfig, ConfigError, InspectorConfig, decode_settings};

/// Builds an inspector from its settings; nested inspectors resolve through the registry
pub type InspectorConstructor =
    fn(&str, &Json, &InspectorRegistry) -> Result<Box<dyn Inspector>, ConfigError>;

/// Maps inspector type tags to constructors
///
/// # Example
/// ```rust,ignore
/// let registry = InspectorRegistry::default();
/// let condition = registry.condition(&config)?;
/// let matched = condition.evaluate(&message).await?;
/// ```
#[derive(Clone)]
pub struct InspectorRegistry {
    constructors: HashMap<String, InspectorConstructor>,
}

impl Default for InspectorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl InspectorRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// A registry holding every built-in inspector
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("string_equal_to", |k, s, _| string(k, s, StringOp::EqualTo))
            .register("string_contains", |k, s, _| string(k, s, StringOp::Contains))
            .register("string_starts_with", |k, s, _| string(k, s, StringOp::StartsWith))
            .register("string_ends_with", |k, s, _| string(k, s, StringOp::EndsWith))
            .register("string_greater_than", |k, s, _| string(k, s, StringOp::GreaterThan))
            .register("string_less_than", |k, s, _| string(k, s, StringOp::LessThan))
            .register("number_equal_to", |k, s, _| number(k, s, NumberOp::EqualTo))
            .register("number_greater_than", |k, s, _| number(k, s, NumberOp::GreaterThan))
            .register("number_less_than", |k, s, _| number(k, s, NumberOp::LessThan))
            .register("format_json", |k, s, _| {
                Ok(Box::new(FormatJson::new(decode_settings(k, s)?)))
            })
            .register("meta_negate", |k, s, registry| {
                let settings: NegateSettings = decode_settings(k, s)?;
                Ok(Box::new(MetaNegate::new(registry.build(&settings.inspector)?)))
            })
            .register("meta_condition", |k, s, registry| {
                let settings: NestedSettings = decode_settings(k, s)?;
                Ok(Box::new(MetaCondition::new(registry.condition(&settings.condition)?)))
            });
        registry
    }

    pub fn register(&mut self, kind: &str, constructor: InspectorConstructor) -> &mut Self {
        self.constructors.insert(kind.to_string(), constructor);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Build one inspector; an unknown type is a configuration error
    pub fn build(&self, config: &InspectorConfig) -> Result<Box<dyn Inspector>, ConfigError> {
        let constructor = self
            .constructors
            .get(&config.kind)
            .ok_or_else(|| ConfigError::UnknownInspector(config.kind.clone()))?;
        constructor(&config.kind, &config.settings, self)
    }

    /// Build a full condition
    pub fn condition(&self, config: &ConditionConfig) -> Result<Condition, ConfigError> {
        let inspectors = config
            .inspectors
            .iter()
            .map(|c| self.build(c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Condition::new(config.operator, inspectors))
    }
}

fn string(kind: &str, settings: &Json, op: StringOp) -> Result<Box<dyn Inspector>, ConfigError> {
    Ok(Box::new(StringCompare::new(op, decode_settings(kind, settings)?)))
}

fn number(kind: &str, settings: &Json, op: NumberOp) -> Result<Box<dyn Inspector>, ConfigError> {
    Ok(Box::new(NumberCompare::new(op, decode_settings(kind, settings)?)))
}
