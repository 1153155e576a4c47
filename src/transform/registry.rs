use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as Json;
use tracing::debug;

use super::aggregate::{AggregateFromArray, AggregateFromString, AggregateToArray, AggregateToString};
use super::enrich::{KvStoreItemGet, KvStoreItemSettings, KvStoreItemSet};
use super::meta::{MetaSwitch, MetaSwitchSettings, SwitchCase};
use super::object::{ObjectCopy, ObjectDelete, ObjectInsert};
use super::send::SendBatch;
use super::stage::Stage;
use super::string::{StringAppend, StringCase, StringOp};
use super::transformer::Transformer;
use super::utility::{UtilityControl, UtilityDrop, UtilityErr, UtilityMessage};
use crate::condition::InspectorRegistry;
use crate::config::{ConfigError, TransformConfig, decode_settings};
use crate::storage::Resources;

/// Everything a constructor may need beyond its own settings
pub struct BuildContext<'a> {
    pub registry: &'a TransformRegistry,
    pub resources: &'a Resources,
}

/// Builds a transform from its type tag and settings
pub type TransformConstructor =
    fn(&str, &Json, &BuildContext<'_>) -> Result<Box<dyn Transformer>, ConfigError>;

/// Maps transform type tags to constructors, resolved once at load time
///
/// # Example
/// ```rust,ignore
/// let registry = TransformRegistry::default();
/// let stages = registry.build_all(&config.transforms, &resources)?;
/// let output = apply(&stages, messages).await?;
/// ```
#[derive(Clone)]
pub struct TransformRegistry {
    constructors: HashMap<String, TransformConstructor>,
    inspectors: InspectorRegistry,
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl TransformRegistry {
    /// An empty registry using the built-in inspectors
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
            inspectors: InspectorRegistry::default(),
        }
    }

    /// A registry holding every built-in transform
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("aggregate_to_string", |k, s, _| {
                Ok(Box::new(AggregateToString::new(decode_settings(k, s)?)))
            })
            .register("aggregate_to_array", |k, s, _| {
                Ok(Box::new(AggregateToArray::new(decode_settings(k, s)?)))
            })
            .register("aggregate_from_array", |k, s, _| {
                Ok(Box::new(AggregateFromArray::new(decode_settings(k, s)?)))
            })
            .register("aggregate_from_string", |k, s, _| {
                Ok(Box::new(AggregateFromString::new(decode_settings(k, s)?)))
            })
            .register("object_copy", |k, s, _| {
                Ok(Box::new(ObjectCopy::new(decode_settings(k, s)?)?))
            })
            .register("object_delete", |k, s, _| {
                Ok(Box::new(ObjectDelete::new(decode_settings(k, s)?)?))
            })
            .register("object_insert", |k, s, _| {
                Ok(Box::new(ObjectInsert::new(decode_settings(k, s)?)?))
            })
            .register("string_to_lower", |k, s, _| {
                Ok(Box::new(StringCase::new(StringOp::Lower, decode_settings(k, s)?)))
            })
            .register("string_to_upper", |k, s, _| {
                Ok(Box::new(StringCase::new(StringOp::Upper, decode_settings(k, s)?)))
            })
            .register("string_append", |k, s, _| {
                Ok(Box::new(StringAppend::new(decode_settings(k, s)?)))
            })
            .register("utility_drop", |_, _, _| Ok(Box::new(UtilityDrop)))
            .register("utility_err", |k, s, _| {
                Ok(Box::new(UtilityErr::new(decode_settings(k, s)?)))
            })
            .register("utility_control", |k, s, _| {
                Ok(Box::new(UtilityControl::new(decode_settings(k, s)?)))
            })
            .register("utility_message", |k, s, _| {
                Ok(Box::new(UtilityMessage::new(decode_settings(k, s)?)))
            })
            .register("meta_switch", meta_switch)
            .register("send_stdout", |k, s, _| {
                Ok(Box::new(SendBatch::stdout(decode_settings(k, s)?)))
            })
            .register("send_file", |k, s, _| {
                Ok(Box::new(SendBatch::file(decode_settings(k, s)?)))
            })
            .register("enrich_kv_store_item_get", |k, s, ctx| {
                let settings: KvStoreItemSettings = decode_settings(k, s)?;
                let store = ctx.resources.store(&settings.kv_store)?;
                Ok(Box::new(KvStoreItemGet::new(settings, store)?))
            })
            .register("enrich_kv_store_item_set", |k, s, ctx| {
                let settings: KvStoreItemSettings = decode_settings(k, s)?;
                let store = ctx.resources.store(&settings.kv_store)?;
                Ok(Box::new(KvStoreItemSet::new(settings, store)?))
            });
        registry
    }

    pub fn register(&mut self, kind: &str, constructor: TransformConstructor) -> &mut Self {
        self.constructors.insert(kind.to_string(), constructor);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    pub fn inspectors(&self) -> &InspectorRegistry {
        &self.inspectors
    }

    /// Build one configured transform wrapped in its condition gate and error policy
    pub fn build(
        &self,
        config: &TransformConfig,
        resources: &Resources,
    ) -> Result<Arc<dyn Transformer>, ConfigError> {
        let constructor = self
            .constructors
            .get(&config.kind)
            .ok_or_else(|| ConfigError::UnknownTransform(config.kind.clone()))?;

        let ctx = BuildContext {
            registry: self,
            resources,
        };
        let inner = constructor(&config.kind, &config.settings, &ctx)?;

        let mut stage = Stage::new(config.kind.clone(), inner).with_policy(config.error_policy.policy());
        if let Some(condition) = &config.condition {
            stage = stage.with_condition(self.inspectors.condition(condition)?);
        }
        debug!(transform = %config.kind, "Built transform");
        Ok(Arc::new(stage))
    }

    /// Build an ordered transform list
    pub fn build_all(
        &self,
        configs: &[TransformConfig],
        resources: &Resources,
    ) -> Result<Vec<Arc<dyn Transformer>>, ConfigError> {
        configs.iter().map(|c| self.build(c, resources)).collect()
    }
}

fn meta_switch(
    kind: &str,
    settings: &Json,
    ctx: &BuildContext<'_>,
) -> Result<Box<dyn Transformer>, ConfigError> {
    let settings: MetaSwitchSettings = decode_settings(kind, settings)?;
    let mut cases = Vec::with_capacity(settings.cases.len());
    for case in &settings.cases {
        let condition = match &case.condition {
            Some(c) => Some(ctx.registry.inspectors().condition(c)?),
            None => None,
        };
        cases.push(SwitchCase {
            condition,
            transforms: ctx.registry.build_all(&case.transforms, ctx.resources)?,
        });
    }
    Ok(Box::new(MetaSwitch::new(cases)))
}
