#![allow(dead_code)]

use substation::prelude::*;

/// Generate JSON object messages spread over `num_groups` values of `group`
pub fn generate_messages(num_messages: usize, num_groups: usize) -> Vec<Message> {
    (0..num_messages)
        .map(|i| {
            let group = i % num_groups.max(1);
            Message::new().with_data(format!(
                r#"{{"id":{i},"group":"g{group}","name":"item-{i}","value":{}}}"#,
                (i % 1000) as f64 / 10.0
            ))
        })
        .collect()
}

/// The same dataset as newline-delimited bytes, as read from a file
pub fn generate_lines(num_messages: usize, num_groups: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for message in generate_messages(num_messages, num_groups) {
        out.extend_from_slice(message.data());
        out.push(b'\n');
    }
    out
}

/// A configuration that touches every stateless transform family
pub const STATELESS_CONFIG: &str = r#"{"transforms": [
    {"type": "object_copy", "settings": {"object": {"source_key": "name", "target_key": "label"}}},
    {"type": "string_to_upper", "settings": {"object": {"source_key": "label", "target_key": "label"}}},
    {"type": "object_insert", "settings": {"object": {"target_key": "seen"}, "value": true},
     "condition": {"inspectors": [
        {"type": "number_greater_than", "settings": {"object": {"source_key": "value"}, "value": 50}}
     ]}},
    {"type": "object_delete", "settings": {"object": {"source_key": "value"}}}
]}"#;

/// A configuration ending in a keyed aggregation
pub const AGGREGATE_CONFIG: &str = r#"{"transforms": [
    {"type": "string_to_lower", "settings": {"object": {"source_key": "name", "target_key": "name"}}},
    {"type": "aggregate_to_array", "settings": {"object": {"batch_key": "group"}, "batch": {"count": 100}}}
]}"#;

/// Load a configuration with an explicit worker count
pub fn load(config: &str, concurrency: usize) -> Substation {
    let mut config = PipelineConfig::from_json(config).expect("Invalid configuration");
    config.concurrency = Some(concurrency);
    Substation::from_config(config).expect("Failed to build configuration")
}
