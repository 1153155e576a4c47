use futures::stream;
use substation::prelude::*;
use tokio::runtime::Builder;

/// Pipeline hotpath profiling
///
/// Profiles a multi-stage configuration with a gated stage, a shared
/// key-value store and a keyed aggregation at the end.
///
/// Run with: cargo run --release --bin hotpath_pipeline --features profiling
#[hotpath::main]
fn main() {
    println!("=== Pipeline Hotpath Profile ===");
    println!("Workload: 500K JSON messages through 5 stages ending in a keyed aggregation");
    println!("Configuration: 8 workers per stage, one in-memory key-value store");
    println!();

    // Create runtime with 8 threads
    let runtime = Builder::new_multi_thread()
        .worker_threads(8)
        .enable_all()
        .build()
        .unwrap();

    println!("Starting profiled execution...");
    println!();

    runtime.block_on(async {
        run_pipeline_workload().await;
    });

    println!();
    println!("Profiling complete. Results show per-stage overhead under a sustained stream.");
}

const CONFIG: &str = r#"{
    "concurrency": 8,
    "channel_capacity": 256,
    "kv_stores": {"names": {"type": "memory", "settings": {"capacity": 4096}}},
    "transforms": [
        {"type": "enrich_kv_store_item_set",
         "settings": {"kv_store": "names", "object": {"source_key": "group", "target_key": "name"}}},
        {"type": "string_to_upper", "settings": {"object": {"source_key": "name", "target_key": "name"}}},
        {"type": "object_insert", "settings": {"object": {"target_key": "large"}, "value": true},
         "condition": {"inspectors": [
            {"type": "number_greater_than", "settings": {"object": {"source_key": "value"}, "value": 500}}
         ]}},
        {"type": "enrich_kv_store_item_get",
         "settings": {"kv_store": "names", "object": {"source_key": "group", "target_key": "first"}}},
        {"type": "aggregate_to_array", "settings": {"object": {"batch_key": "group"}, "batch": {"count": 500}}}
    ]
}"#;

#[hotpath::measure]
async fn run_pipeline_workload() {
    let num_messages = 500_000;
    let num_groups = 1_000;

    let config = PipelineConfig::from_json(CONFIG).unwrap();
    let sub = Substation::from_config(config).unwrap();
    let sink = CollectSink::new();

    println!("Streaming {} messages over {} groups...", num_messages, num_groups);

    let source = stream::iter((0..num_messages).map(move |i| {
        Ok(Message::new().with_data(format!(
            r#"{{"id":{i},"group":"g{}","name":"item-{i}","value":{}}}"#,
            i % num_groups,
            i % 1_000
        )))
    }));

    sub.run(source, sink.clone(), CancellationToken::new())
        .await
        .unwrap();
    sub.close().await.unwrap();

    println!("Delivered {} batches", sink.messages().len());
}
