use cached::proc_macro::cached;
use opentelemetry::KeyValue;

const METER_NAME: &str = "sector_homekit_bridge";

pub fn increment(name: &'static str, kv: &[(&str, &str)]) {
    counter(name).add(1, &as_kvs(kv))
}

fn as_kvs(kv: &[(&str, &str)]) -> Vec<KeyValue> {
    kv.iter()
        .map(|(k, v)| KeyValue::new(k.to_string(), v.to_string()))
        .collect()
}

#[cached]
fn counter(name: &'static str) -> opentelemetry::metrics::Counter<u64> {
    opentelemetry::global::meter(METER_NAME).u64_counter(name).build()
}
