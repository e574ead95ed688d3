use luxeplay::{common::KeyValueStore, storage::JsonFileStore, LuxeResult};

fn main() -> LuxeResult<()> {
    let root = std::env::args().nth(1).unwrap_or_else(|| "./luxeplay_data".to_string());
    let store = JsonFileStore::open(&root)?;

    println!("Snapshots in {}:", store.root().display());
    for key in store.keys()? {
        let Some(raw) = store.get(&key)? else {
            continue;
        };
        let summary = match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Array(items)) => format!("{} entries", items.len()),
            Ok(serde_json::Value::Object(fields)) => format!("{} fields", fields.len()),
            Ok(other) => other.to_string(),
            Err(e) => format!("unreadable ({})", e),
        };
        println!("  {:<28} {:>8} bytes  {}", key, raw.len(), summary);
    }
    Ok(())
}
