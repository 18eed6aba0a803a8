//! Context map type and layered merge.
//!
//! A context is an ordered JSON object map passed between tasks, agents, and
//! the shared context store.

/// A context mapping: string keys to arbitrary JSON values.
pub type ContextMap = serde_json::Map<String, serde_json::Value>;

/// Merge context layers for a task execution.
///
/// Precedence on key collision, highest first:
/// 1. `call` — context passed explicitly to the execute call
/// 2. `task` — the task's own context
/// 3. `store` — a snapshot of the shared context store
pub fn merge_layers(store: ContextMap, task: &ContextMap, call: Option<&ContextMap>) -> ContextMap {
    let mut merged = store;
    for (k, v) in task {
        merged.insert(k.clone(), v.clone());
    }
    if let Some(call) = call {
        for (k, v) in call {
            merged.insert(k.clone(), v.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(pairs: &[(&str, serde_json::Value)]) -> ContextMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn call_wins_over_task_and_store() {
        let store = map(&[("k", json!("store")), ("s", json!(1))]);
        let task = map(&[("k", json!("task")), ("t", json!(2))]);
        let call = map(&[("k", json!("call"))]);

        let merged = merge_layers(store, &task, Some(&call));
        assert_eq!(merged["k"], json!("call"));
        assert_eq!(merged["s"], json!(1));
        assert_eq!(merged["t"], json!(2));
    }

    #[test]
    fn task_wins_over_store() {
        let store = map(&[("k", json!("store"))]);
        let task = map(&[("k", json!("task"))]);

        let merged = merge_layers(store, &task, None);
        assert_eq!(merged["k"], json!("task"));
    }

    #[test]
    fn empty_layers_merge_to_store() {
        let store = map(&[("k", json!(true))]);
        let merged = merge_layers(store.clone(), &ContextMap::new(), None);
        assert_eq!(merged, store);
    }
}
