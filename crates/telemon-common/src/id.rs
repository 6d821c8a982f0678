use snowflake::SnowflakeIdBucket;
use std::sync::Mutex;

static ID_GENERATOR: Mutex<Option<SnowflakeIdBucket>> = Mutex::new(None);

/// Initialise the Snowflake generator.
///
/// `machine_id` and `node_id` must each be in `0..=31`. Calling this again
/// replaces the generator; ids handed out before stay unique only if the
/// pair changes.
pub fn init(machine_id: i32, node_id: i32) {
    let mut gen = ID_GENERATOR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *gen = Some(SnowflakeIdBucket::new(machine_id, node_id));
}

/// Next Snowflake id rendered as a decimal string.
pub fn next_id() -> String {
    let mut gen = ID_GENERATOR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let bucket = gen.get_or_insert_with(|| SnowflakeIdBucket::new(1, 1));
    bucket.get_id().to_string()
}

/// Next id with a readable prefix, e.g. `alert-7261...`.
pub fn next_prefixed(prefix: &str) -> String {
    format!("{prefix}-{}", next_id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn next_id_is_unique() {
        let mut ids = HashSet::new();
        for _ in 0..1000 {
            let id = next_id();
            assert!(!id.is_empty());
            assert!(ids.insert(id), "duplicate id generated");
        }
    }

    #[test]
    fn prefixed_ids_keep_numeric_tail() {
        let id = next_prefixed("alert");
        let tail = id.strip_prefix("alert-").expect("prefix should be present");
        assert!(tail.parse::<i64>().is_ok(), "tail should be numeric: {id}");
    }
}
