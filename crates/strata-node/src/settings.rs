//! Command invocations and their nested option maps.

use serde_json::{Map, Value};

/// A command sent to the node: full name, an options document, and
/// positional arguments.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub full_name: String,
    pub options: Value,
    pub arguments: Vec<String>,
}

impl Invocation {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            options: Value::Object(Map::new()),
            arguments: Vec::new(),
        }
    }

    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }
}

/// Navigates a dotted path through nested option objects.
pub fn get<'a>(options: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = options;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

/// Dotted-path string lookup.
pub fn get_str<'a>(options: &'a Value, path: &str) -> Option<&'a str> {
    get(options, path).and_then(Value::as_str)
}

/// Deep-merges `from` into `into`. Objects merge recursively; any other
/// value in `from` overwrites the destination.
pub fn merge(from: &Value, into: &mut Value) {
    match (from, into) {
        (Value::Object(from), Value::Object(into)) => {
            for (key, value) in from {
                match into.get_mut(key) {
                    Some(existing) => merge(value, existing),
                    None => {
                        into.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (from, into) => *into = from.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_lookup() {
        let options = json!({"spawn": {"label": "zeek-reader", "source": {"read": "conn.log"}}});
        assert_eq!(get_str(&options, "spawn.label"), Some("zeek-reader"));
        assert_eq!(get_str(&options, "spawn.source.read"), Some("conn.log"));
        assert_eq!(get_str(&options, "spawn.missing"), None);
    }

    #[test]
    fn merge_overwrites_and_recurses() {
        let mut into = json!({"import": {"batch_rows": 10, "read": "old.log"}});
        let from = json!({"import": {"read": "new.log", "schema": "record{a: int}"}});
        merge(&from, &mut into);
        assert_eq!(get_str(&into, "import.read"), Some("new.log"));
        assert_eq!(get_str(&into, "import.schema"), Some("record{a: int}"));
        assert_eq!(get(&into, "import.batch_rows"), Some(&json!(10)));
    }
}
