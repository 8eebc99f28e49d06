//! Ordering objects by a named serialized field.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// Sort `items` by `field` as it appears in their JSON form.
///
/// `field` may be a dotted path such as `memory.size`. Numbers compare
/// numerically and strings lexicographically; items lacking the field go
/// last in either direction. If no item carries the field, `items` is
/// returned in its original order.
#[must_use]
pub fn sort_by_field<T: Serialize>(items: Vec<T>, field: &str, order: SortOrder) -> Vec<T> {
    let pointer = format!("/{}", field.replace('.', "/"));
    let keys: Vec<Option<Value>> = items
        .iter()
        .map(|item| {
            serde_json::to_value(item)
                .ok()
                .and_then(|v| v.pointer(&pointer).cloned())
        })
        .collect();

    if keys.iter().all(Option::is_none) {
        return items;
    }

    let mut keyed: Vec<(Option<Value>, T)> = keys.into_iter().zip(items).collect();
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => {
            let ord = compare(a, b);
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    keyed.into_iter().map(|(_, item)| item).collect()
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => match (a.as_u64(), b.as_u64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => a
                .as_f64()
                .partial_cmp(&b.as_f64())
                .unwrap_or(Ordering::Equal),
        },
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => rank(a).cmp(&rank(b)),
    }
}

const fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xo_proto::{Host, HostMemory};

    fn host(id: &str, name: &str, memory: u64) -> Host {
        Host {
            id: id.to_string(),
            name_label: name.to_string(),
            memory: HostMemory {
                usage: 0,
                size: memory,
            },
            ..Host::default()
        }
    }

    fn ids(hosts: &[Host]) -> Vec<&str> {
        hosts.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn test_sort_by_string_field() {
        let hosts = vec![host("h1", "charlie", 1), host("h2", "alpha", 2), host("h3", "bravo", 3)];
        let sorted = sort_by_field(hosts, "name_label", SortOrder::Asc);
        assert_eq!(ids(&sorted), vec!["h2", "h3", "h1"]);
    }

    #[test]
    fn test_sort_by_nested_number_desc() {
        let hosts = vec![host("h1", "a", 8), host("h2", "b", 64), host("h3", "c", 16)];
        let sorted = sort_by_field(hosts, "memory.size", SortOrder::Desc);
        assert_eq!(ids(&sorted), vec!["h2", "h3", "h1"]);
    }

    #[test]
    fn test_unknown_field_leaves_order_unchanged() {
        let hosts = vec![host("h3", "c", 1), host("h1", "a", 2), host("h2", "b", 3)];
        let sorted = sort_by_field(hosts, "no_such_field", SortOrder::Asc);
        assert_eq!(ids(&sorted), vec!["h3", "h1", "h2"]);
    }

    #[test]
    fn test_numbers_compare_numerically() {
        assert_eq!(
            compare(&serde_json::json!(9), &serde_json::json!(10)),
            Ordering::Less
        );
        assert_eq!(
            compare(&serde_json::json!(-1.5), &serde_json::json!(2)),
            Ordering::Less
        );
    }
}
