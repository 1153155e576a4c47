//! Path expressions over JSON documents.
//!
//! A path is a dot-separated list of segments. Object members are addressed
//! by name and array elements by index. `@this` (or an empty path) is the
//! whole document, `\.` escapes a literal dot, and a final `-1` segment in a
//! set appends to an array.

use serde_json::Value as Json;

use super::error::MessageError;

const THIS: &str = "@this";
const APPEND: &str = "-1";

/// A parsed path expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    raw: String,
    segments: Vec<String>,
}

impl Path {
    /// Parse a path expression
    pub fn parse(raw: &str) -> Result<Self, MessageError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == THIS {
            return Ok(Self {
                raw: trimmed.to_string(),
                segments: Vec::new(),
            });
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = trimmed.chars();

        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) => current.push(escaped),
                    None => return Err(MessageError::InvalidPath(raw.to_string())),
                },
                '.' => {
                    if current.is_empty() {
                        return Err(MessageError::InvalidPath(raw.to_string()));
                    }
                    segments.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            }
        }

        if current.is_empty() {
            return Err(MessageError::InvalidPath(raw.to_string()));
        }
        segments.push(current);

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    /// True when the path addresses the whole document
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Resolve the path against a document
    pub fn get<'a>(&self, root: &'a Json) -> Option<&'a Json> {
        let mut current = root;
        for segment in &self.segments {
            current = match current {
                Json::Object(map) => map.get(segment)?,
                Json::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Write a value at the path, creating intermediate containers
    pub fn set(&self, root: &mut Json, value: Json) -> Result<(), MessageError> {
        set_at(root, &self.segments, value, &self.raw)
    }

    /// Remove the value at the path; a missing value is not an error
    pub fn delete(&self, root: &mut Json) -> Result<(), MessageError> {
        let Some((last, parents)) = self.segments.split_last() else {
            return Err(MessageError::InvalidPath(format!(
                "{}: the whole value cannot be deleted",
                self.raw
            )));
        };

        let mut current = root;
        for segment in parents {
            current = match current {
                Json::Object(map) => match map.get_mut(segment) {
                    Some(next) => next,
                    None => return Ok(()),
                },
                Json::Array(items) => match segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                    Some(next) => next,
                    None => return Ok(()),
                },
                _ => return Ok(()),
            };
        }

        match current {
            Json::Object(map) => {
                map.remove(last);
            }
            Json::Array(items) => {
                if let Ok(idx) = last.parse::<usize>()
                    && idx < items.len()
                {
                    items.remove(idx);
                }
            }
            _ => {}
        }

        Ok(())
    }
}

fn set_at(current: &mut Json, segments: &[String], value: Json, raw: &str) -> Result<(), MessageError> {
    let Some((segment, rest)) = segments.split_first() else {
        *current = value;
        return Ok(());
    };

    if current.is_null() {
        *current = if segment == APPEND || segment.parse::<usize>().is_ok() {
            Json::Array(Vec::new())
        } else {
            Json::Object(serde_json::Map::new())
        };
    }

    match current {
        Json::Object(map) => {
            let child = map.entry(segment.clone()).or_insert(Json::Null);
            set_at(child, rest, value, raw)
        }
        Json::Array(items) => {
            let idx = if segment == APPEND {
                items.len()
            } else {
                segment.parse::<usize>().map_err(|_| MessageError::IncompatibleValue {
                    path: raw.to_string(),
                    reason: format!("segment {segment:?} is not an array index"),
                })?
            };

            if idx > items.len() {
                return Err(MessageError::IncompatibleValue {
                    path: raw.to_string(),
                    reason: format!("index {idx} is out of range for length {}", items.len()),
                });
            }
            if idx == items.len() {
                items.push(Json::Null);
            }
            set_at(&mut items[idx], rest, value, raw)
        }
        other => Err(MessageError::IncompatibleValue {
            path: raw.to_string(),
            reason: format!("segment {segment:?} traverses a scalar ({other})"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_dotted_segments() {
        let path = Path::parse("a.b.0").unwrap();
        assert_eq!(path.segments, vec!["a", "b", "0"]);
        assert!(!path.is_root());
    }

    #[test]
    fn parses_escaped_dot() {
        let path = Path::parse(r"a\.b.c").unwrap();
        assert_eq!(path.segments, vec!["a.b", "c"]);
    }

    #[test]
    fn this_and_empty_are_root() {
        assert!(Path::parse("@this").unwrap().is_root());
        assert!(Path::parse("  ").unwrap().is_root());
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(Path::parse("a..b").is_err());
        assert!(Path::parse(".a").is_err());
        assert!(Path::parse("a.").is_err());
        assert!(Path::parse(r"a\").is_err());
    }

    #[test]
    fn gets_nested_values() {
        let doc = json!({"a": {"b": [10, 20]}});
        assert_eq!(Path::parse("a.b.1").unwrap().get(&doc), Some(&json!(20)));
        assert_eq!(Path::parse("a.c").unwrap().get(&doc), None);
        assert_eq!(Path::parse("@this").unwrap().get(&doc), Some(&doc));
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut doc = Json::Null;
        Path::parse("a.b").unwrap().set(&mut doc, json!("c")).unwrap();
        assert_eq!(doc, json!({"a": {"b": "c"}}));
    }

    #[test]
    fn set_appends_with_minus_one() {
        let mut doc = json!({"a": [1]});
        Path::parse("a.-1").unwrap().set(&mut doc, json!(2)).unwrap();
        Path::parse("a.-1").unwrap().set(&mut doc, json!(3)).unwrap();
        assert_eq!(doc, json!({"a": [1, 2, 3]}));
    }

    #[test]
    fn set_through_scalar_fails() {
        let mut doc = json!({"a": "b"});
        let err = Path::parse("a.c").unwrap().set(&mut doc, json!(1)).unwrap_err();
        assert!(matches!(err, MessageError::IncompatibleValue { .. }));
    }

    #[test]
    fn set_out_of_range_index_fails() {
        let mut doc = json!({"a": [1]});
        let err = Path::parse("a.5").unwrap().set(&mut doc, json!(2)).unwrap_err();
        assert!(matches!(err, MessageError::IncompatibleValue { .. }));
        assert!(Path::parse("a.4000000000").unwrap().set(&mut doc, json!(2)).is_err());
        assert_eq!(doc, json!({"a": [1]}));

        Path::parse("a.1").unwrap().set(&mut doc, json!(2)).unwrap();
        Path::parse("a.0").unwrap().set(&mut doc, json!(0)).unwrap();
        assert_eq!(doc, json!({"a": [0, 2]}));
    }

    #[test]
    fn set_non_index_into_array_fails() {
        let mut doc = json!({"a": [1]});
        assert!(Path::parse("a.x").unwrap().set(&mut doc, json!(1)).is_err());
    }

    #[test]
    fn delete_removes_member_and_ignores_missing() {
        let mut doc = json!({"foo": "bar", "baz": "qux"});
        Path::parse("baz").unwrap().delete(&mut doc).unwrap();
        Path::parse("missing.deep").unwrap().delete(&mut doc).unwrap();
        assert_eq!(doc, json!({"foo": "bar"}));
    }

    #[test]
    fn delete_root_fails() {
        let mut doc = json!({"a": 1});
        assert!(Path::parse("@this").unwrap().delete(&mut doc).is_err());
    }
}
