//! Indentation-based configuration parser.
//!
//! Supports the small YAML-like subset used by run configuration files:
//! nested maps, lists of scalars, `#` comment lines and typed scalars.
//! Nesting is derived purely from the count of leading spaces.

use std::collections::BTreeMap;
use std::fmt;

use super::errors::{ConfigError, ConfigResult};

/// A parsed configuration value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Bool(bool),
    Integer(i64),
    Float(f64),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Borrow the inner map, if this value is one.
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow the inner list, if this value is one.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this value is a scalar (not a list or map).
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::List(_) | Value::Map(_))
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Map(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{}: {}", k, v)).collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
        }
    }
}

/// Parse a scalar token.
///
/// Typing order: double-quoted literal, boolean, all-digit integer,
/// float, raw string.
pub fn parse_scalar(raw: &str) -> Value {
    let value = raw.trim();
    if value.is_empty() {
        return Value::String(String::new());
    }
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        return Value::String(value[1..value.len() - 1].to_string());
    }
    if value.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if value.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(i) = value.parse::<i64>() {
            return Value::Integer(i);
        }
    }
    match value.parse::<f64>() {
        Ok(x) => Value::Float(x),
        Err(_) => Value::String(value.to_string()),
    }
}

/// Parse a whole document into a root map.
pub fn parse_document(text: &str) -> ConfigResult<Value> {
    let lines: Vec<&str> = text.lines().collect();
    let mut root = Value::Map(BTreeMap::new());
    // Each open container is addressed by its key path from the root.
    let mut stack: Vec<(isize, Vec<String>)> = vec![(-1, Vec::new())];

    for (index, raw_line) in lines.iter().enumerate() {
        let line_no = index + 1;
        let stripped = raw_line.trim();
        if is_skippable(stripped) {
            continue;
        }
        let indent = leading_spaces(raw_line) as isize;
        while stack.len() > 1 && indent <= stack[stack.len() - 1].0 {
            stack.pop();
        }
        let path = stack[stack.len() - 1].1.clone();
        let container = container_at(&mut root, &path).ok_or_else(|| {
            ConfigError::parse(line_no, format!("lost track of enclosing block: {:?}", raw_line))
        })?;

        if let Some(item) = stripped.strip_prefix("- ") {
            match container {
                Value::List(items) => items.push(parse_scalar(item)),
                _ => {
                    return Err(ConfigError::parse(
                        line_no,
                        format!("list item outside of a list: {:?}", raw_line),
                    ))
                }
            }
            continue;
        }

        let Some((key, value_part)) = stripped.split_once(':') else {
            return Err(ConfigError::parse(
                line_no,
                format!("expected `key: value`: {:?}", raw_line),
            ));
        };
        let key = key.trim().to_string();
        let value_part = value_part.trim();

        let Value::Map(map) = container else {
            return Err(ConfigError::parse(
                line_no,
                format!("key/value entry inside a list: {:?}", raw_line),
            ));
        };

        if !value_part.is_empty() {
            map.insert(key, parse_scalar(value_part));
            continue;
        }

        let nested = if next_block_is_list(&lines, index + 1, indent) {
            Value::List(Vec::new())
        } else {
            Value::Map(BTreeMap::new())
        };
        map.insert(key.clone(), nested);

        let mut nested_path = path;
        nested_path.push(key);
        stack.push((indent, nested_path));
    }

    Ok(root)
}

fn is_skippable(stripped: &str) -> bool {
    stripped.is_empty() || stripped.starts_with('#')
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Peek past blank and comment lines to decide what kind of block follows.
fn next_block_is_list(lines: &[&str], start: usize, indent: isize) -> bool {
    for line in &lines[start.min(lines.len())..] {
        let stripped = line.trim();
        if is_skippable(stripped) {
            continue;
        }
        if (leading_spaces(line) as isize) <= indent {
            return false;
        }
        return stripped.starts_with("- ");
    }
    false
}

fn container_at<'a>(root: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    let mut current = root;
    for key in path {
        current = match current {
            Value::Map(map) => map.get_mut(key)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    /// Serialize a value tree back into the indentation format.
    fn render(value: &Value, indent: usize, out: &mut String) {
        let pad = " ".repeat(indent);
        match value {
            Value::Map(entries) => {
                for (key, v) in entries {
                    if v.is_scalar() {
                        out.push_str(&format!("{}{}: {}\n", pad, key, render_scalar(v)));
                    } else {
                        out.push_str(&format!("{}{}:\n", pad, key));
                        render(v, indent + 2, out);
                    }
                }
            }
            Value::List(items) => {
                for item in items {
                    out.push_str(&format!("{}- {}\n", pad, render_scalar(item)));
                }
            }
            _ => unreachable!(),
        }
    }

    fn render_scalar(v: &Value) -> String {
        match v {
            Value::String(s) => format!("\"{}\"", s),
            Value::Float(x) => format!("{:?}", x),
            other => other.to_string(),
        }
    }

    #[test]
    fn scalar_typing_table() {
        assert_eq!(parse_scalar("true"), Value::Bool(true));
        assert_eq!(parse_scalar("FALSE"), Value::Bool(false));
        assert_eq!(parse_scalar("42"), Value::Integer(42));
        assert_eq!(parse_scalar("3.5"), Value::Float(3.5));
        assert_eq!(parse_scalar("\"42\""), s("42"));
        assert_eq!(parse_scalar("foo"), s("foo"));
        assert_eq!(parse_scalar("-7"), Value::Float(-7.0));
        assert_eq!(parse_scalar(""), s(""));
    }

    #[test]
    fn parses_nested_document() {
        let text = "\
# run configuration
connection:
  host: localhost
  port: 50051

test:
  modelName: \"IconDetection\"
  logSignals:
    # detection outputs
    - AICORE.IconDetection.Result
    - AICORE.IconDetection.Score
logging:
  level: DEBUG
";
        let doc = parse_document(text).unwrap();
        let expected = map(vec![
            (
                "connection",
                map(vec![("host", s("localhost")), ("port", Value::Integer(50051))]),
            ),
            (
                "test",
                map(vec![
                    ("modelName", s("IconDetection")),
                    (
                        "logSignals",
                        Value::List(vec![
                            s("AICORE.IconDetection.Result"),
                            s("AICORE.IconDetection.Score"),
                        ]),
                    ),
                ]),
            ),
            ("logging", map(vec![("level", s("DEBUG"))])),
        ]);
        assert_eq!(doc, expected);
    }

    #[test]
    fn rendered_fixture_parses_back_to_same_tree() {
        let fixture = map(vec![
            (
                "outer",
                map(vec![
                    (
                        "inner",
                        map(vec![
                            ("flag", Value::Bool(false)),
                            ("ratio", Value::Float(0.25)),
                        ]),
                    ),
                    ("count", Value::Integer(3)),
                    ("names", Value::List(vec![s("a b"), s("7"), Value::Integer(8)])),
                ]),
            ),
            ("title", s("plain")),
            ("empty", map(vec![])),
        ]);

        let mut text = String::new();
        render(&fixture, 0, &mut text);
        assert_eq!(parse_document(&text).unwrap(), fixture);
    }

    #[test]
    fn dedent_returns_to_parent_map() {
        let text = "a:\n  b:\n    c: 1\n  d: 2\ne: 3\n";
        let doc = parse_document(text).unwrap();
        let expected = map(vec![
            (
                "a",
                map(vec![("b", map(vec![("c", Value::Integer(1))])), ("d", Value::Integer(2))]),
            ),
            ("e", Value::Integer(3)),
        ]);
        assert_eq!(doc, expected);
    }

    #[test]
    fn value_may_contain_colons() {
        let doc = parse_document("paths:\n  exe: C:/tools/ta.exe\n").unwrap();
        let paths = doc.as_map().unwrap()["paths"].as_map().unwrap();
        assert_eq!(paths["exe"], s("C:/tools/ta.exe"));
    }

    #[test]
    fn line_without_colon_is_rejected() {
        let err = parse_document("connection:\n  just words\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 2, .. }));
    }

    #[test]
    fn list_item_under_map_is_rejected() {
        let err = parse_document("connection:\n  host: x\n  - y\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 3, .. }));
    }

    #[test]
    fn key_inside_list_is_rejected() {
        let err = parse_document("signals:\n  - a\n  b: 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 3, .. }));
    }
}
