//! Minimal JSON path selection for `{vJson => $.path}` placeholders
//!
//! Supports the root `$`, dotted keys, bracketed keys (`['a b']`) and array
//! indices (`[2]`). A path that selects nothing yields `None`.

use anyhow::{anyhow, Result};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Split a path such as `$.items[0]['display name']` into segments
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>> {
    let path = path.trim();
    let rest = path
        .strip_prefix('$')
        .ok_or_else(|| anyhow!("JSON path must start with '$': {}", path))?;

    let mut segments = Vec::new();
    let mut chars = rest.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                let mut key = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '.' || next == '[' {
                        break;
                    }
                    key.push(next);
                    chars.next();
                }
                if key.is_empty() {
                    return Err(anyhow!("Empty key in JSON path: {}", path));
                }
                segments.push(PathSegment::Key(key));
            }
            '[' => {
                let mut inner = String::new();
                let mut closed = false;
                let mut quote: Option<char> = None;
                for next in chars.by_ref() {
                    match (next, quote) {
                        ('\'' | '"', None) => quote = Some(next),
                        (c, Some(q)) if c == q => quote = None,
                        (']', None) => {
                            closed = true;
                            break;
                        }
                        (c, _) => inner.push(c),
                    }
                }
                if !closed {
                    return Err(anyhow!("Unclosed bracket in JSON path: {}", path));
                }
                let segment = match inner.trim().parse::<usize>() {
                    Ok(index) if !inner.is_empty() => PathSegment::Index(index),
                    _ => PathSegment::Key(inner),
                };
                segments.push(segment);
            }
            other => {
                return Err(anyhow!(
                    "Unexpected '{}' in JSON path: {}",
                    other,
                    path
                ))
            }
        }
    }

    Ok(segments)
}

/// Select the node addressed by `path`
pub fn select<'a>(root: &'a Value, path: &str) -> Result<Option<&'a Value>> {
    let segments = parse_path(path)?;
    let mut current = root;
    for segment in &segments {
        let next = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key),
            (PathSegment::Index(index), Value::Array(items)) => items.get(*index),
            (PathSegment::Index(index), Value::Object(map)) => map.get(&index.to_string()),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}
