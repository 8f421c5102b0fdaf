//! Placeholder resolution for command properties
//!
//! Every text property a command receives goes through [`resolve`] before
//! use. Resolution runs in a fixed order:
//!
//! 1. Text shorter than two characters is returned unchanged.
//! 2. Text of the form `<name>` is replaced by the value of element `name`.
//! 3. Each innermost `{...}` placeholder is replaced when it names a
//!    variable, a system variable, an indexed item (`{v[2]}`), a field
//!    (`{v.Column}`) or a JSON path (`{v => $.a.b}`). Unknown placeholders
//!    stay in the text as-is.
//! 4. If automatic calculation is enabled, the result is evaluated as
//!    arithmetic when it looks like an expression.

use crate::engine::Session;
use crate::error::{BotflowError, ErrorCode, Result};
use crate::variables::{json_to_text, Variable, VariableValue};
use serde_json::Value;

pub mod calc;
pub mod json_path;
pub mod system;

pub use calc::{auto_calculate, evaluate, CalcValue};
pub use system::{is_system_variable, system_value, SYSTEM_VARIABLES};

/// How a placeholder addresses a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access<'a> {
    Plain(&'a str),
    Indexed(&'a str, usize),
    Field(&'a str, &'a str),
}

fn classify(segment: &str) -> Access<'_> {
    if is_system_variable(segment) {
        return Access::Plain(segment);
    }
    if let Some((name, index)) = parse_indexed(segment) {
        return Access::Indexed(name, index);
    }
    let mut parts = segment.split('.');
    if let (Some(name), Some(field), None) = (parts.next(), parts.next(), parts.next()) {
        if !name.is_empty() && !field.is_empty() {
            return Access::Field(name, field);
        }
    }
    Access::Plain(segment)
}

fn parse_indexed(segment: &str) -> Option<(&str, usize)> {
    let (name, index) = segment.strip_suffix(']')?.rsplit_once('[')?;
    if name.is_empty() {
        return None;
    }
    Some((name, index.trim().parse().ok()?))
}

/// Innermost `{...}` segments of `text`, deduplicated, in order of appearance
pub fn placeholders(text: &str) -> Vec<&str> {
    let mut found: Vec<&str> = Vec::new();
    let mut start = None;
    for (i, ch) in text.char_indices() {
        match ch {
            '{' => start = Some(i),
            '}' => {
                if let Some(open) = start.take() {
                    let inner = &text[open + 1..i];
                    if !inner.is_empty() && !found.contains(&inner) {
                        found.push(inner);
                    }
                }
            }
            _ => {}
        }
    }
    found
}

/// Resolve all placeholders in `template` against the session
pub fn resolve(template: &str, session: &mut Session) -> Result<String> {
    if template.chars().count() < 2 {
        return Ok(template.to_string());
    }

    let mut text = substitute_element(template, session).unwrap_or_else(|| template.to_string());

    let segments: Vec<String> = placeholders(&text).into_iter().map(String::from).collect();
    for segment in segments {
        if let Some(value) = resolve_segment(&segment, session)? {
            text = text.replace(&format!("{{{}}}", segment), &value);
        }
    }

    if session.settings.auto_calculate_variables {
        text = auto_calculate(&text);
    }
    Ok(text)
}

fn substitute_element(text: &str, session: &Session) -> Option<String> {
    let name = text.strip_prefix('<')?.strip_suffix('>')?;
    session
        .elements
        .iter()
        .find(|element| element.name == name)
        .map(|element| element.value.clone())
}

fn resolve_segment(segment: &str, session: &mut Session) -> Result<Option<String>> {
    if segment.contains("=>") {
        if let Some(value) = resolve_json_path(segment, session)? {
            return Ok(Some(value));
        }
    }

    match classify(segment) {
        Access::Plain(name) => plain_value(name, session),
        Access::Indexed(name, index) => match session.variables.get_mut(name) {
            Some(variable) => variable
                .with_cursor(index, |v| v.display_value())
                .map(Some),
            None => Ok(None),
        },
        Access::Field(name, field) => match session.variables.get(name) {
            Some(variable) => variable.field(field).map(Some),
            None => plain_value(segment, session),
        },
    }
}

fn plain_value(name: &str, session: &Session) -> Result<Option<String>> {
    if let Some(variable) = session.variables.get(name) {
        return variable.display_value().map(Some);
    }
    Ok(system_value(name, session))
}

fn resolve_json_path(segment: &str, session: &Session) -> Result<Option<String>> {
    let mut expression = segment.to_string();
    for part in segment.split('^') {
        if part.is_empty() || part.contains("=>") {
            continue;
        }
        if let Some(value) = plain_value(part, session)? {
            expression = expression.replace(&format!("^{}^", part), &value);
        }
    }

    let Some((name, path)) = expression.split_once("=>") else {
        return Ok(None);
    };
    let (name, path) = (name.trim(), path.trim());
    if !(path.starts_with("$.") || path.starts_with("$[")) {
        return Ok(None);
    }
    let Some(source) = plain_value(name, session)? else {
        return Ok(None);
    };

    let document: Value = serde_json::from_str(&source).map_err(|e| {
        BotflowError::format_with_code(
            ErrorCode::FORMAT_INVALID_JSON,
            format!("Variable '{}' does not hold valid JSON", name),
        )
        .with_source(e)
    })?;
    let selected = json_path::select(&document, path).map_err(|e| {
        BotflowError::format_with_code(ErrorCode::FORMAT_INVALID_JSON, e.to_string())
    })?;
    Ok(selected.map(json_to_text))
}

/// The variable name inside a braced target such as `{vName}`
pub fn braced_name(target: &str) -> Option<&str> {
    let inner = target.trim().strip_prefix('{')?.strip_suffix('}')?.trim();
    if inner.is_empty() || inner.contains(['{', '}']) {
        return None;
    }
    Some(inner)
}

/// Store `value` into the variable named by a braced `target`
pub fn store(value: VariableValue, target: &str, session: &mut Session) -> Result<()> {
    let name = braced_name(target).ok_or_else(|| {
        BotflowError::format_with_code(
            ErrorCode::FORMAT_MISSING_BRACES,
            format!(
                "Variable target '{}' must be wrapped in braces, e.g. {{vName}}",
                target
            ),
        )
    })?;
    session.variables.set(name, value);
    Ok(())
}

fn strip_braces(name: &str) -> &str {
    name.trim().trim_start_matches('{').trim_end_matches('}')
}

/// Find a variable by exact name, then by name with braces removed
pub fn lookup<'a>(name: &str, session: &'a Session) -> Option<&'a Variable> {
    session
        .variables
        .get(name)
        .or_else(|| session.variables.get(strip_braces(name)))
}

/// Mutable form of [`lookup`]
pub fn lookup_mut<'a>(name: &str, session: &'a mut Session) -> Option<&'a mut Variable> {
    let key = if session.variables.get(name).is_some() {
        name
    } else {
        strip_braces(name)
    };
    session.variables.get_mut(key)
}

/// Like [`lookup`] but reports a missing variable as a lookup error
pub fn require<'a>(name: &str, session: &'a Session) -> Result<&'a Variable> {
    lookup(name, session).ok_or_else(|| {
        BotflowError::lookup_with_code(
            ErrorCode::LOOKUP_VARIABLE,
            strip_braces(name),
            "Variable not found",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::script::Element;
    use crate::variables::DataTable;
    use serde_json::json;

    fn session() -> Session {
        Session::new(EngineSettings::default())
    }

    #[test]
    fn test_placeholders_innermost() {
        assert_eq!(placeholders("a {x} b {y} {x}"), vec!["x", "y"]);
        assert_eq!(placeholders("{outer {inner}}"), vec!["inner"]);
        assert!(placeholders("no braces").is_empty());
        assert!(placeholders("{}").is_empty());
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("vName"), Access::Plain("vName"));
        assert_eq!(classify("vList[2]"), Access::Indexed("vList", 2));
        assert_eq!(classify("vRow.Name"), Access::Field("vRow", "Name"));
        assert_eq!(classify("DateTime.Now"), Access::Plain("DateTime.Now"));
        assert_eq!(classify("a.b.c"), Access::Plain("a.b.c"));
        assert_eq!(classify("vList[-1]"), Access::Plain("vList[-1]"));
    }

    #[test]
    fn test_resolve_simple_variable() {
        let mut s = session();
        s.variables.set("vName", "World".into());
        assert_eq!(resolve("Hello {vName}!", &mut s).unwrap(), "Hello World!");
    }

    #[test]
    fn test_unknown_placeholder_preserved() {
        let mut s = session();
        assert_eq!(resolve("Hi {missing}", &mut s).unwrap(), "Hi {missing}");
    }

    #[test]
    fn test_short_text_unchanged() {
        let mut s = session();
        assert_eq!(resolve("{", &mut s).unwrap(), "{");
        assert_eq!(resolve("", &mut s).unwrap(), "");
    }

    #[test]
    fn test_auto_calculation() {
        let mut s = session();
        s.variables.set("vA", "2".into());
        s.variables.set("vB", "3".into());
        assert_eq!(resolve("{vA}+{vB}", &mut s).unwrap(), "5");

        s.settings.auto_calculate_variables = false;
        assert_eq!(resolve("{vA}+{vB}", &mut s).unwrap(), "2+3");
    }

    #[test]
    fn test_indexed_access_restores_cursor() {
        let mut s = session();
        s.variables.set("vList", VariableValue::list(["a", "b", "c"]));
        s.variables.set_cursor("vList", 1).unwrap();
        assert_eq!(resolve("{vList[2]}", &mut s).unwrap(), "c");
        assert_eq!(resolve("{vList}", &mut s).unwrap(), "b");
    }

    #[test]
    fn test_indexed_access_out_of_range() {
        let mut s = session();
        s.variables.set("vList", VariableValue::list(["a"]));
        let err = resolve("{vList[5]}", &mut s).unwrap_err();
        assert_eq!(err.kind_name(), "RangeError");
    }

    #[test]
    fn test_table_field_uses_cursor_row() {
        let mut s = session();
        s.variables.set(
            "vTable",
            VariableValue::Table(DataTable {
                columns: vec!["Name".into(), "City".into()],
                rows: vec![
                    vec!["Ada".into(), "London".into()],
                    vec!["Grace".into(), "New York".into()],
                ],
            }),
        );
        assert_eq!(resolve("{vTable.Name}", &mut s).unwrap(), "Ada");
        s.variables.set_cursor("vTable", 1).unwrap();
        assert_eq!(resolve("{vTable.City}", &mut s).unwrap(), "New York");
        assert_eq!(resolve("{vTable.1}", &mut s).unwrap(), "New York");
        let err = resolve("{vTable.Email}", &mut s).unwrap_err();
        assert_eq!(err.kind_name(), "LookupError");
    }

    #[test]
    fn test_property_access() {
        let mut s = session();
        s.variables.set("vList", VariableValue::list(["a", "b", "c"]));
        assert_eq!(resolve("{vList.count}", &mut s).unwrap(), "3");
    }

    #[test]
    fn test_json_path() {
        let mut s = session();
        s.variables.set(
            "vJson",
            json!({"user": {"name": "Ada", "roles": ["admin", "dev"]}})
                .to_string()
                .into(),
        );
        s.variables.set("vKey", "name".into());
        assert_eq!(resolve("{vJson => $.user.name}", &mut s).unwrap(), "Ada");
        assert_eq!(resolve("{vJson=>$.user.roles[1]}", &mut s).unwrap(), "dev");
        assert_eq!(resolve("{vJson => $.user.^vKey^}", &mut s).unwrap(), "Ada");
        assert_eq!(
            resolve("{vJson => $.user.missing}", &mut s).unwrap(),
            "{vJson => $.user.missing}"
        );
    }

    #[test]
    fn test_json_path_invalid_document() {
        let mut s = session();
        s.variables.set("vJson", "not json".into());
        let err = resolve("{vJson => $.a}", &mut s).unwrap_err();
        assert_eq!(err.kind_name(), "FormatError");
    }

    #[test]
    fn test_system_variables() {
        let mut s = session();
        assert_eq!(resolve("a{Char.Tab}b", &mut s).unwrap(), "a\tb");
        let year = resolve("{DateTime.Now.Year}", &mut s).unwrap();
        assert_eq!(year.len(), 4);
    }

    #[test]
    fn test_element_substitution() {
        let mut s = session();
        s.elements.push(Element {
            name: "btnLogin".into(),
            element_type: "XPath".into(),
            value: "//button[@id='login']".into(),
        });
        assert_eq!(
            resolve("<btnLogin>", &mut s).unwrap(),
            "//button[@id='login']"
        );
        assert_eq!(resolve("<unknown>", &mut s).unwrap(), "<unknown>");
    }

    #[test]
    fn test_store_requires_braces() {
        let mut s = session();
        store("x".into(), "{vOut}", &mut s).unwrap();
        assert_eq!(lookup("vOut", &s).unwrap().display_value().unwrap(), "x");

        let err = store("x".into(), "vOut", &mut s).unwrap_err();
        assert_eq!(err.kind_name(), "FormatError");
    }

    #[test]
    fn test_lookup_strips_braces() {
        let mut s = session();
        s.variables.set("vName", "Ada".into());
        assert!(lookup("{vName}", &s).is_some());
        assert!(lookup("vName", &s).is_some());
        assert!(lookup("{nope}", &s).is_none());
        assert_eq!(require("{nope}", &s).unwrap_err().kind_name(), "LookupError");
    }
}
