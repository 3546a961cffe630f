//! Compiler symbols: the reserved `N$` identifiers emitted into generated
//! code, and their conversion back to readable text.
//!
//! Func identifiers encode a base name and its argument labels as
//! `N$f_<base>_<label>_<label>`, escaping each `_` as `$_` and each `$` as
//! `$$`. An empty label stands for a missing one.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::error::SqueezeError;
use crate::squeezer::Squeezer;

/// Local alias of the runtime object inside the generated wrapper.
pub const ROOT_VARIABLE: &str = "N$$_";

const FUNC_PREFIX: &str = "N$f_";
const IMPORT_PREFIX: &str = "N$i_";
const DEBUG_PREFIX: &str = "N$d_";
const TYPE_PREFIX: &str = "N$t_";

/// A func name split into its base and argument labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncComponents {
    pub base: String,
    pub labels: Vec<String>,
}

impl FuncComponents {
    pub fn new(base: impl Into<String>, labels: &[&str]) -> Self {
        Self {
            base: base.into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

fn squeezed(name: String, squeezer: Option<&Squeezer>) -> Result<String, SqueezeError> {
    match squeezer {
        Some(squeezer) => squeezer.squeeze(&name),
        None => Ok(name),
    }
}

/// `TheImport` becomes `N$i_TheImport`.
pub fn import_identifier(name: &str, squeezer: Option<&Squeezer>) -> Result<String, SqueezeError> {
    squeezed(format!("{}{}", IMPORT_PREFIX, name), squeezer)
}

/// `TheImport` becomes `N$$_.$.N$i_TheImport`.
pub fn import_expression(name: &str, squeezer: Option<&Squeezer>) -> Result<String, SqueezeError> {
    let identifier = import_identifier(name, squeezer)?;
    Ok(format!("{}.$.{}", ROOT_VARIABLE, identifier))
}

/// Hides a name that would otherwise leak into a debug string.
pub fn debug_identifier(name: &str, squeezer: Option<&Squeezer>) -> Result<String, SqueezeError> {
    squeezed(format!("{}{}", DEBUG_PREFIX, name), squeezer)
}

/// Stands in for a missing type annotation in generated TypeScript.
pub fn type_placeholder(name: &str, squeezer: Option<&Squeezer>) -> Result<String, SqueezeError> {
    squeezed(format!("{}{}", TYPE_PREFIX, name), squeezer)
}

fn escape(component: &str) -> String {
    let mut result = String::with_capacity(component.len());
    for c in component.chars() {
        if c == '_' || c == '$' {
            result.push('$');
        }
        result.push(c);
    }
    result
}

/// Mangles a func name. Returns `None` when no label is named.
pub fn to_func_identifier(components: &FuncComponents) -> Option<String> {
    if components.labels.iter().all(String::is_empty) {
        return None;
    }

    let mut result = format!("{}{}", FUNC_PREFIX, escape(&components.base));
    for label in &components.labels {
        result.push('_');
        result.push_str(&escape(label));
    }
    Some(result)
}

/// Splits a mangled identifier on every `_` not preceded by `$`.
pub fn from_func_identifier(identifier: &str) -> Option<FuncComponents> {
    let rest = identifier.strip_prefix(FUNC_PREFIX)?;

    let mut parts = vec![String::new()];
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '$' => {
                if let Some(escaped) = chars.next() {
                    parts.last_mut()?.push(escaped);
                }
            }
            '_' => parts.push(String::new()),
            c => parts.last_mut()?.push(c),
        }
    }

    let mut parts = parts.into_iter();
    let base = parts.next()?;
    Some(FuncComponents {
        base,
        labels: parts.collect(),
    })
}

/// `{ base: "_foo", labels: ["", "baz"] }` becomes `_foo(_:baz:)`.
pub fn to_func_string(components: &FuncComponents) -> String {
    let args: String = components
        .labels
        .iter()
        .map(|label| if label.is_empty() { "_:".to_string() } else { format!("{}:", label) })
        .collect();
    format!("{}({})", components.base, args)
}

/// Parses `base(label:label:)`. Text after the closing parenthesis is
/// ignored.
pub fn from_func_string(string: &str) -> Option<FuncComponents> {
    let open = string.find('(')?;
    let close = open + string[open..].find(')')?;

    let base = string[..open].trim().to_string();
    let mut labels: Vec<String> = string[open + 1..close]
        .split(':')
        .map(|label| match label.trim() {
            "_" => String::new(),
            other => other.to_string(),
        })
        .collect();
    labels.pop();

    Some(FuncComponents { base, labels })
}

/// Source of token to name mappings for [`symbolicate`].
#[derive(Debug, Clone, Copy)]
pub enum Unsqueeze<'a> {
    None,
    Squeezer(&'a Squeezer),
    /// A table as returned by `Squeezer::squeeze_map`
    Map(&'a BTreeMap<String, String>),
}

impl Unsqueeze<'_> {
    fn resolve(&self, token: &str) -> String {
        match self {
            Unsqueeze::None => token.to_string(),
            Unsqueeze::Squeezer(squeezer) => squeezer.unsqueeze(token),
            Unsqueeze::Map(map) => map.get(token).cloned().unwrap_or_else(|| token.to_string()),
        }
    }
}

/// Replaces every compiler symbol in `text` with its readable form.
pub fn symbolicate(text: &str, lookup: Unsqueeze<'_>) -> String {
    static SYMBOL: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = SYMBOL.get_or_init(|| Regex::new(r"N\$[A-Za-z0-9$_]+").ok()) else {
        return text.to_string();
    };

    re.replace_all(text, |captures: &Captures<'_>| {
        let symbol = lookup.resolve(&captures[0]);

        if symbol.starts_with(FUNC_PREFIX) {
            if let Some(components) = from_func_identifier(&symbol) {
                return to_func_string(&components);
            }
            return symbol;
        }

        if has_internal_prefix(&symbol) {
            return symbol[4..].to_string();
        }

        symbol
    })
    .into_owned()
}

/// `N$` followed by one letter and `_`.
fn has_internal_prefix(symbol: &str) -> bool {
    let bytes = symbol.as_bytes();
    bytes.len() >= 4 && symbol.starts_with("N$") && bytes[2].is_ascii_alphabetic() && bytes[3] == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_func_identifier() {
        let components = FuncComponents::new("foo", &["bar", "baz"]);
        assert_eq!(to_func_identifier(&components).as_deref(), Some("N$f_foo_bar_baz"));

        let components = FuncComponents::new("_foo", &["", "baz"]);
        let identifier = to_func_identifier(&components).unwrap();
        assert_eq!(identifier, "N$f_$_foo__baz");
        assert_eq!(from_func_identifier(&identifier), Some(components));

        assert_eq!(to_func_identifier(&FuncComponents::new("foo", &["", ""])), None);
        assert_eq!(to_func_identifier(&FuncComponents::new("foo", &[])), None);
        assert_eq!(from_func_identifier("N$i_foo"), None);
    }

    #[test]
    fn test_dollar_escaping() {
        let components = FuncComponents::new("$get", &["a_b", "c$"]);
        let identifier = to_func_identifier(&components).unwrap();
        assert_eq!(identifier, "N$f_$$get_a$_b_c$$");
        assert_eq!(from_func_identifier(&identifier), Some(components));
    }

    #[test]
    fn test_func_string() {
        let components = FuncComponents::new("_foo", &["", "baz"]);
        assert_eq!(to_func_string(&components), "_foo(_:baz:)");
        assert_eq!(from_func_string("_foo(_:baz:)"), Some(components));
        assert_eq!(from_func_string(" foo ( bar: ) "), Some(FuncComponents::new("foo", &["bar"])));
        assert_eq!(from_func_string("foo"), None);
    }

    #[test]
    fn test_import_symbols() {
        assert_eq!(import_identifier("TheImport", None).unwrap(), "N$i_TheImport");
        assert_eq!(import_expression("TheImport", None).unwrap(), "N$$_.$.N$i_TheImport");
        assert_eq!(debug_identifier("x", None).unwrap(), "N$d_x");
        assert_eq!(type_placeholder("x", None).unwrap(), "N$t_x");

        let squeezer = Squeezer::new(&[], 0, 0, &BTreeSet::new()).unwrap();
        assert_eq!(import_expression("TheImport", Some(&squeezer)).unwrap(), "N$$_.$.N$e");
    }

    #[test]
    fn test_symbolicate() {
        assert_eq!(symbolicate("N$f_$_foo_bar", Unsqueeze::None), "_foo(bar:)");
        assert_eq!(symbolicate("N$f_$_foo__bar", Unsqueeze::None), "_foo(_:bar:)");
        assert_eq!(symbolicate("N$i_TheImport", Unsqueeze::None), "TheImport");
        assert_eq!(
            symbolicate("Property 'N$i_A' is missing on N$$_", Unsqueeze::None),
            "Property 'A' is missing on N$$_"
        );
    }

    #[test]
    fn test_symbolicate_squeezed() {
        let squeezer = Squeezer::new(&[], 0, 0, &BTreeSet::new()).unwrap();
        let token = squeezer.squeeze("N$f_foo_bar").unwrap();
        let other = squeezer.squeeze("counter").unwrap();
        let text = format!("{}.{} is not a function", other, token);

        assert_eq!(
            symbolicate(&text, Unsqueeze::Squeezer(&squeezer)),
            "counter.foo(bar:) is not a function"
        );

        let map = squeezer.squeeze_map();
        assert_eq!(
            symbolicate(&text, Unsqueeze::Map(&map)),
            "counter.foo(bar:) is not a function"
        );
    }
}
