//! Compiler options
//!
//! Options arrive as a loose [`RawOptions`] bag (built in code or loaded
//! from JSON) and are validated once, against a fixed schema table, into an
//! immutable [`CompilerOptions`]. Every schema row carries [`OptionFlags`]
//! that decide whether a change between calls forces a full rebuild and
//! whether a parent compiler must agree on the value.

use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;
use crate::hooks::{Hook, Interceptor};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OptionFlags: u8 {
        /// May change between calls without invalidating previous work
        const INCREMENTAL = 1 << 0;
        /// Must equal the value used by every parent compiler
        const PARENT_MUST_MATCH = 1 << 1;
        /// Rejected unless `allow-private-options` is set
        const PRIVATE = 1 << 2;
    }
}

/// One input file. Omitted contents are read from `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: Some(contents.into()),
            time: None,
        }
    }

    pub fn on_disk(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            contents: None,
            time: None,
        }
    }
}

/// What the generator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLanguage {
    /// Run the pipeline for diagnostics only
    None,
    JavaScript,
    /// Annotated TypeScript with real `import` statements
    TypeScript,
}

// =============================================================================
// Raw options
// =============================================================================

#[derive(Debug, Clone)]
pub enum OptionValue {
    Json(Value),
    Files(Vec<SourceFile>),
    Hook(Hook),
    Interceptors(BTreeMap<String, Interceptor>),
}

impl From<Value> for OptionValue {
    fn from(value: Value) -> Self {
        OptionValue::Json(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Json(Value::Bool(value))
    }
}

impl From<u64> for OptionValue {
    fn from(value: u64) -> Self {
        OptionValue::Json(Value::from(value))
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Json(Value::from(value))
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Json(Value::from(value))
    }
}

impl From<Vec<&str>> for OptionValue {
    fn from(value: Vec<&str>) -> Self {
        OptionValue::Json(Value::from(value))
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        OptionValue::Json(Value::from(value))
    }
}

impl From<Vec<SourceFile>> for OptionValue {
    fn from(value: Vec<SourceFile>) -> Self {
        OptionValue::Files(value)
    }
}

impl From<Hook> for OptionValue {
    fn from(value: Hook) -> Self {
        OptionValue::Hook(value)
    }
}

impl From<BTreeMap<String, Interceptor>> for OptionValue {
    fn from(value: BTreeMap<String, Interceptor>) -> Self {
        OptionValue::Interceptors(value)
    }
}

/// Unvalidated options, keyed by option name.
#[derive(Debug, Clone, Default)]
pub struct RawOptions {
    values: BTreeMap<String, OptionValue>,
}

impl RawOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`RawOptions::insert`].
    pub fn set(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Overlays `other` on top of these options.
    pub fn merge(&mut self, other: RawOptions) {
        self.values.extend(other.values);
    }

    pub fn from_json(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(map) => Ok(Self {
                values: map
                    .into_iter()
                    .map(|(name, value)| (name, OptionValue::Json(value)))
                    .collect(),
            }),
            _ => Err(ConfigError::Invalid(
                "Compiler options must be a JSON object.".to_string(),
            )),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ConfigError::Invalid(format!("Invalid JSON options: {}", e)))?;
        Self::from_json(value)
    }
}

// =============================================================================
// Schema
// =============================================================================

/// A value that passed its option's validator.
#[derive(Debug, Clone, PartialEq)]
pub enum Validated {
    Bool(bool),
    Int(u64),
    Str(Option<String>),
    Lines(Vec<String>),
    Files(Vec<SourceFile>),
    Set(BTreeSet<String>),
    Map(BTreeMap<String, Value>),
    Json(Option<Value>),
    Hook(Option<Hook>),
    Interceptors(BTreeMap<String, Interceptor>),
    Language(OutputLanguage),
}

type Validator = fn(&str, Option<&OptionValue>) -> Result<Validated, ConfigError>;

struct OptionSpec {
    name: &'static str,
    flags: OptionFlags,
    validate: Validator,
}

const fn row(name: &'static str, flags: OptionFlags, validate: Validator) -> OptionSpec {
    OptionSpec {
        name,
        flags,
        validate,
    }
}

const NONE: OptionFlags = OptionFlags::empty();
const INCREMENTAL: OptionFlags = OptionFlags::INCREMENTAL;
const PARENT_MUST_MATCH: OptionFlags = OptionFlags::PARENT_MUST_MATCH;
const PRIVATE: OptionFlags = OptionFlags::PRIVATE;

const SCHEMA: &[OptionSpec] = &[
    row("allow-private-options", NONE, validate_bool),
    row("files", INCREMENTAL, validate_files),
    row("prepend", INCREMENTAL, validate_lines),
    row("append", INCREMENTAL, validate_lines),
    row("output-language", NONE, validate_output_language),
    row("include-map", NONE, validate_bool),
    row("source-map-file", NONE, validate_string),
    row("source-map-root", NONE, validate_string),
    row("before-compile", INCREMENTAL, validate_hook),
    row("after-compile", INCREMENTAL, validate_hook),
    row("interceptors", NONE, validate_interceptors),
    row("additional-globals", NONE, validate_additional_globals),
    row("observers", NONE, validate_observers),
    row("target-tags", NONE, validate_target_tags),
    row("undefined-guards", NONE, validate_undefined_guards),
    row("squeeze", PARENT_MUST_MATCH, validate_bool),
    row("squeeze-start-index", NONE, validate_integer),
    // Exclusive: tokens use indices start..end; 0 leaves the range unbounded
    row("squeeze-end-index", NONE, validate_integer),
    row("squeeze-builtins", NONE, validate_string_set),
    row("check-types", NONE, validate_bool),
    row("defs", INCREMENTAL, validate_files),
    row("typescript-target", NONE, validate_string),
    row("typescript-lib", NONE, validate_typescript_lib),
    row("typescript-options", NONE, validate_json),
    row("dev-dump-tmp", NONE, validate_bool),
    row("dev-print-log", NONE, validate_bool),
    row("dev-omit-runtime", NONE, validate_bool),
    row("dev-output-typescript", NONE, validate_bool),
    row("dev-fast-test", NONE, validate_bool),
    row("include-bridged", PRIVATE, validate_bool),
    row("include-function-map", PRIVATE, validate_bool),
];

fn find_spec(name: &str) -> Option<&'static OptionSpec> {
    SCHEMA.iter().find(|spec| spec.name == name)
}

fn is_empty(value: Option<&OptionValue>) -> bool {
    matches!(value, None | Some(OptionValue::Json(Value::Null)))
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}

fn validate_bool(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    match value {
        _ if is_empty(value) => Ok(Validated::Bool(false)),
        Some(OptionValue::Json(Value::Bool(b))) => Ok(Validated::Bool(*b)),
        _ => Err(invalid(format!("Compiler option '{}' must be a boolean.", name))),
    }
}

fn validate_integer(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    match value {
        _ if is_empty(value) => Ok(Validated::Int(0)),
        Some(OptionValue::Json(Value::Number(n))) if n.is_u64() => {
            Ok(Validated::Int(n.as_u64().unwrap_or_default()))
        }
        _ => Err(invalid(format!("Compiler option '{}' must be an integer.", name))),
    }
}

fn validate_string(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    match value {
        _ if is_empty(value) => Ok(Validated::Str(None)),
        Some(OptionValue::Json(Value::String(s))) => Ok(Validated::Str(Some(s.clone()))),
        _ => Err(invalid(format!("Compiler option '{}' must be a string.", name))),
    }
}

fn validate_hook(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    match value {
        _ if is_empty(value) => Ok(Validated::Hook(None)),
        Some(OptionValue::Hook(hook)) => Ok(Validated::Hook(Some(hook.clone()))),
        _ => Err(invalid(format!("Compiler option '{}' must be a function.", name))),
    }
}

fn validate_json(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    match value {
        _ if is_empty(value) => Ok(Validated::Json(None)),
        Some(OptionValue::Json(v @ Value::Object(_))) => Ok(Validated::Json(Some(v.clone()))),
        _ => Err(invalid(format!("Compiler option '{}' must be an object.", name))),
    }
}

fn validate_lines(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    let message = || invalid(format!("Compiler option '{}' must be a string or an array of strings.", name));

    match value {
        _ if is_empty(value) => Ok(Validated::Lines(Vec::new())),
        Some(OptionValue::Json(Value::String(s))) => {
            Ok(Validated::Lines(s.split('\n').map(str::to_string).collect()))
        }
        Some(OptionValue::Json(Value::Array(items))) => {
            let mut lines = Vec::new();
            for item in items {
                let s = item.as_str().ok_or_else(message)?;
                lines.extend(s.split('\n').map(str::to_string));
            }
            Ok(Validated::Lines(lines))
        }
        _ => Err(message()),
    }
}

fn validate_typescript_lib(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    let message = || invalid(format!("Compiler option '{}' must be a string or an array of strings.", name));

    match value {
        _ if is_empty(value) => Ok(Validated::Lines(Vec::new())),
        Some(OptionValue::Json(Value::String(s))) => Ok(Validated::Lines(
            s.split(',').map(|lib| lib.trim().to_string()).collect(),
        )),
        Some(OptionValue::Json(Value::Array(items))) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(message))
            .collect::<Result<Vec<_>, _>>()
            .map(Validated::Lines),
        _ => Err(message()),
    }
}

fn validate_string_set(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    let message = || invalid(format!("Compiler option '{}' must be an array or Set of strings.", name));

    match value {
        _ if is_empty(value) => Ok(Validated::Set(BTreeSet::new())),
        Some(OptionValue::Json(Value::Array(items))) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(message))
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Validated::Set),
        _ => Err(message()),
    }
}

fn validate_undefined_guards(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    const MEMBERS: &[&str] = &["init", "get", "set"];

    let items = match value {
        _ if is_empty(value) => return Ok(Validated::Set(BTreeSet::new())),
        Some(OptionValue::Json(Value::Array(items))) => items,
        _ => {
            return Err(invalid(format!(
                "Compiler option '{}' must be an array or Set.",
                name
            )))
        }
    };

    let mut guards = BTreeSet::new();
    for item in items {
        match item.as_str() {
            Some(member) if MEMBERS.contains(&member) => {
                guards.insert(member.to_string());
            }
            Some(member) => {
                return Err(invalid(format!("Invalid member value for '{}': '{}'", name, member)))
            }
            None => return Err(invalid(format!("Invalid member value for '{}': '{}'", name, item))),
        }
    }
    Ok(Validated::Set(guards))
}

fn validate_output_language(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    let language = match value {
        _ if is_empty(value) => OutputLanguage::JavaScript,
        Some(OptionValue::Json(Value::String(s))) => match s.as_str() {
            "none" => OutputLanguage::None,
            "es5" | "javascript" => OutputLanguage::JavaScript,
            "typescript" | "typechecker" => OutputLanguage::TypeScript,
            other => {
                return Err(invalid(format!(
                    "Compiler option '{}' has unknown language '{}'.",
                    name, other
                )))
            }
        },
        _ => return Err(invalid(format!("Compiler option '{}' must be a string.", name))),
    };
    Ok(Validated::Language(language))
}

/// Accepts a list whose members are `{ path, contents?, time? }` objects or
/// bare path strings.
fn validate_files(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    let files = match value {
        _ if is_empty(value) => Vec::new(),
        Some(OptionValue::Files(files)) => files.clone(),
        Some(OptionValue::Json(Value::Array(items))) => items
            .iter()
            .map(|item| file_from_json(name, item))
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(invalid(format!("Compiler option '{}' must be an array.", name))),
    };

    let mut seen = BTreeSet::new();
    for file in &files {
        if file.path.is_empty() {
            return Err(invalid(format!(
                "Each member of compiler option '{}' must specify a 'path'.",
                name
            )));
        }
        if !seen.insert(file.path.as_str()) {
            return Err(ConfigError::DuplicateFile {
                option: name.to_string(),
                path: file.path.clone(),
            });
        }
    }

    Ok(Validated::Files(files))
}

fn file_from_json(name: &str, item: &Value) -> Result<SourceFile, ConfigError> {
    let member_error = || invalid(format!("Invalid value for member of compiler option '{}'.", name));

    match item {
        Value::String(path) => Ok(SourceFile::on_disk(path.clone())),
        Value::Object(_) => {
            let file: SourceFile = serde_json::from_value(item.clone()).map_err(|_| {
                match item.get("path") {
                    Some(Value::String(_)) => member_error(),
                    _ => invalid(format!(
                        "Each member of compiler option '{}' must specify a 'path'.",
                        name
                    )),
                }
            })?;
            Ok(file)
        }
        _ => Err(member_error()),
    }
}

fn json_object<'a>(name: &str, value: Option<&'a OptionValue>) -> Result<Option<&'a Map<String, Value>>, ConfigError> {
    match value {
        _ if is_empty(value) => Ok(None),
        Some(OptionValue::Json(Value::Object(map))) => Ok(Some(map)),
        _ => Err(invalid(format!("Compiler option '{}' must be a Map or object.", name))),
    }
}

/// Validates every entry of an object-valued option with `accepts`.
fn validate_table(
    name: &str,
    value: Option<&OptionValue>,
    accepts: fn(&Value) -> bool,
    describe: fn(&str) -> String,
) -> Result<Validated, ConfigError> {
    let mut table = BTreeMap::new();
    if let Some(map) = json_object(name, value)? {
        for (key, entry) in map {
            if !accepts(entry) {
                return Err(invalid(describe(key)));
            }
            table.insert(key.clone(), entry.clone());
        }
    }
    Ok(Validated::Map(table))
}

fn validate_additional_globals(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    validate_table(
        name,
        value,
        |v| matches!(v, Value::Bool(_) | Value::Null | Value::Number(_) | Value::String(_)),
        |key| format!("Additional Global '{}' must be a boolean, null, number, or string.", key),
    )
}

fn validate_observers(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    validate_table(
        name,
        value,
        |v| matches!(v, Value::Number(_) | Value::String(_)),
        |key| format!("Observer '{}' must be a number or string.", key),
    )
}

fn validate_target_tags(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    validate_table(
        name,
        value,
        |v| v.is_boolean(),
        |key| format!("Target Tag '{}' must be a boolean.", key),
    )
}

fn validate_interceptors(name: &str, value: Option<&OptionValue>) -> Result<Validated, ConfigError> {
    match value {
        Some(OptionValue::Interceptors(map)) => Ok(Validated::Interceptors(map.clone())),
        _ => match json_object(name, value)? {
            None => Ok(Validated::Interceptors(BTreeMap::new())),
            Some(map) => match map.keys().next() {
                Some(key) => Err(invalid(format!("Interceptor '{}' must be a function.", key))),
                None => Ok(Validated::Interceptors(BTreeMap::new())),
            },
        },
    }
}

// =============================================================================
// Validated options
// =============================================================================

static NO_STRINGS: BTreeSet<String> = BTreeSet::new();
static NO_VALUES: BTreeMap<String, Value> = BTreeMap::new();
static NO_INTERCEPTORS: BTreeMap<String, Interceptor> = BTreeMap::new();

/// A validated, immutable options snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CompilerOptions {
    values: BTreeMap<&'static str, Validated>,
}

impl CompilerOptions {
    pub fn new(raw: &RawOptions) -> Result<Self, ConfigError> {
        let allow_private = matches!(
            raw.get("allow-private-options"),
            Some(OptionValue::Json(Value::Bool(true)))
        );

        for name in raw.names() {
            let spec = find_spec(name).ok_or_else(|| ConfigError::UnknownOption(name.to_string()))?;
            if spec.flags.contains(OptionFlags::PRIVATE) && !allow_private {
                return Err(ConfigError::PrivateOption(name.to_string()));
            }
        }

        let mut values = BTreeMap::new();
        for spec in SCHEMA {
            values.insert(spec.name, (spec.validate)(spec.name, raw.get(spec.name))?);
        }

        Ok(Self { values })
    }

    /// True when every rebuild-triggering option matches `previous`.
    pub fn allows_incremental_compile(&self, previous: Option<&CompilerOptions>) -> bool {
        let Some(previous) = previous else {
            return false;
        };

        SCHEMA
            .iter()
            .filter(|spec| !spec.flags.contains(OptionFlags::INCREMENTAL))
            .all(|spec| self.values.get(spec.name) == previous.values.get(spec.name))
    }

    pub fn assert_parent_compatibility(&self, parent: &CompilerOptions) -> Result<(), ConfigError> {
        for spec in SCHEMA
            .iter()
            .filter(|spec| spec.flags.contains(OptionFlags::PARENT_MUST_MATCH))
        {
            if self.values.get(spec.name) != parent.values.get(spec.name) {
                return Err(ConfigError::ParentMismatch(spec.name.to_string()));
            }
        }
        Ok(())
    }

    fn bool(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(Validated::Bool(true)))
    }

    fn int(&self, name: &str) -> u64 {
        match self.values.get(name) {
            Some(Validated::Int(n)) => *n,
            _ => 0,
        }
    }

    fn string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(Validated::Str(s)) => s.as_deref(),
            _ => None,
        }
    }

    fn lines(&self, name: &str) -> &[String] {
        match self.values.get(name) {
            Some(Validated::Lines(lines)) => lines,
            _ => &[],
        }
    }

    fn file_list(&self, name: &str) -> &[SourceFile] {
        match self.values.get(name) {
            Some(Validated::Files(files)) => files,
            _ => &[],
        }
    }

    fn set(&self, name: &str) -> &BTreeSet<String> {
        match self.values.get(name) {
            Some(Validated::Set(set)) => set,
            _ => &NO_STRINGS,
        }
    }

    fn table(&self, name: &str) -> &BTreeMap<String, Value> {
        match self.values.get(name) {
            Some(Validated::Map(map)) => map,
            _ => &NO_VALUES,
        }
    }

    fn hook(&self, name: &str) -> Option<&Hook> {
        match self.values.get(name) {
            Some(Validated::Hook(hook)) => hook.as_ref(),
            _ => None,
        }
    }

    pub fn files(&self) -> &[SourceFile] {
        self.file_list("files")
    }

    pub fn defs(&self) -> &[SourceFile] {
        self.file_list("defs")
    }

    pub fn prepend(&self) -> &[String] {
        self.lines("prepend")
    }

    pub fn append(&self) -> &[String] {
        self.lines("append")
    }

    /// The language requested by `output-language`, overridden by
    /// `dev-output-typescript`.
    pub fn output_language(&self) -> OutputLanguage {
        if self.dev_output_typescript() {
            return OutputLanguage::TypeScript;
        }
        match self.values.get("output-language") {
            Some(Validated::Language(language)) => *language,
            _ => OutputLanguage::JavaScript,
        }
    }

    pub fn include_map(&self) -> bool {
        self.bool("include-map")
    }

    pub fn source_map_file(&self) -> Option<&str> {
        self.string("source-map-file")
    }

    pub fn source_map_root(&self) -> Option<&str> {
        self.string("source-map-root")
    }

    pub fn before_compile(&self) -> Option<&Hook> {
        self.hook("before-compile")
    }

    pub fn after_compile(&self) -> Option<&Hook> {
        self.hook("after-compile")
    }

    pub fn interceptors(&self) -> &BTreeMap<String, Interceptor> {
        match self.values.get("interceptors") {
            Some(Validated::Interceptors(map)) => map,
            _ => &NO_INTERCEPTORS,
        }
    }

    pub fn additional_globals(&self) -> &BTreeMap<String, Value> {
        self.table("additional-globals")
    }

    pub fn observers(&self) -> &BTreeMap<String, Value> {
        self.table("observers")
    }

    pub fn target_tags(&self) -> &BTreeMap<String, Value> {
        self.table("target-tags")
    }

    pub fn undefined_guards(&self) -> &BTreeSet<String> {
        self.set("undefined-guards")
    }

    pub fn squeeze(&self) -> bool {
        self.bool("squeeze")
    }

    pub fn squeeze_start_index(&self) -> u64 {
        self.int("squeeze-start-index")
    }

    /// Exclusive upper bound of the squeeze index range; 0 is unbounded.
    pub fn squeeze_end_index(&self) -> u64 {
        self.int("squeeze-end-index")
    }

    pub fn squeeze_builtins(&self) -> &BTreeSet<String> {
        self.set("squeeze-builtins")
    }

    pub fn check_types(&self) -> bool {
        self.bool("check-types")
    }

    pub fn typescript_target(&self) -> Option<&str> {
        self.string("typescript-target")
    }

    pub fn typescript_lib(&self) -> &[String] {
        self.lines("typescript-lib")
    }

    pub fn typescript_options(&self) -> Option<&Value> {
        match self.values.get("typescript-options") {
            Some(Validated::Json(value)) => value.as_ref(),
            _ => None,
        }
    }

    pub fn dev_dump_tmp(&self) -> bool {
        self.bool("dev-dump-tmp")
    }

    pub fn dev_print_log(&self) -> bool {
        self.bool("dev-print-log")
    }

    pub fn dev_omit_runtime(&self) -> bool {
        self.bool("dev-omit-runtime")
    }

    pub fn dev_output_typescript(&self) -> bool {
        self.bool("dev-output-typescript")
    }

    pub fn dev_fast_test(&self) -> bool {
        self.bool("dev-fast-test")
    }

    pub fn include_bridged(&self) -> bool {
        self.bool("include-bridged")
    }

    pub fn include_function_map(&self) -> bool {
        self.bool("include-function-map")
    }
}
