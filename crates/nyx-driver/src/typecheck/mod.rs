//! Type checking of generated TypeScript
//!
//! Each compiler instance with `check-types` owns a [`Typechecker`]. It
//! keeps one TypeScript entry per source file (`<path>.ts`), one per defs
//! file (`<path>/defs.d.ts`) and the runtime declarations, and hands them
//! to the shared [`TypecheckPool`](pool::TypecheckPool). Entries of parent
//! instances are passed along for name resolution but are checked by the
//! parents, never by the child.

pub mod pool;

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nyx_parser::ParsedSource;
use serde_json::{json, Value};
use tracing::{debug, warn};
use xxhash_rust::xxh64::xxh64;

use crate::error::GenerateError;
use crate::frontend::{CodeGenerator, GenerateRequest};
use crate::issue::Issue;
use crate::model::Model;
use crate::options::{CompilerOptions, OutputLanguage};
use crate::output::RUNTIME_DEFS;
use crate::resolver::ImportTable;
use crate::squeezer::Squeezer;
use crate::symbols::{symbolicate, Unsqueeze};

use pool::{CheckEntry, CheckJob, Diagnostic, TypecheckPool};

pub const RUNTIME_DEFS_KEY: &str = "N$-runtime/defs.d.ts";

static NEXT_CHECKER_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone)]
struct MappedEntry {
    entry: CheckEntry,
    /// Path of the file the entry was generated from
    original: String,
    /// What the entry was generated from: a unit revision or a content hash
    input: u64,
    worker: Option<usize>,
}

/// The entries of a checker after its last check, shared with the checkers
/// of child instances.
#[derive(Debug, Clone, Default)]
pub struct CheckerSnapshot {
    group_id: u64,
    entries: Vec<(CheckEntry, String)>,
}

impl CheckerSnapshot {
    pub fn group_id(&self) -> u64 {
        self.group_id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A source file to check, with its resolved imports.
#[derive(Clone, Copy)]
pub struct CheckFile<'a> {
    pub path: &'a str,
    pub revision: u64,
    pub source: &'a ParsedSource,
    pub imports: &'a ImportTable,
}

/// A loaded declaration file.
#[derive(Debug, Clone)]
pub struct DefsFile {
    pub path: String,
    pub text: Arc<str>,
}

pub struct CheckRequest<'a> {
    pub parents: &'a [Arc<CheckerSnapshot>],
    pub model: &'a Model,
    pub squeezer: Option<&'a Squeezer>,
    pub defs: &'a [DefsFile],
    pub files: &'a [CheckFile<'a>],
    pub generator: &'a dyn CodeGenerator,
    pub options: &'a CompilerOptions,
}

pub struct Typechecker {
    id: u64,
    group_id: u64,
    pool: Arc<TypecheckPool>,
    next_worker: usize,
    code: BTreeMap<String, MappedEntry>,
    defs: BTreeMap<String, MappedEntry>,
    warnings: Vec<Issue>,
}

impl Typechecker {
    /// Creates a checker that joins the group of its first parent, or
    /// starts a new group.
    pub fn new(parents: &[Arc<CheckerSnapshot>], pool: Arc<TypecheckPool>) -> Self {
        let group_id = match parents.first() {
            Some(parent) => parent.group_id,
            None => NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed),
        };

        Self {
            id: NEXT_CHECKER_ID.fetch_add(1, Ordering::Relaxed),
            group_id,
            pool,
            next_worker: 0,
            code: BTreeMap::new(),
            defs: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn group_id(&self) -> u64 {
        self.group_id
    }

    /// Warnings of the last check.
    pub fn warnings(&self) -> &[Issue] {
        &self.warnings
    }

    pub fn snapshot(&self) -> CheckerSnapshot {
        let entries = self
            .defs
            .values()
            .chain(self.code.values())
            .map(|mapped| (mapped.entry.clone(), mapped.original.clone()))
            .collect();

        CheckerSnapshot {
            group_id: self.group_id,
            entries,
        }
    }

    /// Regenerates changed entries and checks this instance's files.
    ///
    /// Fails with the path of the first file whose TypeScript could not be
    /// generated.
    pub fn check(&mut self, request: CheckRequest<'_>) -> Result<(), (String, GenerateError)> {
        self.update_defs(request.defs);
        self.update_code(&request)?;

        let entries = self.all_entries(request.parents);
        if request.options.dev_dump_tmp() {
            self.dump(&entries, request.options);
        }

        if request.options.dev_fast_test() {
            self.warnings.clear();
            return Ok(());
        }

        let diagnostics = self.run(entries, request.options);
        self.warnings = diagnostics
            .into_iter()
            .map(|diagnostic| self.to_warning(diagnostic, request.parents, request.squeezer))
            .collect();

        debug!(checker = self.id, warnings = self.warnings.len(), "type check finished");
        Ok(())
    }

    fn update_defs(&mut self, defs: &[DefsFile]) {
        let mut updated = BTreeMap::new();

        for file in defs {
            let key = format!("{}/defs.d.ts", file.path);
            let hash = xxh64(file.text.as_bytes(), 0);
            let previous = self.defs.get(&key).cloned();
            let mapped = update_entry(previous, &key, &file.path, hash, true, || Ok(file.text.clone()));
            if let Ok(mapped) = mapped {
                updated.insert(key, mapped);
            }
        }

        self.defs = updated;
    }

    fn update_code(&mut self, request: &CheckRequest<'_>) -> Result<(), (String, GenerateError)> {
        let mut updated = BTreeMap::new();

        for file in request.files {
            let key = format!("{}.ts", file.path);
            let previous = self.code.get(&key).cloned();

            let mut mapped = update_entry(previous, &key, file.path, file.revision, false, || {
                let generated = request.generator.generate(GenerateRequest {
                    path: file.path,
                    source: file.source,
                    imports: file.imports,
                    model: request.model,
                    squeezer: None,
                    options: request.options,
                    language: OutputLanguage::TypeScript,
                })?;
                Ok(Arc::from(generated.lines.join("\n")))
            })
            .map_err(|err| (file.path.to_string(), err))?;

            // Sticky round-robin: a file keeps its worker across checks
            if mapped.worker.is_none() {
                mapped.worker = Some(self.next_worker);
                self.next_worker = (self.next_worker + 1) % self.pool.worker_count();
            }

            updated.insert(key, mapped);
        }

        self.code = updated;
        Ok(())
    }

    /// Parent entries first, then this instance's defs, the runtime
    /// declarations and this instance's code.
    fn all_entries(&self, parents: &[Arc<CheckerSnapshot>]) -> Vec<CheckEntry> {
        let mut entries: BTreeMap<&str, &CheckEntry> = BTreeMap::new();
        for parent in parents {
            for (entry, _) in &parent.entries {
                entries.entry(entry.key.as_str()).or_insert(entry);
            }
        }

        let mut result: Vec<CheckEntry> = entries
            .into_values()
            .filter(|entry| !self.code.contains_key(&entry.key) && !self.defs.contains_key(&entry.key))
            .cloned()
            .collect();

        result.extend(self.defs.values().map(|mapped| mapped.entry.clone()));
        result.push(CheckEntry {
            key: RUNTIME_DEFS_KEY.to_string(),
            text: Arc::from(RUNTIME_DEFS),
            version: 0,
            is_defs: true,
        });
        result.extend(self.code.values().map(|mapped| mapped.entry.clone()));
        result
    }

    fn run(&self, entries: Vec<CheckEntry>, options: &CompilerOptions) -> Vec<Diagnostic> {
        let entries = Arc::new(entries);
        let settings = Arc::new(typescript_settings(options));

        let mut active: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for (key, mapped) in &self.code {
            if let Some(worker) = mapped.worker {
                active.entry(worker).or_default().push(key.clone());
            }
        }

        let jobs = active
            .into_iter()
            .map(|(worker, active)| {
                let job = CheckJob {
                    checker_id: self.id,
                    group_id: self.group_id,
                    entries: entries.clone(),
                    active,
                    settings: settings.clone(),
                };
                (worker, job)
            })
            .collect();

        self.pool.run(jobs)
    }

    fn to_warning(&self, diagnostic: Diagnostic, parents: &[Arc<CheckerSnapshot>], squeezer: Option<&Squeezer>) -> Issue {
        let file = self.original_path(&diagnostic.key, parents);

        let lookup = match squeezer {
            Some(squeezer) => Unsqueeze::Squeezer(squeezer),
            None => Unsqueeze::None,
        };
        let message = symbolicate(&diagnostic.message, lookup);
        let message = message
            .strip_suffix(':')
            .or_else(|| message.strip_suffix('.'))
            .unwrap_or(&message);

        let mut issue = Issue::new(message).at(diagnostic.line, diagnostic.column).in_file(file);
        issue.code = Some(diagnostic.code);
        issue.typechecker = true;
        issue
    }

    fn original_path(&self, key: &str, parents: &[Arc<CheckerSnapshot>]) -> String {
        if let Some(mapped) = self.code.get(key).or_else(|| self.defs.get(key)) {
            return mapped.original.clone();
        }
        parents
            .iter()
            .flat_map(|parent| parent.entries.iter())
            .find(|(entry, _)| entry.key == key)
            .map(|(_, original)| original.clone())
            .unwrap_or_else(|| key.to_string())
    }

    fn dump(&self, entries: &[CheckEntry], options: &CompilerOptions) {
        let root = std::env::temp_dir().join("nyx.typechecker").join(self.id.to_string());

        let write = |dir: PathBuf, entry: &CheckEntry| -> std::io::Result<()> {
            fs::create_dir_all(&dir)?;
            fs::write(dir.join(dump_name(&entry.key)), entry.text.as_bytes())
        };

        for entry in entries {
            let dir = root.join(if entry.is_defs { "defs" } else { "code" });
            if let Err(err) = write(dir, entry) {
                warn!(key = %entry.key, error = %err, "could not dump type checker entry");
            }
        }

        let settings = serde_json::to_string_pretty(&typescript_settings(options)).unwrap_or_default();
        if let Err(err) = fs::write(root.join("tsconfig.json"), settings) {
            warn!(error = %err, "could not dump type checker settings");
        }
    }
}

/// Reuses `previous` when it was generated from the same input. Otherwise
/// regenerates the text and bumps the version if the text changed.
fn update_entry<F>(
    previous: Option<MappedEntry>,
    key: &str,
    original: &str,
    input: u64,
    is_defs: bool,
    generate: F,
) -> Result<MappedEntry, GenerateError>
where
    F: FnOnce() -> Result<Arc<str>, GenerateError>,
{
    match previous {
        Some(previous) if previous.input == input => Ok(previous),
        Some(mut previous) => {
            let text = generate()?;
            if text != previous.entry.text {
                previous.entry.text = text;
                previous.entry.version += 1;
            }
            previous.input = input;
            Ok(previous)
        }
        None => Ok(MappedEntry {
            entry: CheckEntry {
                key: key.to_string(),
                text: generate()?,
                version: 1,
                is_defs,
            },
            original: original.to_string(),
            input,
            worker: None,
        }),
    }
}

/// The options object handed to the backend: defaults, then the caller's
/// `typescript-options`, then the target and library.
pub fn typescript_settings(options: &CompilerOptions) -> Value {
    let mut settings = json!({
        "strict": true,
        "noEmit": true,
        "noImplicitOverride": true,
        "useDefineForClassFields": true,
    });

    if let (Value::Object(map), Some(Value::Object(extra))) = (&mut settings, options.typescript_options()) {
        map.extend(extra.iter().map(|(key, value)| (key.clone(), value.clone())));
    }

    let lib: Vec<&str> = if options.typescript_lib().is_empty() {
        vec!["es2022"]
    } else {
        options.typescript_lib().iter().map(String::as_str).collect()
    };

    settings["target"] = json!(options.typescript_target().unwrap_or("es2022"));
    settings["lib"] = json!(lib);
    settings
}

fn dump_name(key: &str) -> String {
    key.replace(['/', '\\'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RawOptions;
    use crate::resolver::ImportResolver;
    use crate::generator::ScriptGenerator;
    use pool::DeclarationCheck;

    fn options(raw: RawOptions) -> CompilerOptions {
        CompilerOptions::new(&raw).unwrap()
    }

    fn pool(workers: usize) -> Arc<TypecheckPool> {
        Arc::new(TypecheckPool::new(workers, || Box::new(DeclarationCheck::default())))
    }

    struct Sources {
        parsed: Vec<(String, ParsedSource)>,
        tables: Vec<ImportTable>,
        model: Model,
    }

    impl Sources {
        fn new(files: &[(&str, &str)]) -> Self {
            let parsed: Vec<(String, ParsedSource)> = files
                .iter()
                .map(|(path, text)| (path.to_string(), nyx_parser::parse(text).unwrap()))
                .collect();
            let model = Model::new(1, Vec::new()).unwrap();
            let imports: Vec<Vec<String>> = parsed
                .iter()
                .map(|(_, source)| source.program.imports().map(|i| i.value.name.clone()).collect())
                .collect();
            let pairs: Vec<(&str, &[String])> = parsed
                .iter()
                .zip(&imports)
                .map(|((path, _), imports)| (path.as_str(), imports.as_slice()))
                .collect();
            let tables = ImportResolver::new(&model).classify(&pairs);
            Self { parsed, tables, model }
        }

        fn files(&self, revision: u64) -> Vec<CheckFile<'_>> {
            self.parsed
                .iter()
                .zip(&self.tables)
                .map(|((path, source), imports)| CheckFile {
                    path,
                    revision,
                    source,
                    imports,
                })
                .collect()
        }
    }

    fn check(checker: &mut Typechecker, sources: &Sources, revision: u64, options: &CompilerOptions) {
        let files = sources.files(revision);
        checker
            .check(CheckRequest {
                parents: &[],
                model: &sources.model,
                squeezer: None,
                defs: &[],
                files: &files,
                generator: &ScriptGenerator,
                options,
            })
            .unwrap();
    }

    #[test]
    fn test_warnings_point_at_source_files() {
        let sources = Sources::new(&[("a.nx", "class A extends Missing {}")]);
        let mut checker = Typechecker::new(&[], pool(1));
        check(&mut checker, &sources, 1, &options(RawOptions::new()));

        let warning = &checker.warnings()[0];
        assert_eq!(warning.message, "Cannot find name 'Missing'");
        assert_eq!(warning.file.as_deref(), Some("a.nx"));
        assert_eq!((warning.line, warning.column), (Some(1), Some(16)));
        assert_eq!(warning.code, Some(2304));
        assert!(warning.typechecker);
    }

    #[test]
    fn test_sticky_round_robin() {
        let sources = Sources::new(&[("a.nx", "let a;"), ("b.nx", "let b;"), ("c.nx", "let c;")]);
        let mut checker = Typechecker::new(&[], pool(2));
        let options = options(RawOptions::new());

        check(&mut checker, &sources, 1, &options);
        let workers: Vec<Option<usize>> = checker.code.values().map(|m| m.worker).collect();
        assert_eq!(workers, vec![Some(0), Some(1), Some(0)]);

        check(&mut checker, &sources, 2, &options);
        let again: Vec<Option<usize>> = checker.code.values().map(|m| m.worker).collect();
        assert_eq!(again, workers);
    }

    #[test]
    fn test_version_bumps_only_on_new_text() {
        let sources = Sources::new(&[("a.nx", "let a;")]);
        let mut checker = Typechecker::new(&[], pool(1));
        let options = options(RawOptions::new());

        check(&mut checker, &sources, 1, &options);
        check(&mut checker, &sources, 2, &options);
        assert_eq!(checker.code["a.nx.ts"].entry.version, 1);

        let edited = Sources::new(&[("a.nx", "let b;")]);
        check(&mut checker, &edited, 3, &options);
        assert_eq!(checker.code["a.nx.ts"].entry.version, 2);
    }

    #[test]
    fn test_group_follows_first_parent() {
        let parent = Typechecker::new(&[], pool(1));
        let snapshot = Arc::new(parent.snapshot());
        let child = Typechecker::new(&[snapshot], pool(1));

        assert_eq!(child.group_id(), parent.group_id());
        assert_ne!(child.id(), parent.id());
        assert_ne!(Typechecker::new(&[], pool(1)).group_id(), parent.group_id());
    }

    #[test]
    fn test_parent_entries_resolve_names() {
        let parent_sources = Sources::new(&[("base.nx", "export class Base {}")]);
        let mut parent = Typechecker::new(&[], pool(1));
        let options = options(RawOptions::new());
        check(&mut parent, &parent_sources, 1, &options);
        let snapshot = Arc::new(parent.snapshot());

        let child_sources = Sources::new(&[("sub.nx", "class Sub extends Base {}")]);
        let mut child = Typechecker::new(&[snapshot.clone()], pool(1));
        let files = child_sources.files(1);
        child
            .check(CheckRequest {
                parents: &[snapshot],
                model: &child_sources.model,
                squeezer: None,
                defs: &[],
                files: &files,
                generator: &ScriptGenerator,
                options: &options,
            })
            .unwrap();

        assert!(child.warnings().is_empty());
        assert!(!child.code.contains_key("base.nx.ts"));
    }

    #[test]
    fn test_fast_test_skips_analysis() {
        let sources = Sources::new(&[("a.nx", "new Missing();")]);
        let mut checker = Typechecker::new(&[], pool(1));
        check(
            &mut checker,
            &sources,
            1,
            &options(RawOptions::new().set("dev-fast-test", true)),
        );
        assert!(checker.warnings().is_empty());
    }

    #[test]
    fn test_settings_order() {
        let options = options(
            RawOptions::new()
                .set("typescript-options", serde_json::json!({ "strict": false, "target": "es5" }))
                .set("typescript-lib", "es2020,dom"),
        );
        let settings = typescript_settings(&options);
        assert_eq!(settings["strict"], false);
        assert_eq!(settings["target"], "es2022");
        assert_eq!(settings["lib"], serde_json::json!(["es2020", "dom"]));
    }
}
