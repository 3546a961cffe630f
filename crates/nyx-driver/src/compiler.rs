//! Compiler instances and the per-call pipeline
//!
//! A [`CompilerInstance`] is long-lived. Every `compile()` call reuses the
//! units, squeezer and type checker left by the previous call and only
//! redoes the stages that changed inputs invalidated:
//!
//! ```text
//! options -> units -> preprocess -> parse -> build -> model -> reorder
//!         -> classify imports -> type check -> generate -> assemble
//! ```
//!
//! Instances compose through [`CompilerInstance::uses`]. A child reads the
//! state its parents committed on their last successful call and never
//! runs their pipeline.

use std::fs;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use tracing::{debug, info, instrument, warn};

use crate::dep_graph::{DependencyReorderer, FileOutline};
use crate::error::{CompileResult, CompositionError, ConfigError, FileError, GenerateError, SqueezeError};
use crate::frontend::{FileDeclarations, GenerateRequest, Generated, Toolchain};
use crate::hooks::{CallbackFile, Hook};
use crate::issue::Issue;
use crate::model::Model;
use crate::options::{CompilerOptions, OutputLanguage, RawOptions};
use crate::output::{assemble, CompileOutput, EmittedFile};
use crate::resolver::ImportResolver;
use crate::squeezer::Squeezer;
use crate::typecheck::pool::{include_in_results, shared_pool, TypecheckPool};
use crate::typecheck::{CheckFile, CheckRequest, CheckerSnapshot, DefsFile, Typechecker};
use crate::unit::{CompileUnit, Stage, Transition};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// State published by a successful call, read by child instances.
#[derive(Debug)]
pub struct Committed {
    options: CompilerOptions,
    model: Arc<Model>,
    squeezer: Option<Arc<Squeezer>>,
    checker: Option<Arc<CheckerSnapshot>>,
}

impl Committed {
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn squeezer(&self) -> Option<&Arc<Squeezer>> {
        self.squeezer.as_ref()
    }
}

#[derive(Default)]
struct InstanceState {
    options: Option<CompilerOptions>,
    units: FxHashMap<String, CompileUnit>,
    /// Model signature of the last successful call
    model_signature: Option<u64>,
    squeezer: Option<Arc<Squeezer>>,
    checker: Option<Typechecker>,
}

impl InstanceState {
    fn invalidate_all(&mut self, stage: Stage) {
        for unit in self.units.values_mut() {
            unit.apply(Transition::Invalidate(stage));
        }
    }

    fn has_errors(&self) -> bool {
        self.units.values().any(|unit| unit.error().is_some())
    }

    fn warnings(&self, order: &[&str]) -> Vec<Issue> {
        order
            .iter()
            .filter_map(|path| self.units.get(*path))
            .flat_map(|unit| unit.warnings().cloned())
            .collect()
    }

    /// The result of a call that stopped at a per-file error.
    fn failed_output(&self, files: &[String], mut errors: Vec<Issue>) -> CompileOutput {
        for path in files {
            if let Some(error) = self.units.get(path).and_then(CompileUnit::error) {
                errors.push(error.to_issue(path));
            }
        }

        let order: Vec<&str> = files.iter().map(String::as_str).collect();
        CompileOutput {
            errors,
            warnings: self.warnings(&order),
            ..CompileOutput::default()
        }
    }
}

pub struct CompilerInstance {
    id: u64,
    toolchain: Toolchain,
    pool: Option<Arc<TypecheckPool>>,
    parents: RwLock<Vec<Arc<CompilerInstance>>>,
    state: Mutex<InstanceState>,
    committed: RwLock<Option<Arc<Committed>>>,
}

impl Default for CompilerInstance {
    fn default() -> Self {
        Self::new()
    }
}

impl CompilerInstance {
    pub fn new() -> Self {
        Self::with_toolchain(Toolchain::default())
    }

    pub fn with_toolchain(toolchain: Toolchain) -> Self {
        Self {
            id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            toolchain,
            pool: None,
            parents: RwLock::new(Vec::new()),
            state: Mutex::new(InstanceState::default()),
            committed: RwLock::new(None),
        }
    }

    /// Uses `pool` for type checking instead of the process-wide pool.
    pub fn with_pool(mut self, pool: Arc<TypecheckPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Makes `parent`'s committed state visible to this instance. An
    /// instance may not use itself, directly or through its parents.
    pub fn uses(&self, parent: Arc<CompilerInstance>) -> Result<(), CompositionError> {
        if parent.reaches(self.id) {
            return Err(CompositionError::Cycle);
        }

        let mut parents = self.parents.write();
        if !parents.iter().any(|existing| existing.id == parent.id) {
            parents.push(parent);
        }
        Ok(())
    }

    fn reaches(&self, id: u64) -> bool {
        self.id == id || self.parents.read().iter().any(|parent| parent.reaches(id))
    }

    /// State of the last successful call, if any.
    pub fn committed(&self) -> Option<Arc<Committed>> {
        self.committed.read().clone()
    }

    /// Type checker warnings of the last call that ran the type checker.
    pub fn collect_typechecker_warnings(&self) -> Vec<Issue> {
        let state = self.state.lock();
        state
            .checker
            .as_ref()
            .map(|checker| checker.warnings().to_vec())
            .unwrap_or_default()
    }

    /// Runs the pipeline. Per-file problems are reported in the output;
    /// only configuration and composition problems fail the call.
    #[instrument(skip_all, fields(instance = self.id))]
    pub fn compile(&self, raw: RawOptions) -> CompileResult<CompileOutput> {
        let options = CompilerOptions::new(&raw)?;

        let parents: Vec<Arc<CompilerInstance>> = self.parents.read().clone();
        let committed: Vec<Arc<Committed>> = parents.iter().filter_map(|parent| parent.committed()).collect();
        for parent in &committed {
            options.assert_parent_compatibility(&parent.options)?;
        }

        let mut state = self.state.lock();
        self.prepare(&mut state, &options);
        let squeezer = self.prepare_squeezer(&mut state, &options, &committed)?;

        self.run(&mut state, &options, &committed, squeezer, parents.is_empty())
    }

    /// Updates the units for this call's options and file set.
    fn prepare(&self, state: &mut InstanceState, options: &CompilerOptions) {
        if !options.allows_incremental_compile(state.options.as_ref()) {
            if state.options.is_some() {
                info!("rebuild-triggering options changed, invalidating every file");
            }
            state.invalidate_all(Stage::Preprocess);
            state.model_signature = None;
            state.squeezer = None;
            state.checker = None;
        } else if let Some(previous) = &state.options {
            let before_changed = previous.before_compile() != options.before_compile();
            let after_changed = previous.after_compile() != options.after_compile();
            if before_changed {
                state.invalidate_all(Stage::Preprocess);
            } else if after_changed {
                state.invalidate_all(Stage::Generate);
            }
        }

        let files = options.files();
        state.units.retain(|path, _| files.iter().any(|file| &file.path == path));

        let has_hook = options.before_compile().is_some();
        for file in files {
            let unit = state
                .units
                .entry(file.path.clone())
                .or_insert_with(|| CompileUnit::new(file.path.clone()));
            unit.clear_error();
            unit.update(file, has_hook);
        }

        state.options = Some(options.clone());
    }

    /// Keeps the squeezer of the previous call when the parents' tokens
    /// still merge into it. A conflict rebuilds it, which regenerates every
    /// file.
    fn prepare_squeezer(
        &self,
        state: &mut InstanceState,
        options: &CompilerOptions,
        committed: &[Arc<Committed>],
    ) -> CompileResult<Option<Arc<Squeezer>>> {
        if !options.squeeze() {
            state.squeezer = None;
            return Ok(None);
        }

        let parents: Vec<Arc<Squeezer>> = committed.iter().filter_map(|c| c.squeezer.clone()).collect();

        if let Some(existing) = state.squeezer.clone() {
            match parents.iter().try_for_each(|parent| existing.merge(parent)) {
                Ok(()) => return Ok(Some(existing)),
                Err(err) => {
                    warn!(error = %err, "squeezer no longer matches its parents, rebuilding");
                    state.invalidate_all(Stage::Generate);
                }
            }
        }

        let squeezer = Squeezer::new(
            &parents,
            options.squeeze_start_index(),
            options.squeeze_end_index(),
            options.squeeze_builtins(),
        )
        .map_err(CompositionError::from)?;

        let squeezer = Arc::new(squeezer);
        state.squeezer = Some(squeezer.clone());
        Ok(Some(squeezer))
    }

    fn run(
        &self,
        state: &mut InstanceState,
        options: &CompilerOptions,
        committed: &[Arc<Committed>],
        squeezer: Option<Arc<Squeezer>>,
        include_runtime: bool,
    ) -> CompileResult<CompileOutput> {
        let files: Vec<String> = options.files().iter().map(|file| file.path.clone()).collect();

        self.preprocess(state, options);
        if state.has_errors() {
            return Ok(state.failed_output(&files, Vec::new()));
        }

        self.parse(state, options);
        if state.has_errors() {
            return Ok(state.failed_output(&files, Vec::new()));
        }

        self.build(state, options);
        if state.has_errors() {
            return Ok(state.failed_output(&files, Vec::new()));
        }

        // Declarations are cached per unit; the model is reassembled from
        // them in file order on every call.
        let parent_models = committed.iter().map(|c| c.model.clone()).collect();
        let mut model = Model::new(self.id, parent_models)?;
        for path in &files {
            let Some(unit) = state.units.get_mut(path) else {
                continue;
            };
            let Some(declarations) = unit.declarations.clone() else {
                continue;
            };
            if let Err(err) = declarations.add_to_model(&mut model) {
                unit.fail(Stage::Build, err.into());
            }
        }
        if state.has_errors() {
            return Ok(state.failed_output(&files, Vec::new()));
        }

        let declarations: Vec<Arc<FileDeclarations>> = files
            .iter()
            .filter_map(|path| state.units.get(path).and_then(|unit| unit.declarations.clone()))
            .collect();
        let outlines: Vec<FileOutline<'_>> = declarations.iter().map(|d| FileOutline::new(d)).collect();
        let order = DependencyReorderer::new(&outlines).order()?;
        let ordered: Vec<&str> = order.iter().map(|&i| declarations[i].path.as_str()).collect();

        let signature = self.classify(state, &model, &declarations, &order);
        let model = Arc::new(model);

        if options.check_types() {
            let errors = self.typecheck(state, options, &model, squeezer.as_deref(), committed, &ordered);
            if !errors.is_empty() || state.has_errors() {
                return Ok(state.failed_output(&files, errors));
            }
        }

        let language = if options.dev_output_typescript() {
            OutputLanguage::TypeScript
        } else {
            options.output_language()
        };

        if language != OutputLanguage::None {
            self.generate(state, options, &model, squeezer.as_deref(), language, &ordered);

            for unit in state.units.values() {
                if let Some(FileError::Generate(GenerateError::Squeeze(SqueezeError::RangeExceeded { max }))) =
                    unit.error()
                {
                    return Err(ConfigError::SqueezeRangeExceeded(*max).into());
                }
            }
            if state.has_errors() {
                return Ok(state.failed_output(&files, Vec::new()));
            }
        }

        let mut output = CompileOutput {
            warnings: state.warnings(&ordered),
            ..CompileOutput::default()
        };

        if language != OutputLanguage::None {
            let emitted: Vec<EmittedFile<'_>> = ordered
                .iter()
                .filter_map(|path| {
                    let unit = state.units.get(*path)?;
                    Some(EmittedFile {
                        path: unit.path(),
                        lines: &unit.generated.as_ref()?.lines,
                        source: unit.ast.as_deref(),
                    })
                })
                .collect();

            let assembled = assemble(&emitted, options, include_runtime && !options.dev_omit_runtime());
            output.code = Some(assembled.code);
            output.map = assembled.map;
            output.function_map = assembled.function_map;
        }

        if options.check_types() && include_in_results() {
            if let Some(checker) = &state.checker {
                output.warnings.extend(checker.warnings().iter().cloned());
            }
        }
        if let Some(squeezer) = &squeezer {
            output.squeezed = Some(squeezer.squeeze_map());
        }
        if options.include_bridged() {
            output.bridged = Some(model.to_bridged());
        }

        state.model_signature = Some(signature);
        *self.committed.write() = Some(Arc::new(Committed {
            options: options.clone(),
            model,
            // The live squeezer keeps allocating in later calls, which may fail
            squeezer: squeezer.as_deref().map(|squeezer| Arc::new(squeezer.snapshot())),
            checker: state.checker.as_ref().map(|checker| Arc::new(checker.snapshot())),
        }));

        info!(files = files.len(), warnings = output.warnings.len(), "compiled");
        Ok(output)
    }

    // =========================================================================
    // Stages
    // =========================================================================

    fn preprocess(&self, state: &mut InstanceState, options: &CompilerOptions) {
        let started = Instant::now();
        let hook = options.before_compile();

        let pending: Vec<&mut CompileUnit> = state
            .units
            .values_mut()
            .filter(|unit| unit.needs(Stage::Preprocess) && unit.error().is_none() && unit.source().is_some())
            .collect();
        let count = pending.len();

        pending.into_par_iter().for_each(|unit| {
            let Some(source) = unit.source().cloned() else {
                return;
            };

            match run_before_compile(unit.path(), &source, hook) {
                Ok((text, warnings)) => {
                    unit.text = Some(text);
                    unit.preprocess_warnings = warnings;
                    unit.apply(Transition::Completed(Stage::Preprocess));
                    debug!(path = unit.path(), "preprocessed");
                }
                Err(err) => unit.fail(Stage::Preprocess, err),
            }
        });

        stage_finished(options, "preprocess", count, started);
    }

    fn parse(&self, state: &mut InstanceState, options: &CompilerOptions) {
        let started = Instant::now();
        let parser = &self.toolchain.parser;

        let pending: Vec<&mut CompileUnit> = state
            .units
            .values_mut()
            .filter(|unit| unit.needs(Stage::Parse) && !unit.needs(Stage::Preprocess) && unit.text.is_some())
            .collect();
        let count = pending.len();

        pending.into_par_iter().for_each(|unit| {
            let Some(text) = unit.text.clone() else {
                return;
            };

            match parser.parse(unit.path(), &text) {
                Ok(ast) => {
                    unit.ast = Some(ast);
                    unit.apply(Transition::Completed(Stage::Parse));
                    debug!(path = unit.path(), "parsed");
                }
                Err(err) => unit.fail(Stage::Parse, err.into()),
            }
        });

        stage_finished(options, "parse", count, started);
    }

    fn build(&self, state: &mut InstanceState, options: &CompilerOptions) {
        let started = Instant::now();
        let builder = &self.toolchain.builder;

        let pending: Vec<&mut CompileUnit> = state
            .units
            .values_mut()
            .filter(|unit| unit.needs(Stage::Build) && !unit.needs(Stage::Parse) && unit.ast.is_some())
            .collect();
        let count = pending.len();

        pending.into_par_iter().for_each(|unit| {
            let Some(ast) = unit.ast.clone() else {
                return;
            };

            match builder.build(unit.path(), &ast) {
                Ok(declarations) => {
                    unit.declarations = Some(Arc::new(declarations));
                    unit.apply(Transition::Completed(Stage::Build));
                    debug!(path = unit.path(), "built");
                }
                Err(err) => unit.fail(Stage::Build, err.into()),
            }
        });

        stage_finished(options, "build", count, started);
    }

    /// Classifies every file's imports against the final order. A file is
    /// regenerated when its classification changed, or every file when the
    /// model signature did. Returns the signature.
    fn classify(
        &self,
        state: &mut InstanceState,
        model: &Model,
        declarations: &[Arc<FileDeclarations>],
        order: &[usize],
    ) -> u64 {
        let pairs: Vec<(&str, &[String])> = order
            .iter()
            .map(|&i| (declarations[i].path.as_str(), declarations[i].imports.as_slice()))
            .collect();
        let tables = ImportResolver::new(model).classify(&pairs);

        let signature = model.signature();
        let model_changed = state.model_signature != Some(signature);
        if model_changed && state.model_signature.is_some() {
            info!("exported declarations changed, regenerating every file");
        }

        for ((path, _), table) in pairs.iter().zip(tables) {
            let Some(unit) = state.units.get_mut(*path) else {
                continue;
            };
            if model_changed || unit.imports.as_ref() != Some(&table) {
                unit.apply(Transition::Invalidate(Stage::Generate));
            }
            unit.imports = Some(table);
        }

        signature
    }

    /// Returns errors not attributable to a single file.
    fn typecheck(
        &self,
        state: &mut InstanceState,
        options: &CompilerOptions,
        model: &Model,
        squeezer: Option<&Squeezer>,
        committed: &[Arc<Committed>],
        ordered: &[&str],
    ) -> Vec<Issue> {
        let started = Instant::now();

        let defs = match load_defs(options) {
            Ok(defs) => defs,
            Err(issue) => return vec![issue],
        };

        let parents: Vec<Arc<CheckerSnapshot>> = committed.iter().filter_map(|c| c.checker.clone()).collect();
        let pool = self.pool.clone().unwrap_or_else(shared_pool);

        let InstanceState { units, checker, .. } = state;
        let checker = checker.get_or_insert_with(|| Typechecker::new(&parents, pool));

        let files: Vec<CheckFile<'_>> = ordered
            .iter()
            .filter_map(|path| {
                let unit = units.get(*path)?;
                Some(CheckFile {
                    path: unit.path(),
                    revision: unit.revision(),
                    source: unit.ast.as_deref()?,
                    imports: unit.imports.as_ref()?,
                })
            })
            .collect();

        let result = checker.check(CheckRequest {
            parents: &parents,
            model,
            squeezer,
            defs: &defs,
            files: &files,
            generator: self.toolchain.generator.as_ref(),
            options,
        });

        if let Err((path, err)) = result {
            if let Some(unit) = units.get_mut(&path) {
                unit.fail(Stage::Generate, err.into());
            }
        }

        stage_finished(options, "typecheck", ordered.len(), started);
        Vec::new()
    }

    /// With a squeezer, files are generated one at a time in final order so
    /// that token allocation is deterministic.
    fn generate(
        &self,
        state: &mut InstanceState,
        options: &CompilerOptions,
        model: &Model,
        squeezer: Option<&Squeezer>,
        language: OutputLanguage,
        ordered: &[&str],
    ) {
        let started = Instant::now();
        let context = GenerateContext {
            toolchain: &self.toolchain,
            model,
            squeezer,
            options,
            language,
        };

        let mut count = 0;
        if squeezer.is_some() {
            for path in ordered {
                if let Some(unit) = state.units.get_mut(*path).filter(|unit| unit.needs(Stage::Generate)) {
                    generate_unit(unit, &context);
                    count += 1;
                }
            }
        } else {
            let pending: Vec<&mut CompileUnit> = state
                .units
                .values_mut()
                .filter(|unit| unit.needs(Stage::Generate))
                .collect();
            count = pending.len();
            pending.into_par_iter().for_each(|unit| generate_unit(unit, &context));
        }

        stage_finished(options, "generate", count, started);
    }
}

struct GenerateContext<'a> {
    toolchain: &'a Toolchain,
    model: &'a Model,
    squeezer: Option<&'a Squeezer>,
    options: &'a CompilerOptions,
    language: OutputLanguage,
}

fn generate_unit(unit: &mut CompileUnit, context: &GenerateContext<'_>) {
    let (Some(source), Some(imports)) = (unit.ast.clone(), unit.imports.clone()) else {
        return;
    };
    let path = unit.path().to_string();

    let result = context
        .toolchain
        .generator
        .generate(GenerateRequest {
            path: &path,
            source: &source,
            imports: &imports,
            model: context.model,
            squeezer: context.squeezer,
            options: context.options,
            language: context.language,
        })
        .map_err(FileError::from)
        .and_then(|generated| run_after_compile(&path, generated, context.options.after_compile()));

    match result {
        Ok(generated) => {
            unit.generated = Some(generated);
            unit.apply(Transition::Completed(Stage::Generate));
            debug!(path = %path, "generated");
        }
        Err(err) => unit.fail(Stage::Generate, err),
    }
}

fn run_before_compile(path: &str, source: &Arc<str>, hook: Option<&Hook>) -> Result<(Arc<str>, Vec<Issue>), FileError> {
    let Some(hook) = hook else {
        return Ok((source.clone(), Vec::new()));
    };

    let lines = source.split('\n').map(str::to_string).collect();
    let mut file = CallbackFile::new(path, lines, Vec::new());
    hook.call(&mut file)?;

    let (lines, warnings) = file.into_parts();
    Ok((Arc::from(lines.join("\n")), warnings))
}

fn run_after_compile(path: &str, generated: Generated, hook: Option<&Hook>) -> Result<Generated, FileError> {
    let Some(hook) = hook else {
        return Ok(generated);
    };

    let mut file = CallbackFile::new(path, generated.lines, generated.warnings);
    hook.call(&mut file)?;

    let (lines, warnings) = file.into_parts();
    Ok(Generated { lines, warnings })
}

fn load_defs(options: &CompilerOptions) -> Result<Vec<DefsFile>, Issue> {
    options
        .defs()
        .iter()
        .map(|file| {
            let text = match &file.contents {
                Some(contents) => contents.clone(),
                None => fs::read_to_string(&file.path).map_err(|err| {
                    let error = FileError::Read {
                        path: file.path.clone(),
                        message: err.to_string(),
                    };
                    error.to_issue(&file.path)
                })?,
            };
            Ok(DefsFile {
                path: file.path.clone(),
                text: Arc::from(text),
            })
        })
        .collect()
}

fn stage_finished(options: &CompilerOptions, stage: &'static str, files: usize, started: Instant) {
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    if options.dev_print_log() {
        info!(stage, files, elapsed_ms, "stage finished");
    } else {
        debug!(stage, files, elapsed_ms, "stage finished");
    }
}
