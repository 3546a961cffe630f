//! Type checker worker pool
//!
//! A fixed set of long-lived worker threads, each owning one [`TypeWorker`]
//! backend. A check is split into one job per worker; every worker sees
//! all entries but only reports diagnostics for the files it is assigned.
//! Workers keep state between jobs, so a file that stays on the same worker
//! is cheap to re-check.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

use nyx_ast::LineIndex;
use nyx_lexer::{Lexer, TokenKind};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::PoolStartedError;

pub const DEFAULT_WORKERS: usize = 4;

/// One file as seen by the workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckEntry {
    pub key: String,
    pub text: Arc<str>,
    /// Bumped whenever `text` changes
    pub version: u64,
    pub is_defs: bool,
}

/// A diagnostic reported against an entry key. Lines are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub key: String,
    pub line: usize,
    pub column: usize,
    pub code: u32,
    pub message: String,
}

/// The work handed to a single worker.
#[derive(Debug, Clone)]
pub struct CheckJob {
    pub checker_id: u64,
    pub group_id: u64,
    pub entries: Arc<Vec<CheckEntry>>,
    /// Keys this worker reports diagnostics for
    pub active: Vec<String>,
    /// Compiler settings for the backend, as a TypeScript options object
    pub settings: Arc<Value>,
}

/// A type checking backend hosted by one worker thread.
pub trait TypeWorker: Send {
    fn check(&mut self, job: &CheckJob) -> Vec<Diagnostic>;
}

struct Request {
    job: CheckJob,
    reply: Sender<Vec<Diagnostic>>,
}

pub struct TypecheckPool {
    senders: Vec<Mutex<Sender<Request>>>,
    handles: Vec<JoinHandle<()>>,
}

impl TypecheckPool {
    /// Starts `workers` threads, each with a backend made by `factory`.
    pub fn new<F>(workers: usize, factory: F) -> Self
    where
        F: Fn() -> Box<dyn TypeWorker>,
    {
        let workers = workers.max(1);
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for index in 0..workers {
            let (sender, receiver) = mpsc::channel::<Request>();
            let backend = factory();
            handles.push(thread::spawn(move || run_worker(index, backend, receiver)));
            senders.push(Mutex::new(sender));
        }

        debug!(workers, "started type checker pool");
        Self { senders, handles }
    }

    pub fn worker_count(&self) -> usize {
        self.senders.len()
    }

    /// Sends each job to its worker and waits for every reply.
    pub fn run(&self, jobs: Vec<(usize, CheckJob)>) -> Vec<Diagnostic> {
        let pending: Vec<Receiver<Vec<Diagnostic>>> = jobs
            .into_iter()
            .filter_map(|(worker, job)| {
                let (reply, receiver) = mpsc::channel();
                let sender = self.senders.get(worker % self.senders.len())?;
                sender.lock().send(Request { job, reply }).ok()?;
                Some(receiver)
            })
            .collect();

        pending
            .into_iter()
            .flat_map(|receiver| receiver.recv().unwrap_or_default())
            .collect()
    }
}

impl Drop for TypecheckPool {
    fn drop(&mut self) {
        // Closing the channels ends the worker loops
        self.senders.clear();
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn run_worker(index: usize, mut backend: Box<dyn TypeWorker>, requests: Receiver<Request>) {
    while let Ok(Request { job, reply }) = requests.recv() {
        trace!(worker = index, checker = job.checker_id, active = job.active.len(), "type check job");
        let diagnostics = backend.check(&job);
        let _ = reply.send(diagnostics);
    }
}

// =============================================================================
// Shared pool
// =============================================================================

struct PoolConfig {
    include_in_results: bool,
    workers: usize,
}

static POOL_CONFIG: Mutex<PoolConfig> = parking_lot::const_mutex(PoolConfig {
    include_in_results: true,
    workers: DEFAULT_WORKERS,
});
static POOL_STARTED: AtomicBool = AtomicBool::new(false);
static SHARED_POOL: OnceLock<Arc<TypecheckPool>> = OnceLock::new();

/// Sets the size of the process-wide pool and whether type checker
/// warnings are part of compile results. Only allowed before the pool
/// first starts.
pub fn configure_shared_pool(include_in_results: bool, workers: usize) -> Result<(), PoolStartedError> {
    let mut config = POOL_CONFIG.lock();
    if POOL_STARTED.load(Ordering::SeqCst) {
        return Err(PoolStartedError);
    }
    config.include_in_results = include_in_results;
    config.workers = if workers == 0 { DEFAULT_WORKERS } else { workers };
    Ok(())
}

/// The process-wide pool, started on first use.
pub fn shared_pool() -> Arc<TypecheckPool> {
    SHARED_POOL
        .get_or_init(|| {
            let config = POOL_CONFIG.lock();
            POOL_STARTED.store(true, Ordering::SeqCst);
            Arc::new(TypecheckPool::new(config.workers, || {
                Box::new(DeclarationCheck::default())
            }))
        })
        .clone()
}

pub fn include_in_results() -> bool {
    POOL_CONFIG.lock().include_in_results
}

// =============================================================================
// Reference backend
// =============================================================================

/// Names every JavaScript environment provides.
const GLOBAL_NAMES: &[&str] = &[
    "AbortController", "AggregateError", "Array", "ArrayBuffer", "BigInt", "Boolean", "DataView",
    "Date", "Error", "EvalError", "Event", "EventTarget", "FinalizationRegistry", "Float32Array",
    "Float64Array", "Function", "Int16Array", "Int32Array", "Int8Array", "Intl", "Map", "Number",
    "Object", "Promise", "Proxy", "RangeError", "ReferenceError", "RegExp", "Set", "SharedArrayBuffer",
    "String", "Symbol", "SyntaxError", "TextDecoder", "TextEncoder", "TypeError", "URIError", "URL",
    "Uint16Array", "Uint32Array", "Uint8Array", "Uint8ClampedArray", "WeakMap", "WeakRef", "WeakSet",
];

/// Reports `new X` and `extends X` where `X` is declared by no entry.
///
/// Declared names are cached per checker and entry version, so unchanged
/// entries are not lexed again.
#[derive(Debug, Default)]
pub struct DeclarationCheck {
    declared: FxHashMap<(u64, String), (u64, Arc<Vec<String>>)>,
}

impl DeclarationCheck {
    fn declared_in(&mut self, checker_id: u64, entry: &CheckEntry) -> Arc<Vec<String>> {
        let key = (checker_id, entry.key.clone());
        if let Some((version, names)) = self.declared.get(&key) {
            if *version == entry.version {
                return names.clone();
            }
        }

        let names = Arc::new(declared_names(&entry.text));
        self.declared.insert(key, (entry.version, names.clone()));
        names
    }
}

impl TypeWorker for DeclarationCheck {
    fn check(&mut self, job: &CheckJob) -> Vec<Diagnostic> {
        let mut known: FxHashSet<String> = GLOBAL_NAMES.iter().map(|name| name.to_string()).collect();
        for entry in job.entries.iter() {
            known.extend(self.declared_in(job.checker_id, entry).iter().cloned());
        }

        let mut diagnostics = Vec::new();
        for key in &job.active {
            let Some(entry) = job.entries.iter().find(|entry| &entry.key == key) else {
                continue;
            };
            diagnostics.extend(undeclared_references(entry, &known));
        }
        diagnostics
    }
}

fn declared_names(text: &str) -> Vec<String> {
    let tokens = Lexer::new(text).tokenize();
    let mut names = Vec::new();
    let mut in_import = false;

    for (i, token) in tokens.iter().enumerate() {
        let next = tokens.get(i + 1);
        match token.kind {
            TokenKind::Import => in_import = true,
            TokenKind::RBrace | TokenKind::Semicolon if in_import => in_import = false,
            TokenKind::Identifier if in_import => names.push(token.value.clone()),
            TokenKind::Class | TokenKind::Function | TokenKind::Let | TokenKind::Const | TokenKind::Var | TokenKind::Type => {
                if let Some(next) = next.filter(|next| next.kind.is_identifier_like()) {
                    names.push(next.value.clone());
                }
            }
            TokenKind::Identifier if token.value == "interface" || token.value == "enum" => {
                if let Some(next) = next.filter(|next| next.kind == TokenKind::Identifier) {
                    names.push(next.value.clone());
                }
            }
            _ => {}
        }
    }

    names
}

fn undeclared_references(entry: &CheckEntry, known: &FxHashSet<String>) -> Vec<Diagnostic> {
    let tokens = Lexer::new(&entry.text).tokenize();
    let line_index = LineIndex::new(&entry.text);

    tokens
        .windows(2)
        .filter(|pair| matches!(pair[0].kind, TokenKind::New | TokenKind::Extends))
        .map(|pair| &pair[1])
        .filter(|name| name.kind == TokenKind::Identifier && !known.contains(&name.value))
        .map(|name| {
            let (line, column) = line_index.line_col(name.span.start);
            Diagnostic {
                key: entry.key.clone(),
                line,
                column,
                code: 2304,
                message: format!("Cannot find name '{}'.", name.value),
            }
        })
        .collect()
}
