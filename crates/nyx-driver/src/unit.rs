//! Per-file compilation state
//!
//! A [`CompileUnit`] lives across `compile()` calls, keyed by path. Its
//! staleness is four ordered "needs" bits changed only through
//! [`CompileUnit::apply`]: setting a stage also sets every later stage and
//! discards the artifacts those stages produced.

use std::fs;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use bitflags::bitflags;
use nyx_parser::ParsedSource;
use xxhash_rust::xxh64::xxh64;

use crate::error::FileError;
use crate::frontend::{FileDeclarations, Generated};
use crate::issue::Issue;
use crate::options::SourceFile;
use crate::resolver::ImportTable;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Stale: u8 {
        const PREPROCESS = 1 << 0;
        const PARSE = 1 << 1;
        const BUILD = 1 << 2;
        const GENERATE = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Preprocess,
    Parse,
    Build,
    Generate,
}

impl Stage {
    fn flag(self) -> Stale {
        match self {
            Stage::Preprocess => Stale::PREPROCESS,
            Stage::Parse => Stale::PARSE,
            Stage::Build => Stale::BUILD,
            Stage::Generate => Stale::GENERATE,
        }
    }

    /// This stage and every stage after it.
    fn and_later(self) -> Stale {
        match self {
            Stage::Preprocess => Stale::all(),
            Stage::Parse => Stale::PARSE | Stale::BUILD | Stale::GENERATE,
            Stage::Build => Stale::BUILD | Stale::GENERATE,
            Stage::Generate => Stale::GENERATE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// New source text. Without a `before-compile` hook there is nothing to
    /// preprocess, so the unit goes straight to needing a parse.
    ContentChanged { has_hook: bool },
    Invalidate(Stage),
    Completed(Stage),
    /// Parse and build failures both force a fresh parse.
    Failed(Stage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    hash: u64,
    time: Option<u64>,
}

#[derive(Debug)]
pub struct CompileUnit {
    path: String,
    stale: Stale,
    /// Bumped whenever generated output is discarded
    revision: u64,
    fingerprint: Option<Fingerprint>,
    source: Option<Arc<str>>,

    pub(crate) text: Option<Arc<str>>,
    pub(crate) preprocess_warnings: Vec<Issue>,
    pub(crate) ast: Option<Arc<ParsedSource>>,
    pub(crate) declarations: Option<Arc<FileDeclarations>>,
    pub(crate) imports: Option<ImportTable>,
    pub(crate) generated: Option<Generated>,
    pub(crate) error: Option<FileError>,
}

impl CompileUnit {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stale: Stale::all(),
            revision: 0,
            fingerprint: None,
            source: None,
            text: None,
            preprocess_warnings: Vec::new(),
            ast: None,
            declarations: None,
            imports: None,
            generated: None,
            error: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn stale(&self) -> Stale {
        self.stale
    }

    pub fn needs(&self, stage: Stage) -> bool {
        self.stale.contains(stage.flag())
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn source(&self) -> Option<&Arc<str>> {
        self.source.as_ref()
    }

    pub fn error(&self) -> Option<&FileError> {
        self.error.as_ref()
    }

    /// The single place where staleness changes.
    pub fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::ContentChanged { has_hook: true } => self.invalidate(Stage::Preprocess),
            Transition::ContentChanged { has_hook: false } => {
                self.invalidate(Stage::Parse);
                self.stale.remove(Stale::PREPROCESS);
                self.text = self.source.clone();
                self.preprocess_warnings.clear();
            }
            Transition::Invalidate(stage) => self.invalidate(stage),
            Transition::Completed(stage) => self.stale.remove(stage.flag()),
            Transition::Failed(Stage::Preprocess) => self.invalidate(Stage::Preprocess),
            Transition::Failed(Stage::Parse | Stage::Build) => self.invalidate(Stage::Parse),
            Transition::Failed(Stage::Generate) => self.invalidate(Stage::Generate),
        }
    }

    fn invalidate(&mut self, stage: Stage) {
        let flags = stage.and_later();
        self.stale |= flags;

        if flags.contains(Stale::PREPROCESS) {
            self.text = None;
            self.preprocess_warnings.clear();
        }
        if flags.contains(Stale::PARSE) {
            self.ast = None;
        }
        if flags.contains(Stale::BUILD) {
            self.declarations = None;
        }
        if flags.contains(Stale::GENERATE) {
            self.generated = None;
            self.revision += 1;
        }
    }

    /// Records a failure at `stage`.
    pub(crate) fn fail(&mut self, stage: Stage, error: FileError) {
        self.apply(Transition::Failed(stage));
        self.error = Some(error);
    }

    pub(crate) fn clear_error(&mut self) {
        self.error = None;
    }

    /// Picks up new contents for this unit, either supplied inline or read
    /// from disk. Files on disk are only re-read when their modification
    /// time changes.
    pub fn update(&mut self, file: &SourceFile, has_hook: bool) {
        let (contents, time) = match &file.contents {
            Some(contents) => (contents.clone(), file.time),
            None => match self.read_from_disk() {
                Ok(Some(read)) => read,
                Ok(None) => return,
                Err(err) => {
                    self.fingerprint = None;
                    self.source = None;
                    self.fail(Stage::Preprocess, err);
                    return;
                }
            },
        };

        let hash = xxh64(contents.as_bytes(), 0);
        if let Some(fingerprint) = &mut self.fingerprint {
            if fingerprint.hash == hash && self.source.is_some() {
                fingerprint.time = time;
                return;
            }
        }

        self.fingerprint = Some(Fingerprint { hash, time });
        self.source = Some(Arc::from(contents));
        self.apply(Transition::ContentChanged { has_hook });
    }

    fn read_from_disk(&self) -> Result<Option<(String, Option<u64>)>, FileError> {
        let read_error = |err: std::io::Error| FileError::Read {
            path: self.path.clone(),
            message: err.to_string(),
        };

        let metadata = fs::metadata(&self.path).map_err(read_error)?;
        let time = metadata
            .modified()
            .ok()
            .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_millis() as u64);

        if let (Some(fingerprint), Some(time)) = (&self.fingerprint, time) {
            if fingerprint.time == Some(time) && self.source.is_some() {
                return Ok(None);
            }
        }

        let contents = fs::read_to_string(&self.path).map_err(read_error)?;
        Ok(Some((contents, time)))
    }

    /// Every warning this unit currently carries.
    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.preprocess_warnings
            .iter()
            .chain(self.generated.iter().flat_map(|generated| generated.warnings.iter()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(has_hook: bool) -> CompileUnit {
        let mut unit = CompileUnit::new("a.nx");
        unit.update(&SourceFile::new("a.nx", "let a = 1;"), has_hook);
        unit
    }

    #[test]
    fn test_new_unit_needs_everything() {
        let unit = CompileUnit::new("a.nx");
        assert_eq!(unit.stale(), Stale::all());
    }

    #[test]
    fn test_content_change_without_hook_skips_preprocess() {
        let unit = loaded(false);
        assert!(!unit.needs(Stage::Preprocess));
        assert!(unit.needs(Stage::Parse));
        assert_eq!(unit.text.as_deref(), Some("let a = 1;"));
    }

    #[test]
    fn test_content_change_with_hook() {
        let unit = loaded(true);
        assert!(unit.needs(Stage::Preprocess));
        assert!(unit.text.is_none());
    }

    #[test]
    fn test_unchanged_contents_keep_state() {
        let mut unit = loaded(false);
        for stage in [Stage::Parse, Stage::Build, Stage::Generate] {
            unit.apply(Transition::Completed(stage));
        }
        assert!(unit.stale().is_empty());

        unit.update(&SourceFile::new("a.nx", "let a = 1;"), false);
        assert!(unit.stale().is_empty());

        unit.update(&SourceFile::new("a.nx", "let a = 2;"), false);
        assert_eq!(unit.stale(), Stale::PARSE | Stale::BUILD | Stale::GENERATE);
    }

    #[test]
    fn test_invalidation_cascades() {
        let mut unit = loaded(false);
        for stage in [Stage::Parse, Stage::Build, Stage::Generate] {
            unit.apply(Transition::Completed(stage));
        }
        unit.generated = Some(Generated::default());
        let revision = unit.revision();

        unit.apply(Transition::Invalidate(Stage::Build));
        assert_eq!(unit.stale(), Stale::BUILD | Stale::GENERATE);
        assert!(unit.generated.is_none());
        assert_eq!(unit.revision(), revision + 1);
    }

    #[test]
    fn test_build_failure_forces_parse() {
        let mut unit = loaded(false);
        unit.apply(Transition::Completed(Stage::Parse));
        unit.fail(
            Stage::Build,
            FileError::Build(crate::error::BuildError::new("Duplicate declaration of 'A'", 1, 0)),
        );
        assert!(unit.needs(Stage::Parse));
        assert!(unit.ast.is_none());
        assert!(unit.error().is_some());
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let mut unit = CompileUnit::new("/nonexistent/nyx/file.nx");
        unit.update(&SourceFile::on_disk("/nonexistent/nyx/file.nx"), false);
        assert!(matches!(unit.error(), Some(FileError::Read { .. })));
        assert!(unit.needs(Stage::Preprocess));
    }
}
