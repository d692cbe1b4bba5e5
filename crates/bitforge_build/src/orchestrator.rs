//! Per-group build driver.
//!
//! A build moves through [`Phase::ExtractDeps`], [`Phase::CompileUnits`] and
//! [`Phase::Link`] before reaching [`Phase::Done`]. Phases with nothing
//! stale are passed through without running anything, so a group whose
//! sources, headers and module are all current goes straight to `Done`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use bitforge_cache::fs::remove_if_exists;
use bitforge_cache::{BuildStamp, RecordStore};
use bitforge_common::{HeaderSet, SourceFile};
use bitforge_config::ResolvedGroup;
use bitforge_toolchain::Toolchain;

use crate::compile::UnitCompiler;
use crate::discover::discover_sources;
use crate::error::BuildError;
use crate::extract::DependencyExtractor;
use crate::graph::{BuildGraph, GraphRun, Task};
use crate::link::ModuleLinker;
use crate::report::{BuildReport, Phase};

/// Suffixes of files the pipeline keeps per unit in the object directory.
/// Longer suffixes come first so the unit name is split off correctly.
const UNIT_SUFFIXES: &[&str] = &[
    ".bc.stamp.tmp",
    ".dep.stamp.tmp",
    ".bc.stamp",
    ".dep.stamp",
    ".bc.tmp",
    ".dep.tmp",
    ".bc",
    ".dep",
];

/// Drives one build group through extraction, compilation and linking.
pub struct Orchestrator<'a> {
    group: &'a ResolvedGroup,
    toolchain: &'a dyn Toolchain,
}

impl<'a> Orchestrator<'a> {
    /// Creates a driver for `group` issuing tool runs through `toolchain`.
    pub fn new(group: &'a ResolvedGroup, toolchain: &'a dyn Toolchain) -> Self {
        Self { group, toolchain }
    }

    /// Brings the group's objects and module up to date.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let sources = discover_sources(self.group)?;
        self.prepare_output_dir()?;
        let pruned = self.prune_orphans(&sources)?;

        let mut report = BuildReport {
            group: self.group.name.clone(),
            sources: sources.len(),
            pruned,
            ..Default::default()
        };

        if sources.is_empty() {
            if !self.group.skip_link {
                self.remove_module()?;
            }
            report.phases.push(Phase::Done);
            tracing::info!(group = %self.group.name, "no sources");
            return Ok(report);
        }

        let extractor = DependencyExtractor::new(self.group, self.toolchain);
        let compiler = UnitCompiler::new(self.group, self.toolchain);
        let linker = ModuleLinker::new(self.group, self.toolchain);

        let mut graph = BuildGraph::new();
        let mut compile_nodes = Vec::with_capacity(sources.len());
        for source in &sources {
            let extract = graph.add_task(ExtractTask {
                extractor: &extractor,
                source,
            });
            let compile = graph.add_task(CompileTask {
                compiler: &compiler,
                source,
            });
            graph.add_dependency(extract, compile);
            compile_nodes.push(compile);
        }
        if !self.group.skip_link {
            let link = graph.add_task(LinkTask {
                linker: &linker,
                label: self.group.name.clone(),
                force: !report.pruned.is_empty(),
            });
            for &compile in &compile_nodes {
                graph.add_dependency(compile, link);
            }
            report.module = Some(self.group.module_path.clone());
        }

        let run = graph.execute(&self.pool()?)?;
        fill_report(&mut report, &run);
        tracing::info!(
            group = %self.group.name,
            extracted = report.extracted.len(),
            compiled = report.compiled.len(),
            linked = report.linked,
            up_to_date = run.up_to_date,
            "group finished"
        );
        Ok(report)
    }

    /// Refreshes stale dependency records without compiling or linking.
    ///
    /// Returns the names of the units whose records were rewritten.
    pub fn extract_dependencies(&self) -> Result<Vec<String>, BuildError> {
        let sources = discover_sources(self.group)?;
        self.prepare_output_dir()?;

        let extractor = DependencyExtractor::new(self.group, self.toolchain);
        let mut graph = BuildGraph::new();
        for source in &sources {
            graph.add_task(ExtractTask {
                extractor: &extractor,
                source,
            });
        }
        let run = graph.execute(&self.pool()?)?;
        Ok(run.executed_in(Phase::ExtractDeps))
    }

    /// Lists every source of the group with its stored header set, or `None`
    /// where no record exists yet. Runs no tools.
    pub fn recorded_dependencies(&self) -> Result<Vec<(SourceFile, Option<HeaderSet>)>, BuildError> {
        let records = RecordStore::new(&self.group.obj_dir);
        Ok(discover_sources(self.group)?
            .into_iter()
            .map(|source| {
                let headers = records.load(&source);
                (source, headers)
            })
            .collect())
    }

    /// Deletes the group's object directory and module.
    ///
    /// Returns `true` if anything was removed.
    pub fn clean(&self) -> Result<bool, BuildError> {
        let mut removed = false;
        let obj_dir = &self.group.obj_dir;
        if obj_dir.exists() {
            std::fs::remove_dir_all(obj_dir).map_err(|e| BuildError::io(obj_dir, e))?;
            removed = true;
        }
        removed |= self.remove_module()?;
        Ok(removed)
    }

    fn prepare_output_dir(&self) -> Result<(), BuildError> {
        std::fs::create_dir_all(&self.group.obj_dir)
            .map_err(|e| BuildError::io(&self.group.obj_dir, e))
    }

    fn pool(&self) -> Result<rayon::ThreadPool, BuildError> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.group.jobs.unwrap_or(0))
            .thread_name(|i| format!("bitforge-worker-{i}"))
            .build()
            .map_err(|e| BuildError::Pool(e.to_string()))
    }

    fn remove_module(&self) -> Result<bool, BuildError> {
        let module = &self.group.module_path;
        let removed = remove_if_exists(module)?;
        BuildStamp::invalidate(module)?;
        Ok(removed)
    }

    /// Removes objects and object stamps whose unit no longer has a source,
    /// plus any leftover scratch file. Dependency records of removed units
    /// stay until `clean`. Returns the sorted names of units whose object
    /// was removed.
    fn prune_orphans(&self, sources: &[SourceFile]) -> Result<Vec<String>, BuildError> {
        let live: HashSet<&str> = sources.iter().map(SourceFile::name).collect();
        let dir = &self.group.obj_dir;
        let entries = std::fs::read_dir(dir).map_err(|e| BuildError::io(dir, e))?;

        let mut pruned = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| BuildError::io(dir, e))?.path();
            let Some((unit, suffix)) = split_unit(&path) else {
                continue;
            };
            let orphan_object = !live.contains(unit.as_str()) && suffix.starts_with(".bc");
            if !orphan_object && !suffix.ends_with(".tmp") {
                continue;
            }
            remove_if_exists(&path)?;
            tracing::debug!(file = %path.display(), "removed leftover output");
            if orphan_object && !pruned.contains(&unit) {
                pruned.push(unit);
            }
        }
        pruned.sort();
        if !pruned.is_empty() {
            tracing::info!(group = %self.group.name, units = ?pruned, "pruned outputs of removed sources");
        }
        Ok(pruned)
    }
}

fn split_unit(path: &Path) -> Option<(String, &'static str)> {
    if !path.is_file() {
        return None;
    }
    let name = path.file_name()?.to_str()?;
    UNIT_SUFFIXES.iter().find_map(|suffix| {
        name.strip_suffix(suffix)
            .filter(|unit| !unit.is_empty())
            .map(|unit| (unit.to_string(), *suffix))
    })
}

fn fill_report(report: &mut BuildReport, run: &GraphRun) {
    report.extracted = run.executed_in(Phase::ExtractDeps);
    report.compiled = run.executed_in(Phase::CompileUnits);
    report.linked = !run.executed_in(Phase::Link).is_empty();
    for phase in [Phase::ExtractDeps, Phase::CompileUnits, Phase::Link] {
        if run.executed.iter().any(|(p, _)| *p == phase) {
            report.phases.push(phase);
        }
    }
    report.phases.push(Phase::Done);
}

struct ExtractTask<'t, 'a> {
    extractor: &'t DependencyExtractor<'a>,
    source: &'t SourceFile,
}

impl Task for ExtractTask<'_, '_> {
    fn phase(&self) -> Phase {
        Phase::ExtractDeps
    }

    fn label(&self) -> &str {
        self.source.name()
    }

    fn is_current(&self) -> Result<bool, BuildError> {
        Ok(self.extractor.is_current(self.source))
    }

    fn run(&self) -> Result<(), BuildError> {
        self.extractor.extract(self.source).map(drop)
    }
}

struct CompileTask<'t, 'a> {
    compiler: &'t UnitCompiler<'a>,
    source: &'t SourceFile,
}

impl Task for CompileTask<'_, '_> {
    fn phase(&self) -> Phase {
        Phase::CompileUnits
    }

    fn label(&self) -> &str {
        self.source.name()
    }

    fn is_current(&self) -> Result<bool, BuildError> {
        Ok(self.compiler.is_current(self.source))
    }

    fn run(&self) -> Result<(), BuildError> {
        self.compiler.compile(self.source).map(drop)
    }
}

struct LinkTask<'t, 'a> {
    linker: &'t ModuleLinker<'a>,
    label: String,
    force: bool,
}

impl Task for LinkTask<'_, '_> {
    fn phase(&self) -> Phase {
        Phase::Link
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn is_current(&self) -> Result<bool, BuildError> {
        if self.force {
            return Ok(false);
        }
        let objects = self.linker.collect_objects()?;
        Ok(self.linker.is_current(&objects))
    }

    fn run(&self) -> Result<(), BuildError> {
        let objects: Vec<PathBuf> = self.linker.collect_objects()?;
        self.linker.link(&objects).map(drop)
    }
}
