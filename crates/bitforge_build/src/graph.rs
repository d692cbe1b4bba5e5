//! Layered execution of build steps.
//!
//! Steps are nodes of a DAG; an edge `a -> b` means `b` consumes what `a`
//! produces. Nodes are grouped into layers by longest distance from a root,
//! and each layer runs on a worker pool once the previous layer finished.
//!
//! A node runs when it reports itself stale or when any predecessor ran in
//! this build. Every node of a layer completes before the first failure (in
//! node order) is returned, and no later layer starts after a failure.

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use rayon::prelude::*;

use crate::error::BuildError;
use crate::report::Phase;

/// One build step.
pub trait Task: Sync {
    /// Phase this step belongs to.
    fn phase(&self) -> Phase;

    /// Name shown in logs and reports.
    fn label(&self) -> &str;

    /// Returns `true` if the step's outputs already match its inputs.
    fn is_current(&self) -> Result<bool, BuildError>;

    /// Performs the step.
    fn run(&self) -> Result<(), BuildError>;
}

/// Steps that ran during one [`BuildGraph::execute`], in completion order
/// per layer.
#[derive(Debug, Default)]
pub struct GraphRun {
    /// `(phase, label)` of every step that ran.
    pub executed: Vec<(Phase, String)>,
    /// Number of steps found current.
    pub up_to_date: usize,
}

impl GraphRun {
    /// Labels of steps that ran in `phase`, sorted.
    pub fn executed_in(&self, phase: Phase) -> Vec<String> {
        let mut labels: Vec<String> = self
            .executed
            .iter()
            .filter(|(p, _)| *p == phase)
            .map(|(_, label)| label.clone())
            .collect();
        labels.sort();
        labels
    }
}

enum Outcome {
    UpToDate,
    Executed,
}

/// A DAG of build steps.
pub struct BuildGraph<'a> {
    graph: DiGraph<Box<dyn Task + 'a>, ()>,
}

impl Default for BuildGraph<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> BuildGraph<'a> {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
        }
    }

    /// Adds a step.
    pub fn add_task(&mut self, task: impl Task + 'a) -> NodeIndex {
        self.graph.add_node(Box::new(task))
    }

    /// Declares that `after` consumes the output of `before`.
    pub fn add_dependency(&mut self, before: NodeIndex, after: NodeIndex) {
        self.graph.add_edge(before, after, ());
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns `true` if the graph has no steps.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Groups nodes into layers; every edge goes from an earlier layer to a
    /// later one.
    pub fn layers(&self) -> Result<Vec<Vec<NodeIndex>>, BuildError> {
        let order = toposort(&self.graph, None).map_err(|_| BuildError::Cycle)?;
        let mut depth = vec![0usize; self.graph.node_count()];
        for &node in &order {
            depth[node.index()] = self
                .graph
                .neighbors_directed(node, Direction::Incoming)
                .map(|pred| depth[pred.index()] + 1)
                .max()
                .unwrap_or(0);
        }
        let height = depth.iter().copied().max().map_or(0, |d| d + 1);
        let mut layers = vec![Vec::new(); height];
        for node in self.graph.node_indices() {
            layers[depth[node.index()]].push(node);
        }
        Ok(layers)
    }

    /// Runs every stale step on `pool`, layer by layer.
    pub fn execute(&self, pool: &rayon::ThreadPool) -> Result<GraphRun, BuildError> {
        let mut run = GraphRun::default();
        let mut executed: HashSet<NodeIndex> = HashSet::new();

        for layer in self.layers()? {
            let results: Vec<(NodeIndex, Result<Outcome, BuildError>)> = pool.install(|| {
                layer
                    .par_iter()
                    .map(|&node| (node, self.visit(node, &executed)))
                    .collect()
            });

            let mut first_error = None;
            for (node, result) in results {
                let task = &self.graph[node];
                match result {
                    Ok(Outcome::Executed) => {
                        executed.insert(node);
                        run.executed.push((task.phase(), task.label().to_string()));
                    }
                    Ok(Outcome::UpToDate) => run.up_to_date += 1,
                    Err(e) => {
                        tracing::error!(step = task.label(), phase = %task.phase(), "{e}");
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        Ok(run)
    }

    fn visit(&self, node: NodeIndex, executed: &HashSet<NodeIndex>) -> Result<Outcome, BuildError> {
        let task = &self.graph[node];
        let forced = self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .any(|pred| executed.contains(&pred));
        if !forced && task.is_current()? {
            tracing::trace!(step = task.label(), phase = %task.phase(), "up to date");
            return Ok(Outcome::UpToDate);
        }
        tracing::info!(step = task.label(), phase = %task.phase(), "running");
        task.run()?;
        Ok(Outcome::Executed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Step<'a> {
        label: String,
        phase: Phase,
        current: bool,
        fail: bool,
        log: &'a Mutex<Vec<String>>,
        runs: &'a AtomicUsize,
    }

    impl Task for Step<'_> {
        fn phase(&self) -> Phase {
            self.phase
        }
        fn label(&self) -> &str {
            &self.label
        }
        fn is_current(&self) -> Result<bool, BuildError> {
            Ok(self.current)
        }
        fn run(&self) -> Result<(), BuildError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(self.label.clone());
            if self.fail {
                Err(BuildError::io(&self.label, std::io::Error::other("injected")))
            } else {
                Ok(())
            }
        }
    }

    fn pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap()
    }

    fn step<'a>(
        label: &str,
        phase: Phase,
        current: bool,
        log: &'a Mutex<Vec<String>>,
        runs: &'a AtomicUsize,
    ) -> Step<'a> {
        Step {
            label: label.to_string(),
            phase,
            current,
            fail: false,
            log,
            runs,
        }
    }

    #[test]
    fn layers_follow_edges() {
        let log = Mutex::new(Vec::new());
        let runs = AtomicUsize::new(0);
        let mut g = BuildGraph::new();
        let a = g.add_task(step("a", Phase::ExtractDeps, false, &log, &runs));
        let b = g.add_task(step("b", Phase::CompileUnits, false, &log, &runs));
        let c = g.add_task(step("c", Phase::Link, false, &log, &runs));
        let d = g.add_task(step("d", Phase::ExtractDeps, false, &log, &runs));
        g.add_dependency(a, b);
        g.add_dependency(b, c);
        g.add_dependency(d, c);
        assert_eq!(g.layers().unwrap(), vec![vec![a, d], vec![b], vec![c]]);
    }

    #[test]
    fn current_steps_are_skipped() {
        let log = Mutex::new(Vec::new());
        let runs = AtomicUsize::new(0);
        let mut g = BuildGraph::new();
        let a = g.add_task(step("a", Phase::ExtractDeps, true, &log, &runs));
        let b = g.add_task(step("b", Phase::CompileUnits, true, &log, &runs));
        g.add_dependency(a, b);
        let run = g.execute(&pool()).unwrap();
        assert!(run.executed.is_empty());
        assert_eq!(run.up_to_date, 2);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stale_predecessor_forces_successor() {
        let log = Mutex::new(Vec::new());
        let runs = AtomicUsize::new(0);
        let mut g = BuildGraph::new();
        let a = g.add_task(step("a", Phase::ExtractDeps, false, &log, &runs));
        let b = g.add_task(step("b", Phase::CompileUnits, true, &log, &runs));
        g.add_task(step("c", Phase::CompileUnits, true, &log, &runs));
        g.add_dependency(a, b);
        let run = g.execute(&pool()).unwrap();
        assert_eq!(run.executed_in(Phase::ExtractDeps), vec!["a"]);
        assert_eq!(run.executed_in(Phase::CompileUnits), vec!["b"]);
        assert_eq!(run.up_to_date, 1);
    }

    #[test]
    fn failure_stops_later_layers_after_siblings_finish() {
        let log = Mutex::new(Vec::new());
        let runs = AtomicUsize::new(0);
        let mut g = BuildGraph::new();
        let mut bad = step("bad", Phase::CompileUnits, false, &log, &runs);
        bad.fail = true;
        let bad = g.add_task(bad);
        let mut siblings = Vec::new();
        for i in 0..8 {
            let sibling = step(&format!("s{i}"), Phase::CompileUnits, false, &log, &runs);
            siblings.push(g.add_task(sibling));
        }
        let link = g.add_task(step("link", Phase::Link, false, &log, &runs));
        g.add_dependency(bad, link);
        for s in siblings {
            g.add_dependency(s, link);
        }

        let err = g.execute(&pool()).unwrap_err();
        assert_eq!(err.to_string(), "I/O error at bad: injected");
        assert_eq!(runs.load(Ordering::SeqCst), 9);
        assert!(!log.lock().unwrap().contains(&"link".to_string()));
    }

    #[test]
    fn cycle_is_rejected() {
        let log = Mutex::new(Vec::new());
        let runs = AtomicUsize::new(0);
        let mut g = BuildGraph::new();
        let a = g.add_task(step("a", Phase::ExtractDeps, false, &log, &runs));
        let b = g.add_task(step("b", Phase::CompileUnits, false, &log, &runs));
        g.add_dependency(a, b);
        g.add_dependency(b, a);
        assert!(matches!(g.layers(), Err(BuildError::Cycle)));
    }
}
