//! Acyclic stage graph stored as an arena.
//!
//! Stages sit in a dense vector in insertion order; edges are pairs of
//! indices into it. Every mutation keeps the graph acyclic, so ordering
//! queries never fail.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use inspect_types::StageId;
use tracing::debug;

use crate::stage::Stage;
use crate::types::EngineError;

#[derive(Default)]
pub struct PipelineGraph {
    stages: Vec<Box<dyn Stage>>,
    /// `(source, target)` indices into `stages`.
    edges: Vec<(usize, usize)>,
}

impl PipelineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn contains(&self, id: StageId) -> bool {
        self.index_of(id).is_some()
    }

    fn index_of(&self, id: StageId) -> Option<usize> {
        self.stages.iter().position(|s| s.id() == id)
    }

    fn require(&self, id: StageId) -> Result<usize, EngineError> {
        self.index_of(id).ok_or(EngineError::StageNotFound { id })
    }

    pub fn add_stage(&mut self, stage: Box<dyn Stage>) -> Result<StageId, EngineError> {
        let id = stage.id();
        if self.contains(id) {
            return Err(EngineError::DuplicateStage { id });
        }
        debug!(%id, kind = stage.kind(), "stage added");
        self.stages.push(stage);
        Ok(id)
    }

    /// Remove a stage and every edge touching it.
    pub fn remove_stage(&mut self, id: StageId) -> Result<Box<dyn Stage>, EngineError> {
        let pos = self.require(id)?;
        self.edges.retain(|&(s, t)| s != pos && t != pos);
        for (s, t) in &mut self.edges {
            if *s > pos {
                *s -= 1;
            }
            if *t > pos {
                *t -= 1;
            }
        }
        Ok(self.stages.remove(pos))
    }

    /// Connect `source -> target`. On error the graph is unchanged.
    pub fn add_edge(&mut self, source: StageId, target: StageId) -> Result<(), EngineError> {
        let s = self.require(source)?;
        let t = self.require(target)?;
        if s == t {
            return Err(EngineError::SelfLoop { id: source });
        }
        if self.edges.contains(&(s, t)) {
            return Err(EngineError::DuplicateEdge {
                from: source,
                to: target,
            });
        }
        if self.reaches(t, s) {
            return Err(EngineError::CycleDetected {
                from: source,
                to: target,
            });
        }
        self.edges.push((s, t));
        Ok(())
    }

    pub fn remove_edge(&mut self, source: StageId, target: StageId) -> Result<(), EngineError> {
        let s = self.require(source)?;
        let t = self.require(target)?;
        let before = self.edges.len();
        self.edges.retain(|&e| e != (s, t));
        if self.edges.len() == before {
            return Err(EngineError::EdgeNotFound {
                from: source,
                to: target,
            });
        }
        Ok(())
    }

    /// Breadth-first search along edges. Each node is visited at most
    /// once, so the search is bounded by the stage count.
    fn reaches(&self, from: usize, to: usize) -> bool {
        let mut visited = vec![false; self.stages.len()];
        let mut queue = VecDeque::from([from]);
        visited[from] = true;
        while let Some(node) = queue.pop_front() {
            if node == to {
                return true;
            }
            for &(s, t) in &self.edges {
                if s == node && !visited[t] {
                    visited[t] = true;
                    queue.push_back(t);
                }
            }
        }
        false
    }

    fn in_degrees(&self) -> Vec<usize> {
        let mut deg = vec![0usize; self.stages.len()];
        for &(_, t) in &self.edges {
            deg[t] += 1;
        }
        deg
    }

    /// Topological order (Kahn). Among ready stages the one inserted first
    /// runs first, so the order depends only on construction sequence.
    pub fn execution_order(&self) -> Vec<StageId> {
        let mut deg = self.in_degrees();
        let mut ready: BinaryHeap<Reverse<usize>> =
            (0..deg.len()).filter(|&i| deg[i] == 0).map(Reverse).collect();
        let mut order = Vec::with_capacity(self.stages.len());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(self.stages[node].id());
            for &(s, t) in &self.edges {
                if s == node {
                    deg[t] -= 1;
                    if deg[t] == 0 {
                        ready.push(Reverse(t));
                    }
                }
            }
        }
        order
    }

    /// Topological layers: each level depends only on earlier levels, and
    /// stages within a level share no edge.
    pub fn execution_levels(&self) -> Vec<Vec<StageId>> {
        let mut deg = self.in_degrees();
        let mut current: Vec<usize> = (0..deg.len()).filter(|&i| deg[i] == 0).collect();
        let mut levels = Vec::new();
        while !current.is_empty() {
            let mut next = Vec::new();
            for &node in &current {
                for &(s, t) in &self.edges {
                    if s == node {
                        deg[t] -= 1;
                        if deg[t] == 0 {
                            next.push(t);
                        }
                    }
                }
            }
            next.sort_unstable();
            levels.push(current.iter().map(|&i| self.stages[i].id()).collect());
            current = next;
        }
        levels
    }

    pub fn stage(&self, id: StageId) -> Option<&(dyn Stage + 'static)> {
        self.index_of(id).map(|i| self.stages[i].as_ref())
    }

    pub fn stage_mut(&mut self, id: StageId) -> Option<&mut (dyn Stage + 'static)> {
        let i = self.index_of(id)?;
        Some(self.stages[i].as_mut())
    }

    /// Stages in insertion order.
    pub fn stages(&self) -> impl Iterator<Item = &(dyn Stage + 'static)> {
        self.stages.iter().map(|s| s.as_ref())
    }

    /// Edges as `(source, target)` ids, in insertion order.
    pub fn edges(&self) -> Vec<(StageId, StageId)> {
        self.edges
            .iter()
            .map(|&(s, t)| (self.stages[s].id(), self.stages[t].id()))
            .collect()
    }

    pub fn has_edge(&self, source: StageId, target: StageId) -> bool {
        match (self.index_of(source), self.index_of(target)) {
            (Some(s), Some(t)) => self.edges.contains(&(s, t)),
            _ => false,
        }
    }

    pub fn predecessors(&self, id: StageId) -> Vec<StageId> {
        let Some(pos) = self.index_of(id) else {
            return Vec::new();
        };
        self.edges
            .iter()
            .filter(|&&(_, t)| t == pos)
            .map(|&(s, _)| self.stages[s].id())
            .collect()
    }

    pub fn successors(&self, id: StageId) -> Vec<StageId> {
        let Some(pos) = self.index_of(id) else {
            return Vec::new();
        };
        self.edges
            .iter()
            .filter(|&&(s, _)| s == pos)
            .map(|&(_, t)| self.stages[t].id())
            .collect()
    }
}
