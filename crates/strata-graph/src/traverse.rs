//! Reverse-topological commit traversal.
//!
//! [`CommitTraverser`] walks the parent DAG from a starting commit,
//! consulting a caller-supplied evaluator for each commit it reaches. The
//! evaluator decides whether the commit is part of the result and whether
//! the walk descends into its parents; a separate oracle reports whether a
//! commit already exists in the transfer destination.
//!
//! The traversal runs in two passes. The first explores the frontier
//! breadth-first, evaluating every reachable commit exactly once and
//! recording the parent edges of commits the evaluator descended through.
//! The second orders the included commits by an iterative post-order walk
//! over those edges, which guarantees that every included, unpruned
//! ancestor of a commit precedes it in the output — including on graphs
//! with redundant parent edges, where a single-pass insertion order would
//! not.

use std::collections::{HashMap, HashSet, VecDeque};

use strata_types::ObjectId;

/// The evaluator's verdict for one commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Evaluation {
    /// Keep the commit and descend into its parents.
    IncludeAndContinue,
    /// Keep the commit but do not descend.
    IncludeAndPrune,
    /// Skip the commit but descend into its parents.
    ExcludeAndContinue,
    /// Skip the commit and do not descend.
    ExcludeAndPrune,
}

impl Evaluation {
    /// Whether the commit belongs in the output.
    pub fn includes(self) -> bool {
        matches!(self, Self::IncludeAndContinue | Self::IncludeAndPrune)
    }

    /// Whether the walk descends into the commit's parents.
    pub fn descends(self) -> bool {
        matches!(self, Self::IncludeAndContinue | Self::ExcludeAndContinue)
    }
}

/// A commit under evaluation, with its distance from the start.
#[derive(Clone, Copy, Debug)]
pub struct CommitNode {
    pub id: ObjectId,
    /// 1 for the start commit, parents one deeper than their children.
    pub depth: u32,
}

/// A reverse-topological walker over commit parents.
///
/// Constructed with three oracles:
/// - `evaluate` — verdict for each commit (called at most once per commit)
/// - `parents_of` — the parent list of a commit; unknown commits are roots
/// - `exists_in_destination` — whether a commit is already present in the
///   transfer destination
///
/// After [`traverse`](CommitTraverser::traverse):
/// - [`commits`](CommitTraverser::commits) holds the included commits
///   **ancestors-first** (roots come out first)
/// - [`have`](CommitTraverser::have) holds the pruned boundary commits
///   known to exist in the destination
pub struct CommitTraverser<Ev, Pa, De> {
    evaluate: Ev,
    parents_of: Pa,
    exists_in_destination: De,
    /// Included commits, ancestors before descendants.
    pub commits: Vec<ObjectId>,
    /// Pruned boundary commits present in the destination.
    pub have: HashSet<ObjectId>,
}

impl<E, Ev, Pa, De> CommitTraverser<Ev, Pa, De>
where
    Ev: FnMut(&CommitNode) -> Result<Evaluation, E>,
    Pa: FnMut(&ObjectId) -> Result<Vec<ObjectId>, E>,
    De: FnMut(&ObjectId) -> Result<bool, E>,
{
    /// Create a walker from the three oracles.
    pub fn new(evaluate: Ev, parents_of: Pa, exists_in_destination: De) -> Self {
        Self {
            evaluate,
            parents_of,
            exists_in_destination,
            commits: Vec::new(),
            have: HashSet::new(),
        }
    }

    /// Walk the parent DAG from `start`, filling
    /// [`commits`](CommitTraverser::commits) and
    /// [`have`](CommitTraverser::have).
    ///
    /// A NULL start yields an empty result.
    pub fn traverse(&mut self, start: ObjectId) -> Result<(), E> {
        self.commits.clear();
        self.have.clear();
        if start.is_null() {
            return Ok(());
        }

        // Pass 1: evaluate every reachable commit once, breadth-first.
        let mut visited: HashSet<ObjectId> = HashSet::new();
        let mut included: HashSet<ObjectId> = HashSet::new();
        let mut edges: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();
        let mut frontier: VecDeque<CommitNode> = VecDeque::new();

        visited.insert(start);
        frontier.push_back(CommitNode {
            id: start,
            depth: 1,
        });

        while let Some(node) = frontier.pop_front() {
            let verdict = (self.evaluate)(&node)?;
            if verdict.includes() {
                included.insert(node.id);
            } else if verdict == Evaluation::ExcludeAndPrune
                && (self.exists_in_destination)(&node.id)?
            {
                self.have.insert(node.id);
            }
            if verdict.descends() {
                let parents = (self.parents_of)(&node.id)?;
                for parent in &parents {
                    if !parent.is_null() && visited.insert(*parent) {
                        frontier.push_back(CommitNode {
                            id: *parent,
                            depth: node.depth + 1,
                        });
                    }
                }
                edges.insert(node.id, parents);
            }
        }

        // Pass 2: post-order over the recorded edges, parents before
        // children, emitting the included commits ancestors-first.
        let mut emitted: HashSet<ObjectId> = HashSet::new();
        let mut pending: HashSet<ObjectId> = HashSet::new();
        let mut stack: Vec<(ObjectId, usize)> = vec![(start, 0)];
        pending.insert(start);

        while let Some((id, index)) = stack.pop() {
            let parents: &[ObjectId] = edges.get(&id).map(Vec::as_slice).unwrap_or(&[]);
            if index < parents.len() {
                stack.push((id, index + 1));
                let parent = parents[index];
                if !parent.is_null() && !emitted.contains(&parent) && pending.insert(parent) {
                    stack.push((parent, 0));
                }
            } else {
                if included.contains(&id) {
                    self.commits.push(id);
                }
                emitted.insert(id);
                pending.remove(&id);
            }
        }

        Ok(())
    }
}
