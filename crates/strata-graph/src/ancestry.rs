//! Ancestry queries over a [`GraphDatabase`].

use std::collections::{HashSet, VecDeque};

use strata_types::ObjectId;

use crate::error::GraphResult;
use crate::traits::GraphDatabase;

/// Find the closest common ancestor of two commits.
///
/// A commit counts as its own ancestor, so when one argument is an
/// ancestor of the other the result is that argument. Returns `Ok(None)`
/// when either commit is NULL or unknown to the graph, or when the two
/// histories share no commit.
pub fn common_ancestor(
    graph: &dyn GraphDatabase,
    left: &ObjectId,
    right: &ObjectId,
) -> GraphResult<Option<ObjectId>> {
    if left.is_null() || right.is_null() {
        return Ok(None);
    }
    if !graph.exists(left)? || !graph.exists(right)? {
        return Ok(None);
    }

    let right_ancestors = ancestor_set(graph, right)?;

    // Breadth-first from `left`: the first commit also in `right`'s
    // ancestor set is the closest common ancestor.
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut frontier: VecDeque<ObjectId> = VecDeque::new();
    visited.insert(*left);
    frontier.push_back(*left);

    while let Some(current) = frontier.pop_front() {
        if right_ancestors.contains(&current) {
            return Ok(Some(current));
        }
        for parent in graph.parents(&current)? {
            if !parent.is_null() && visited.insert(parent) {
                frontier.push_back(parent);
            }
        }
    }

    Ok(None)
}

/// All ancestors of a commit, including the commit itself.
pub fn ancestor_set(
    graph: &dyn GraphDatabase,
    commit: &ObjectId,
) -> GraphResult<HashSet<ObjectId>> {
    let mut visited: HashSet<ObjectId> = HashSet::new();
    let mut frontier: VecDeque<ObjectId> = VecDeque::new();
    visited.insert(*commit);
    frontier.push_back(*commit);

    while let Some(current) = frontier.pop_front() {
        for parent in graph.parents(&current)? {
            if !parent.is_null() && visited.insert(parent) {
                frontier.push_back(parent);
            }
        }
    }

    Ok(visited)
}
