use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Utc};

use crate::{
    commit::Commit,
    commit_store::CommitStore,
    error::{Error, Missing, Result},
    object_id::ObjectId,
    object_store::ObjectStore,
    repository::Repository,
};

/// Anything that can report the parents of a commit id: the first parent,
/// then the merge parent if there is one.
pub trait ParentLookup {
    fn parents_of(&self, id: ObjectId) -> Result<Vec<ObjectId>>;
}

impl<S> ParentLookup for CommitStore<S>
where
    S: ObjectStore,
    Error: From<S::Error>,
{
    fn parents_of(&self, id: ObjectId) -> Result<Vec<ObjectId>> {
        Ok(self.get(id)?.parents().collect())
    }
}

/// Breadth-first walk from `start` over parent edges, visiting each commit
/// once. `visit` returning `true` stops the walk at that commit.
fn breadth_first<G, F>(graph: &G, start: ObjectId, mut visit: F) -> Result<Option<ObjectId>>
where
    G: ParentLookup + ?Sized,
    F: FnMut(ObjectId) -> bool,
{
    let mut seen = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(id) = queue.pop_front() {
        if visit(id) {
            return Ok(Some(id));
        }
        for parent in graph.parents_of(id)? {
            if seen.insert(parent) {
                queue.push_back(parent);
            }
        }
    }
    Ok(None)
}

/// `start` and every commit reachable from it.
pub fn ancestors<G>(graph: &G, start: ObjectId) -> Result<BTreeSet<ObjectId>>
where
    G: ParentLookup + ?Sized,
{
    let mut ancestors = BTreeSet::new();
    breadth_first(graph, start, |id| {
        ancestors.insert(id);
        false
    })?;
    Ok(ancestors)
}

/// The first commit reached breadth-first from `given` that is also an
/// ancestor of `current`.
///
/// With several merge bases this is whichever the walk meets first, not
/// necessarily the most recent one.
pub fn split_point<G: ParentLookup + ?Sized>(
    graph: &G,
    current: ObjectId,
    given: ObjectId,
) -> Result<Option<ObjectId>> {
    let current_ancestors = ancestors(graph, current)?;
    breadth_first(graph, given, |id| current_ancestors.contains(&id))
}

/// What a merge does with one path, given its blob at the split point, the
/// current tip and the given tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Leave the working copy as it is.
    Keep,
    /// Check out the given version and stage it.
    TakeGiven,
    /// Delete the working copy and stage the removal.
    Delete,
    /// Write conflict markers and stage the result.
    Conflict,
}

pub fn classify(
    split: Option<ObjectId>,
    current: Option<ObjectId>,
    given: Option<ObjectId>,
) -> Resolution {
    match (split, current, given) {
        // Unchanged here, deleted there.
        (Some(s), Some(c), None) if c == s => Resolution::Delete,
        // Only added there.
        (None, None, Some(_)) => Resolution::TakeGiven,
        // Unchanged here, edited there.
        (Some(s), Some(c), Some(g)) if c == s && g != s => Resolution::TakeGiven,
        // Same on both sides, including deleted on both.
        (_, c, g) if c == g => Resolution::Keep,
        // Both sides moved away from the split point, differently. Covers
        // divergent edits, divergent additions, and an edit against a
        // deletion in either direction.
        (s, c, g) if c != s && g != s => Resolution::Conflict,
        _ => Resolution::Keep,
    }
}

/// The contents written for a conflicted path. A missing side is empty.
pub fn conflict_markers(current: Option<&[u8]>, given: Option<&[u8]>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"<<<<<<< HEAD\n");
    out.extend_from_slice(current.unwrap_or_default());
    out.extend_from_slice(b"\n=======\n");
    out.extend_from_slice(given.unwrap_or_default());
    out.extend_from_slice(b"\n>>>>>>>\n");
    out
}

/// What [`Repository::merge`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The current branch was behind and now points at the given tip.
    FastForwarded(ObjectId),
    /// A merge commit was made. A conflict is a warning; the commit still
    /// happens with conflict markers in the affected files.
    Merged { commit: ObjectId, conflict: bool },
}

impl Repository {
    /// Merges the tip of `given` into the active branch.
    pub fn merge(&mut self, given: &str) -> Result<MergeOutcome> {
        self.merge_at(given, Utc::now())
    }

    /// [`Repository::merge`] with an explicit timestamp for the merge commit.
    pub fn merge_at(&mut self, given: &str, timestamp: DateTime<Utc>) -> Result<MergeOutcome> {
        if !self.index.is_empty() {
            return Err(Error::UncommittedChanges);
        }
        if !self.branches.exists(given)? {
            return Err(Error::NoSuchBranch(given.to_string()));
        }
        let current = self.branches.current()?;
        if given == current {
            return Err(Error::SelfMerge);
        }

        let current_id = self.branches.tip_of(&current)?;
        let given_id = self.branches.tip_of(given)?;
        let split_id = split_point(&self.commits, current_id, given_id)?.ok_or_else(|| {
            Error::NotFound(Missing::Commit(format!(
                "common ancestor of {} and {}",
                current, given
            )))
        })?;
        if split_id == given_id {
            return Err(Error::AlreadyAncestor);
        }

        let current_tip = self.commits.get(current_id)?;
        let given_tip = self.commits.get(given_id)?;
        if split_id == current_id {
            self.check_out(&current_tip, &given_tip)?;
            self.branches.move_pointer(&current, given_id)?;
            log::info!("fast-forwarded {} to {}", current, given_id);
            return Ok(MergeOutcome::FastForwarded(given_id));
        }
        let split = self.commits.get(split_id)?;

        self.tree.guard_overwrite(&current_tip.files, &given_tip.files)?;
        if let Some(path) = self
            .tree
            .untracked(&current_tip.files)?
            .into_iter()
            .find(|path| !split.tracks(path))
        {
            return Err(Error::UntrackedConflict(path));
        }

        let conflict = self.resolve_paths(&split, &current_tip, &given_tip)?;
        if conflict {
            log::warn!("merging {} into {} left conflicts", given, current);
        }

        let files = self.index.apply(&current_tip.files);
        let message = format!("Merged {} into {}.", given, current);
        let merge = Commit::merge(message, timestamp, current_id, given_id, files);
        let id = self.commits.put(&merge)?;
        self.branches.move_pointer(&current, id)?;
        self.index.clear();
        self.save_index()?;
        log::info!("merged {} into {} as {}", given, current, id);
        Ok(MergeOutcome::Merged {
            commit: id,
            conflict,
        })
    }

    /// Applies [`classify`] to every path of the three commits, updating the
    /// working tree and the index. Returns whether any path conflicted.
    fn resolve_paths(&mut self, split: &Commit, current: &Commit, given: &Commit) -> Result<bool> {
        let paths: BTreeSet<&String> = split
            .files
            .keys()
            .chain(current.files.keys())
            .chain(given.files.keys())
            .collect();
        let mut conflict = false;
        for path in paths {
            let (s, c, g) = (split.blob(path), current.blob(path), given.blob(path));
            match classify(s, c, g) {
                Resolution::Keep => {}
                Resolution::Delete => {
                    self.tree.remove(path)?;
                    self.index.mark_removed(path);
                }
                Resolution::TakeGiven => {
                    // Only reached with the given side present.
                    if let Some(blob) = g {
                        self.tree.write(path, &self.blobs.get(blob)?)?;
                        self.index.stage(path, blob);
                    }
                }
                Resolution::Conflict => {
                    log::debug!("conflict in {}", path);
                    conflict = true;
                    let ours = c.map(|blob| self.blobs.get(blob)).transpose()?;
                    let theirs = g.map(|blob| self.blobs.get(blob)).transpose()?;
                    let contents = conflict_markers(ours.as_deref(), theirs.as_deref());
                    let blob = self.blobs.put(&contents)?;
                    self.tree.write(path, &contents)?;
                    self.index.stage(path, blob);
                }
            }
        }
        Ok(conflict)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    /// A commit graph given directly as child to parents edges.
    struct Graph(BTreeMap<ObjectId, Vec<ObjectId>>);

    impl ParentLookup for Graph {
        fn parents_of(&self, id: ObjectId) -> Result<Vec<ObjectId>> {
            Ok(self.0.get(&id).cloned().unwrap_or_default())
        }
    }

    fn id(name: &str) -> ObjectId {
        ObjectId::of(name.as_bytes())
    }

    /// Parses `child:parent,parent` entries separated by whitespace.
    fn graph(edges: &str) -> Graph {
        Graph(
            edges
                .split_whitespace()
                .map(|edge| {
                    let (child, parents) = edge.split_once(':').unwrap();
                    let parents = parents.split(',').filter(|p| !p.is_empty()).map(id);
                    (id(child), parents.collect())
                })
                .collect(),
        )
    }

    #[test]
    fn split_point_of_diverged_branches() {
        // root <- a <- b (current), a <- x <- y (given)
        let g = graph("a:root b:a x:a y:x");
        assert_eq!(split_point(&g, id("b"), id("y")).unwrap(), Some(id("a")));
        assert_eq!(split_point(&g, id("b"), id("a")).unwrap(), Some(id("a")));
        assert_eq!(split_point(&g, id("a"), id("y")).unwrap(), Some(id("a")));
    }

    #[test]
    fn split_point_follows_merge_parents() {
        // root <- a <- b; root <- x; m merges x into b; given continues from x.
        let g = graph("a:root b:a x:root m:b,x y:x");
        assert_eq!(split_point(&g, id("m"), id("y")).unwrap(), Some(id("x")));
        assert_eq!(ancestors(&g, id("m")).unwrap().len(), 5);
    }

    #[test]
    fn split_point_is_first_found_in_criss_cross() {
        // Two merge bases, p and q. The walk from the given tip reaches its
        // first parent's side first.
        let g = graph("p:root q:root c:p,q d:q,p");
        assert_eq!(split_point(&g, id("c"), id("d")).unwrap(), Some(id("q")));
        assert_eq!(split_point(&g, id("d"), id("c")).unwrap(), Some(id("p")));
    }

    #[test]
    fn unrelated_histories_have_no_split_point() {
        let g = graph("a: b:");
        assert_eq!(split_point(&g, id("a"), id("b")).unwrap(), None);
    }

    #[test]
    fn classification_table() {
        let (s, c, g) = (Some(id("s")), Some(id("c")), Some(id("g")));
        use Resolution::*;
        // Unchanged locally, deleted upstream.
        assert_eq!(classify(s, s, None), Delete);
        // Added upstream only.
        assert_eq!(classify(None, None, g), TakeGiven);
        // Unchanged locally, edited upstream.
        assert_eq!(classify(s, s, g), TakeGiven);
        // Same on both sides.
        assert_eq!(classify(s, c, c), Keep);
        assert_eq!(classify(s, None, None), Keep);
        assert_eq!(classify(None, c, c), Keep);
        // Edited locally only, or added locally only.
        assert_eq!(classify(s, c, s), Keep);
        assert_eq!(classify(None, c, None), Keep);
        // Deleted locally, unchanged upstream.
        assert_eq!(classify(s, None, s), Keep);
        // Conflicts.
        assert_eq!(classify(s, c, g), Conflict);
        assert_eq!(classify(None, c, g), Conflict);
        assert_eq!(classify(s, None, g), Conflict);
        assert_eq!(classify(s, c, None), Conflict);
    }

    #[test]
    fn markers_with_missing_side() {
        assert_eq!(
            conflict_markers(Some(&b"B"[..]), Some(&b"C"[..])),
            b"<<<<<<< HEAD\nB\n=======\nC\n>>>>>>>\n".to_vec()
        );
        assert_eq!(
            conflict_markers(None, Some(&b"C"[..])),
            b"<<<<<<< HEAD\n\n=======\nC\n>>>>>>>\n".to_vec()
        );
    }
}
