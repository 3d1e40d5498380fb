//! # Revision Control
//!
//! This is an implementation of a basic revision control system: content
//! addressed blobs and commits, named branches, a staging index, and three
//! way merges between branch tips.
//!
//! Everything goes through a [`repository::Repository`] handle.

mod hex;

/// Branch pointers and the HEAD naming the active branch.
pub mod branches;
/// Raw file snapshots, deduplicated by content.
pub mod blob_store;
/// The immutable commit record and its identity.
pub mod commit;
/// Commits keyed by their [`object_id::ObjectId`].
pub mod commit_store;
/// The `.rev` directory layout.
pub mod dot_rev;
pub mod error;
/// Split point discovery and three way merging.
pub mod merge;
/// Hash-based binary object identifier.
pub mod object_id;
/// Content addressible store API using the [`object_id::ObjectId`].
pub mod object_store;
pub mod repository;
/// Pending additions and removals.
pub mod staging;
pub mod status;
/// Reconciling the files on disk with a commit's file table.
pub mod working_tree;
