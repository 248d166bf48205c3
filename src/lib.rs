//! Style operations for a replicated tree document.
//!
//! A document is a tree of element and text nodes (think: a rich text document or an XML doc).
//! Every replica holds its own copy. Edits made on one replica are sent to the others as
//! [operations](operation::Operation), and every replica which applies the same set of operations
//! ends up with the same document - no matter what order they arrived in, or how many times.
//!
//! This crate implements the style operation: set or remove attributes on every element in a
//! range of the tree. The important parts are:
//!
//! 1. The [`Root`] - the shared state of a replica. It holds every element, the registry of dead
//! fragments waiting for garbage collection, and a running count of the document's size.
//! 2. [`TreeStyle`] - the operation itself. Executing it resolves the tree, writes the attributes,
//! and folds the results back into the root.
//!
//! ## Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use smartstring::alias::String as SmartString;
//! use diamond_tree::*;
//!
//! let actor = ActorId::new([1; 12]);
//! let doc_id = TreeNodeId::from(Ticket::new(1, 0, actor));
//! let p_id = TreeNodeId::from(Ticket::new(2, 0, actor));
//!
//! let mut tree = CrdtTree::new(doc_id, "doc");
//! tree.insert_element(&doc_id, p_id, "p").unwrap();
//!
//! let mut root = Root::new();
//! root.register_element(Element::Tree(tree));
//!
//! let attrs: BTreeMap<SmartString, SmartString> = [("bold".into(), "true".into())].into_iter().collect();
//! let op = TreeStyle::new(
//!     doc_id.created_at,
//!     TreePos::new(doc_id, 0),
//!     TreePos::new(doc_id, 1),
//!     attrs,
//!     Ticket::new(3, 0, actor),
//! ).unwrap();
//! op.execute(&mut root, None).unwrap();
//!
//! let tree = root.find_by_created_at(&doc_id.created_at).unwrap().as_tree().unwrap();
//! assert_eq!(tree.to_xml(), "<doc><p bold=\"true\"></p></doc>");
//! ```
//!
//! ## Ordering
//!
//! Each attribute on each element is a last-writer-wins register. Writes are ordered by their
//! [`Ticket`] - a (lamport clock, delimiter, actor) triple which is totally ordered across every
//! replica. A write only takes effect if its ticket is later than whatever is already there.
//!
//! A write which loses isn't thrown away. The value it would have written is recorded as dead on
//! arrival, exactly as if it had been written first and then overwritten. This keeps the set of
//! dead fragments identical across replicas too, which matters for garbage collection.
//!
//! ## Garbage
//!
//! Overwritten values and removal tombstones can't be dropped immediately - a replica which hasn't
//! seen the removal yet might still send writes that need to be ordered against them. Instead they
//! are registered with the root as a [`GCPair`] and reclaimed later by
//! [`Root::garbage_collect`], once every replica is known to have seen the removal.
//!
//! The root tracks two sizes: live bytes, and bytes which are dead but still waiting on the
//! collector. See [`DocSize`].
//!
//! ## Concurrency
//!
//! Nothing here locks. Operations are applied to a root one at a time by whoever owns it. If you
//! need to share a document between threads, wrap it in a mutex and apply operations inside it.

#![allow(clippy::module_inception)]

pub mod time;
pub mod tree;
pub mod operation;
pub mod change;
mod resource;
mod gc;
mod root;
mod document;
mod error;
mod check;

pub use crate::change::{Change, ChangeContext, ChangeId, Origin};
pub use crate::document::{DocOptions, Document};
pub use crate::error::{Result, TreeError};
pub use crate::gc::{FragmentRef, GCPair};
pub use crate::operation::{Operation, StyleKind, TreeStyle};
pub use crate::resource::{DataSize, DocSize};
pub use crate::root::{Element, Primitive, Root};
pub use crate::time::{ActorId, Ticket, VersionVector};
pub use crate::tree::{CrdtTree, TreeNodeId, TreePos};
