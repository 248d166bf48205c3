//! A single replica of a document: its root, its clock, and the local changes which haven't been
//! sent anywhere yet.

use humansize::{format_size, BINARY};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::change::{Change, ChangeContext, ChangeId, Origin};
use crate::error::{Result, TreeError};
use crate::root::Root;
use crate::time::{ActorId, VersionVector};

#[derive(Debug, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct DocOptions {
    /// Reject local edits which would grow the live document past this many bytes.
    pub max_size_limit: Option<usize>,

    /// Never collect garbage. Dead fragments pile up forever.
    pub disable_gc: bool,
}

impl DocOptions {
    pub fn with_max_size_limit(mut self, limit: usize) -> Self {
        self.max_size_limit = Some(limit);
        self
    }

    pub fn with_gc_disabled(mut self) -> Self {
        self.disable_gc = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    root: Root,
    change_id: ChangeId,
    options: DocOptions,

    /// Changes made here which haven't been handed off yet.
    local_changes: Vec<Change>,

    /// Set while the replica is still using the placeholder actor, once anything is applied.
    unbound: Option<UnboundLog>,
}

/// Everything applied before the replica learned its identity, and the root from before that.
/// Local changes in here carry the placeholder actor in their tickets. Once the real actor is
/// known they're rebound and the whole log is replayed, so this replica orders its own writes the
/// same way everyone else will.
#[derive(Debug, Clone)]
struct UnboundLog {
    base: Root,
    applied: Vec<(Change, Origin)>,
    handed_off: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DocOptions::default())
    }
}

impl Document {
    pub fn new(options: DocOptions) -> Self {
        Self {
            root: Root::new(),
            change_id: ChangeId::default(),
            options,
            local_changes: Vec::new(),
            unbound: None,
        }
    }

    pub fn actor(&self) -> ActorId {
        self.change_id.actor()
    }

    /// Give this replica its identity. This can only happen once, while the replica is still
    /// using the placeholder actor, and before any of its changes have been handed off.
    ///
    /// Pending local changes are rebound to the new actor, and the root is rebuilt by replaying
    /// everything applied so far against the root as it was before the first change. Edits made
    /// directly through [`root_mut`](Self::root_mut) after that point are lost.
    pub fn set_actor(&mut self, actor: ActorId) -> Result<()> {
        if !self.actor().is_initial() {
            return Err(TreeError::ActorAlreadySet(self.actor()));
        }

        let mut root = None;
        if let Some(log) = &self.unbound {
            if log.handed_off { return Err(TreeError::UnboundChangesSent); }

            let mut replayed = log.base.clone();
            for (change, origin) in log.applied.iter() {
                let mut change = change.clone();
                if *origin == Origin::Local {
                    change.set_actor(actor);
                }
                change.execute(&mut replayed, *origin)?;
            }
            root = Some(replayed);
        }

        if let Some(root) = root {
            debug!(%actor, "replayed changes made before the actor was set");
            self.root = root;
        }
        self.unbound = None;
        self.change_id = self.change_id.set_actor(actor);
        for change in self.local_changes.iter_mut() {
            change.set_actor(actor);
        }
        Ok(())
    }

    fn record_unbound(&mut self, prev: Root, change: &Change, origin: Origin) {
        if !self.actor().is_initial() { return; }

        self.unbound
            .get_or_insert_with(|| UnboundLog { base: prev, applied: Vec::new(), handed_off: false })
            .applied.push((change.clone(), origin));
    }

    pub fn root(&self) -> &Root { &self.root }

    /// Direct access to the root, for setting up elements. Edits should go through
    /// [`update`](Self::update) so they're recorded as changes.
    pub fn root_mut(&mut self) -> &mut Root { &mut self.root }

    pub fn options(&self) -> &DocOptions { &self.options }

    pub fn version_vector(&self) -> &VersionVector {
        self.change_id.version_vector()
    }

    /// Make a local edit. `f` is handed a context to issue tickets from and push operations into.
    ///
    /// The change runs against a copy of the root and is only committed if every operation
    /// succeeds and the document stays within its size limit. On error nothing changes.
    pub fn update<F>(&mut self, message: Option<&str>, f: F) -> Result<()>
        where F: FnOnce(&mut ChangeContext, &Root) -> Result<()>
    {
        let mut ctx = ChangeContext::new(self.change_id.next(), message.map(String::from));
        f(&mut ctx, &self.root)?;
        if ctx.is_empty() { return Ok(()); }

        let change = ctx.into_change();
        let mut root = self.root.clone();
        change.execute(&mut root, Origin::Local)?;

        if let Some(limit) = self.options.max_size_limit {
            let actual = root.doc_size().live.total();
            if actual > limit as i64 {
                return Err(TreeError::DocumentSizeExceedsLimit { limit, actual });
            }
        }

        let prev = std::mem::replace(&mut self.root, root);
        self.change_id = change.id().clone();
        self.record_unbound(prev, &change, Origin::Local);
        self.local_changes.push(change);
        Ok(())
    }

    /// Apply changes received from other replicas. Changes we've already applied are skipped, so
    /// redelivery is harmless. Each change is applied all-or-nothing.
    pub fn apply_changes(&mut self, changes: &[Change]) -> Result<()> {
        for change in changes {
            let id = change.id();
            if self.version_vector().get(&id.actor()).is_some_and(|seen| seen >= id.lamport()) {
                debug!(actor = %id.actor(), lamport = id.lamport(), "skipping change we've already seen");
                continue;
            }

            let mut root = self.root.clone();
            change.execute(&mut root, Origin::Remote)?;
            let prev = std::mem::replace(&mut self.root, root);
            self.change_id = self.change_id.sync_clocks(id);
            self.record_unbound(prev, change, Origin::Remote);

            debug!(actor = %id.actor(), lamport = id.lamport(), "applied remote change");
        }
        Ok(())
    }

    pub fn local_changes(&self) -> &[Change] {
        &self.local_changes
    }

    /// Hand off pending local changes (eg to send them to peers).
    pub fn drain_local_changes(&mut self) -> Vec<Change> {
        if let Some(log) = self.unbound.as_mut() {
            log.handed_off |= !self.local_changes.is_empty();
        }
        std::mem::take(&mut self.local_changes)
    }

    /// Collect everything every replica has seen removed. `min_synced` is the pairwise minimum of
    /// all replicas' version vectors. Returns the number of pairs collected.
    pub fn garbage_collect(&mut self, min_synced: &VersionVector) -> usize {
        if self.options.disable_gc { return 0; }

        let before = self.root.doc_size().gc;
        let count = self.root.garbage_collect(min_synced);
        if count > 0 {
            let mut reclaimed = before;
            reclaimed -= self.root.doc_size().gc;
            debug!(count, reclaimed = %format_size(reclaimed.total().max(0) as u64, BINARY),
                "garbage collected document");
        }
        count
    }
}
