//! Shadow tree: atomic revisions with optimistic commits
//!
//! The tree publishes immutable [`RevisionSnapshot`]s through an
//! [`ArcSwap`]. Readers load the current `Arc` without locking and may keep
//! it as long as they like. Writers compute a new root and its layout
//! against the snapshot they read, then install it with a compare-and-swap
//! on that snapshot; if another commit landed in between, the mutator runs
//! again on the newer snapshot.

use crate::config::ShadowTreeConfig;
use crate::error::{CommitError, Result};
use crate::layout::{LayoutContext, LayoutResult};
use crate::node::{ComponentKind, ShadowNode, Tag};
use crate::scroll;
use arc_swap::ArcSwap;
use parking_lot::{ReentrantMutex, RwLock};
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// One published revision of a tree
#[derive(Debug)]
pub struct RevisionSnapshot {
    revision: u64,
    root: ShadowNode,
    layout: Arc<LayoutResult>,
    context: LayoutContext,
}

impl RevisionSnapshot {
    /// Revision number, 0 before the first commit
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn root(&self) -> &ShadowNode {
        &self.root
    }

    pub fn layout(&self) -> &Arc<LayoutResult> {
        &self.layout
    }

    /// Context the layout was computed under
    pub fn context(&self) -> &LayoutContext {
        &self.context
    }

    fn republished(&self) -> Self {
        Self {
            revision: self.revision,
            root: self.root.clone(),
            layout: self.layout.clone(),
            context: self.context,
        }
    }
}

/// Lifecycle of a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeStatus {
    /// No commit yet
    Uncommitted,
    /// At least one commit
    Active,
    /// No further commits accepted
    TornDown,
}

/// Receives the result of every committed layout pass
pub trait ShadowTreeDelegate: Send + Sync {
    /// Called after `snapshot` was installed. `changed` lists nodes whose
    /// geometry is new or differs from the previous revision.
    ///
    /// Calls arrive one at a time in revision order. A revision that
    /// finishes after a newer one was already delivered is skipped, and the
    /// next delivery reports changes against the last delivered revision.
    fn did_commit(&self, surface: Tag, snapshot: &RevisionSnapshot, changed: &[Tag]);
}

/// Statistics about commits
#[derive(Debug, Clone, Default)]
pub struct ShadowTreeStats {
    /// Revisions installed
    pub commits: u64,
    /// Attempts that lost a race and ran again
    pub retries: u64,
    /// Commits that gave up with contention
    pub contention_failures: u64,
}

/// A shadow tree for one surface
pub struct ShadowTree {
    surface: Tag,
    config: ShadowTreeConfig,
    current: ArcSwap<RevisionSnapshot>,
    torn_down: AtomicBool,
    delegate: RwLock<Option<Arc<dyn ShadowTreeDelegate>>>,
    /// Last revision handed to the delegate
    notified: ReentrantMutex<RefCell<Arc<RevisionSnapshot>>>,
    stats: RwLock<ShadowTreeStats>,
}

impl ShadowTree {
    /// Create a tree with an empty root tagged `surface`
    pub fn new(surface: Tag, context: LayoutContext, config: ShadowTreeConfig) -> Self {
        let root = ShadowNode::builder(surface, ComponentKind::Root).build();
        let layout = root.layout(&context);
        let snapshot = RevisionSnapshot {
            revision: 0,
            root,
            layout: Arc::new(layout),
            context,
        };

        let snapshot = Arc::new(snapshot);

        log::debug!("Created shadow tree for surface {}", surface);
        Self {
            surface,
            config,
            current: ArcSwap::new(snapshot.clone()),
            torn_down: AtomicBool::new(false),
            delegate: RwLock::new(None),
            notified: ReentrantMutex::new(RefCell::new(snapshot)),
            stats: RwLock::new(ShadowTreeStats::default()),
        }
    }

    /// Tag of the surface (and of the root node)
    pub fn surface(&self) -> Tag {
        self.surface
    }

    pub fn config(&self) -> &ShadowTreeConfig {
        &self.config
    }

    /// Attach or detach the delegate
    pub fn set_delegate(&self, delegate: Option<Arc<dyn ShadowTreeDelegate>>) {
        *self.delegate.write() = delegate;
    }

    /// The latest published snapshot. Never blocks.
    pub fn current_revision(&self) -> Arc<RevisionSnapshot> {
        self.current.load_full()
    }

    pub fn status(&self) -> TreeStatus {
        if self.torn_down.load(Ordering::Acquire) {
            TreeStatus::TornDown
        } else if self.current.load().revision == 0 {
            TreeStatus::Uncommitted
        } else {
            TreeStatus::Active
        }
    }

    /// Commit a new root computed by `mutator` from the current root.
    ///
    /// `mutator` may run several times and must not have side effects
    /// beyond building the new root.
    pub fn commit<F>(&self, mutator: F) -> Result<u64>
    where
        F: Fn(&ShadowNode) -> ShadowNode,
    {
        self.commit_with(|base| (mutator(base.root()), base.context))
            .map(|snapshot| snapshot.revision)
    }

    /// Re-lay out the current root under a new context as a new revision
    pub fn constrain_layout(&self, context: LayoutContext) -> Result<u64> {
        self.commit_with(|base| (base.root().clone(), context))
            .map(|snapshot| snapshot.revision)
    }

    fn commit_with<F>(&self, transaction: F) -> Result<Arc<RevisionSnapshot>>
    where
        F: Fn(&RevisionSnapshot) -> (ShadowNode, LayoutContext),
    {
        let attempts = self.config.max_commit_retries.saturating_add(1);

        for attempt in 0..attempts {
            if attempt > 0 {
                self.stats.write().retries += 1;
                let delay = self.config.backoff.delay_for_retry(attempt);
                if delay.is_zero() {
                    thread::yield_now();
                } else {
                    thread::sleep(delay);
                }
            }

            if self.torn_down.load(Ordering::Acquire) {
                return Err(CommitError::TornDown);
            }

            let base = self.current_revision();
            let (root, context) = transaction(&base);
            validate_root(base.root(), &root)?;

            let layout = root.layout(&context);
            let root = scroll::update_state_if_needed(&root, &layout).unwrap_or(root);
            let candidate = Arc::new(RevisionSnapshot {
                revision: base.revision + 1,
                root,
                layout: Arc::new(layout),
                context,
            });

            let previous = self.current.compare_and_swap(&base, candidate.clone());
            if Arc::ptr_eq(&previous, &base) {
                self.stats.write().commits += 1;
                log::trace!(
                    "Surface {} committed revision {}",
                    self.surface,
                    candidate.revision
                );
                self.notify(&candidate);
                return Ok(candidate);
            }

            log::trace!(
                "Surface {} commit on revision {} lost the race (attempt {})",
                self.surface,
                base.revision,
                attempt + 1
            );
        }

        if self.torn_down.load(Ordering::Acquire) {
            return Err(CommitError::TornDown);
        }
        self.stats.write().contention_failures += 1;
        log::warn!(
            "Surface {} commit abandoned after {} attempts",
            self.surface,
            attempts
        );
        Err(CommitError::Contention { attempts })
    }

    fn notify(&self, installed: &Arc<RevisionSnapshot>) {
        let guard = self.notified.lock();
        let previous = {
            let mut last = guard.borrow_mut();
            if last.revision >= installed.revision {
                log::trace!(
                    "Surface {} skipping stale revision {} (delivered {})",
                    self.surface,
                    installed.revision,
                    last.revision
                );
                return;
            }
            std::mem::replace(&mut *last, installed.clone())
        };

        let delegate = self.delegate.read().clone();
        if let Some(delegate) = delegate {
            let changed = installed.layout.changed_since(&previous.layout);
            delegate.did_commit(self.surface, installed, &changed);
        }
    }

    /// Stop accepting commits. Published snapshots stay readable.
    pub fn tear_down(&self) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        // Republish so a commit that read its base before the flag was set
        // fails its swap.
        self.current.rcu(|current| Arc::new(current.republished()));
        log::debug!("Tore down shadow tree for surface {}", self.surface);
    }

    /// Snapshot of commit statistics
    pub fn stats(&self) -> ShadowTreeStats {
        self.stats.read().clone()
    }
}

impl fmt::Debug for ShadowTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowTree")
            .field("surface", &self.surface)
            .field("revision", &self.current.load().revision)
            .field("status", &self.status())
            .finish()
    }
}

fn validate_root(base: &ShadowNode, root: &ShadowNode) -> Result<()> {
    if root.kind() != ComponentKind::Root {
        return Err(CommitError::InvalidRoot(format!(
            "expected a {} node, got {}",
            ComponentKind::Root.name(),
            root.kind().name()
        )));
    }
    if root.tag() != base.tag() {
        return Err(CommitError::InvalidRoot(format!(
            "root tag changed from {} to {}",
            base.tag(),
            root.tag()
        )));
    }
    Ok(())
}
