use std::collections::{BTreeMap, VecDeque};
use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nm::Event;

use crate::constants::ERR_POISONED_LOCK;
use crate::ledger::Ledger;
use crate::metrics::{RECLAIMED, REMOVALS, TAKE_INS, TAKE_OUTS, TRASHES_CREATED};
use crate::{BinSpec, InstanceId, Scene, Trash};

/// A named pool of interchangeable objects instantiated from the same prefab.
///
/// Every trash owned by a bin is either free (waiting in a first-in-first-out queue) or busy
/// (checked out by a caller). Taking out a trash from a bin with no free trashes grows the bin by
/// exactly one new object; bins never shrink on their own.
///
/// Bins are created by [`TrashBinManager::create_bin()`][crate::TrashBinManager::create_bin].
/// This type is a cheaply cloneable handle to the shared bin.
///
/// # Thread safety
///
/// All operations on one bin are serialized by a single lock, so a trash can never be lost or
/// duplicated between the free queue and the busy set.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use trash_bin::{BinSpec, Directory, HeadlessScene, Scene};
///
/// let scene = Arc::new(HeadlessScene::new());
/// let directory = Directory::new(Arc::clone(&scene));
/// let manager = directory
///     .activate("trash-bin", scene.create_root("trash-bin", None))
///     .unwrap();
///
/// let bin = manager
///     .create_bin(BinSpec::new("cube", "cube".to_string()).preload_count(2))
///     .unwrap();
/// assert_eq!(bin.free_count(), 2);
///
/// let first = bin.take_out(true);
/// let second = bin.take_out(true);
/// let third = bin.take_out(true); // Grows the bin.
/// assert_eq!(bin.len(), 3);
///
/// assert_eq!(bin.take_in_all(), 3);
/// assert_eq!(bin.busy_count(), 0);
/// # drop((first, second, third));
/// ```
pub struct TrashBin<S: Scene> {
    core: Arc<BinCore<S>>,
}

pub(crate) struct BinCore<S: Scene> {
    name: String,
    prefab: S::Prefab,
    preload_count: usize,
    has_own_root: bool,

    scene: Arc<S>,
    ledger: Arc<Ledger<S>>,

    state: Mutex<BinState<S>>,
}

struct BinState<S: Scene> {
    /// Where free trashes are parked. `None` until the bin is set up.
    root: Option<S::Transform>,

    free: VecDeque<Trash<S>>,

    /// Ordered by id, so bulk operations visit trashes in a stable order.
    busy: BTreeMap<InstanceId, Trash<S>>,
}

impl<S: Scene> TrashBin<S> {
    pub(crate) fn new(spec: BinSpec<S::Prefab>, scene: Arc<S>, ledger: Arc<Ledger<S>>) -> Self {
        Self {
            core: Arc::new(BinCore {
                name: spec.name,
                prefab: spec.prefab,
                preload_count: spec.preload_count,
                has_own_root: spec.has_own_root,
                scene,
                ledger,
                state: Mutex::new(BinState {
                    root: None,
                    free: VecDeque::new(),
                    busy: BTreeMap::new(),
                }),
            }),
        }
    }

    pub(crate) fn from_core(core: Arc<BinCore<S>>) -> Self {
        Self { core }
    }

    /// Establishes the root under which free trashes are parked and preloads the bin.
    ///
    /// A bin with its own root gets a new root named after the bin, attached to `parent_root`.
    /// Otherwise `parent_root` itself is used. Setting up a bin a second time has no effect.
    pub(crate) fn setup(&self, parent_root: &S::Transform) {
        let mut state = self.lock();

        if state.root.is_some() {
            tracing::warn!(bin = %self.core.name, "bin is already set up, ignoring repeated setup");
            return;
        }

        let root = if self.core.has_own_root {
            self.core
                .scene
                .create_root(&self.core.name, Some(parent_root))
        } else {
            parent_root.clone()
        };

        state.root = Some(root);

        for _ in 0..self.core.preload_count {
            self.create_trash(&mut state);
        }

        tracing::debug!(
            bin = %self.core.name,
            preloaded = self.core.preload_count,
            own_root = self.core.has_own_root,
            "bin set up"
        );
    }

    /// The name of the bin, unique within its manager.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// The root under which free trashes are parked, once the bin is set up.
    #[must_use]
    pub fn root(&self) -> Option<S::Transform> {
        self.lock().root.clone()
    }

    /// How many trashes were created when the bin was set up.
    #[must_use]
    pub fn preload_count(&self) -> usize {
        self.core.preload_count
    }

    /// Whether the bin parks its free trashes under a dedicated root.
    #[must_use]
    pub fn has_own_root(&self) -> bool {
        self.core.has_own_root
    }

    /// The number of trashes waiting to be taken out.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.lock().free.len()
    }

    /// The number of trashes currently taken out.
    #[must_use]
    pub fn busy_count(&self) -> usize {
        self.lock().busy.len()
    }

    /// The total number of trashes owned by the bin, free or busy.
    #[must_use]
    pub fn len(&self) -> usize {
        let state = self.lock();
        state.free.len().saturating_add(state.busy.len())
    }

    /// Whether the bin owns no trashes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The ids of the free trashes, in the order they will be taken out.
    #[must_use]
    pub fn free_ids(&self) -> Vec<InstanceId> {
        self.lock().free.iter().map(Trash::id).collect()
    }

    /// The ids of the busy trashes, in ascending order.
    #[must_use]
    pub fn busy_ids(&self) -> Vec<InstanceId> {
        self.lock().busy.keys().copied().collect()
    }

    /// Takes out the trash that has been free the longest, creating a new one if none is free.
    ///
    /// The returned trash is shown if `activate` is `true` and hidden otherwise. It stays
    /// attached to the bin root; placing it is up to the caller.
    pub fn take_out(&self, activate: bool) -> Trash<S> {
        let mut state = self.lock();

        if state.free.is_empty() {
            tracing::debug!(bin = %self.core.name, "no free trash, growing the bin");
            self.create_trash(&mut state);
        }

        let trash = state
            .free
            .pop_front()
            .expect("a trash was just created, so the free queue cannot be empty");

        trash.set_active(activate);
        state.busy.insert(trash.id(), trash.clone());

        TAKE_OUTS.with(Event::observe_once);

        trash
    }

    /// Returns a taken-out trash to the bin.
    ///
    /// The trash is hidden, parked under the bin root and queued behind all other free trashes.
    ///
    /// Returns `false` and changes nothing if the trash belongs to another bin or is not
    /// currently taken out.
    pub fn take_in(&self, trash: &Trash<S>) -> bool {
        let mut state = self.lock();
        self.take_in_locked(&mut state, trash)
    }

    /// Returns every taken-out trash to the bin.
    ///
    /// Returns the number of trashes returned.
    pub fn take_in_all(&self) -> usize {
        let mut state = self.lock();

        let busy = state.busy.values().cloned().collect::<Vec<_>>();

        let mut count: usize = 0;

        for trash in &busy {
            if self.take_in_locked(&mut state, trash) {
                count = count.saturating_add(1);
            }
        }

        RECLAIMED.with(|event| event.observe(count));
        tracing::debug!(bin = %self.core.name, count, "took in all busy trashes");

        count
    }

    /// Detaches a trash from the bin, whether it is free or busy.
    ///
    /// The remaining free trashes keep their order. A trash removed from the free queue is also
    /// detached from the bin root. Once removed, the trash no longer belongs to any bin.
    ///
    /// Returns `false` if the trash was not in the bin.
    pub fn remove(&self, trash: &Trash<S>) -> bool {
        if !self.detach(trash) {
            tracing::warn!(bin = %self.core.name, trash = %trash.id(), "trash is not in the bin");
            return false;
        }

        self.core.ledger.remove(trash);

        REMOVALS.with(Event::observe_once);

        true
    }

    /// Places an object that was instantiated elsewhere into the bin as a free trash.
    ///
    /// If the object already belongs to a bin, it is first removed from that bin and the existing
    /// handle is reused. The object is hidden and parked under the bin root.
    ///
    /// When several threads adopt the same object at once, it ends up in exactly one of the bins.
    pub fn adopt(&self, object: S::Object) -> Trash<S> {
        let id = self.core.scene.instance_id(&object);

        let trash = self
            .core
            .ledger
            .get_or_insert_with(id, || Trash::new(object, Arc::clone(&self.core.scene)));

        loop {
            if let Some(previous) = trash.bin() {
                previous.detach(&trash);
            }

            let mut state = self.lock();

            if trash.is_owned_by(&self.core) {
                // A concurrent adoption into this same bin got here first.
                return trash;
            }

            // Fails if another bin claimed the trash after we detached it. Try again from there.
            if trash.claim(&self.core) {
                self.park(&mut state, &trash);

                tracing::debug!(bin = %self.core.name, trash = %id, "adopted object");

                return trash;
            }
        }
    }

    /// Whether `self` and `other` are the same bin.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &Arc<BinCore<S>> {
        &self.core
    }

    /// Takes the trash out of the free queue or the busy set and unbinds it, keeping its ledger
    /// entry. Returns `false` if the trash was in neither.
    fn detach(&self, trash: &Trash<S>) -> bool {
        let mut state = self.lock();

        let mut detached = false;

        if state
            .busy
            .get(&trash.id())
            .is_some_and(|busy| busy.ptr_eq(trash))
        {
            state.busy.remove(&trash.id());
            detached = true;
        }

        if let Some(index) = state.free.iter().position(|free| free.ptr_eq(trash)) {
            if let Some(free) = state.free.remove(index) {
                self.core.scene.set_parent(free.object(), None);
                detached = true;
            }
        }

        if detached && trash.is_owned_by(&self.core) {
            trash.unbind();
        }

        detached
    }

    fn lock(&self) -> MutexGuard<'_, BinState<S>> {
        self.core.state.lock().expect(ERR_POISONED_LOCK)
    }

    fn create_trash(&self, state: &mut BinState<S>) {
        let object = self
            .core
            .scene
            .instantiate(&self.core.prefab, state.root.as_ref());

        let trash = Trash::new(object, Arc::clone(&self.core.scene));
        self.park(state, &trash);

        TRASHES_CREATED.with(Event::observe_once);
    }

    /// Binds `trash` to this bin, hides it and queues it as free.
    fn park(&self, state: &mut BinState<S>, trash: &Trash<S>) {
        trash.bind(Arc::downgrade(&self.core));
        trash.set_active(false);
        self.core
            .scene
            .set_parent(trash.object(), state.root.as_ref());

        self.core.ledger.insert(trash);
        state.free.push_back(trash.clone());
    }

    fn take_in_locked(&self, state: &mut BinState<S>, trash: &Trash<S>) -> bool {
        if !trash.is_owned_by(&self.core) {
            tracing::warn!(
                bin = %self.core.name,
                trash = %trash.id(),
                "trash does not belong to the bin, so it cannot be taken in"
            );
            return false;
        }

        if state.busy.remove(&trash.id()).is_none() {
            tracing::warn!(
                bin = %self.core.name,
                trash = %trash.id(),
                "trash is not taken out, so it cannot be taken in"
            );
            return false;
        }

        trash.set_active(false);
        self.core
            .scene
            .set_parent(trash.object(), state.root.as_ref());
        state.free.push_back(trash.clone());

        TAKE_INS.with(Event::observe_once);

        true
    }
}

impl<S: Scene> Drop for BinCore<S> {
    #[cfg_attr(test, mutants::skip)] // Covered through the directory ledger size.
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);

        // Handles of a dropped bin can never be taken in again, so the ledger forgets them.
        for trash in state.free.iter().chain(state.busy.values()) {
            self.ledger.remove(trash);
        }
    }
}

impl<S: Scene> Clone for TrashBin<S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<S: Scene> Debug for TrashBin<S> {
    #[cfg_attr(test, mutants::skip)] // Formatting only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();

        f.debug_struct("TrashBin")
            .field("name", &self.core.name)
            .field("preload_count", &self.core.preload_count)
            .field("has_own_root", &self.core.has_own_root)
            .field("root", &state.root)
            .field("free", &state.free.len())
            .field("busy", &state.busy.len())
            .finish()
    }
}
