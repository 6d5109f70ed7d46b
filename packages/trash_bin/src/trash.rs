use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, Weak};

use crate::bin::BinCore;
use crate::constants::ERR_POISONED_LOCK;
use crate::{InstanceId, Scene, TrashBin};

/// A handle to one pooled object.
///
/// Every object created or adopted by a [`TrashBin`] is wrapped in exactly one handle. Cloning a
/// `Trash` clones the handle reference, not the object: all clones observe the same active flag
/// and the same owning bin.
///
/// The handle refers to its owning bin without keeping it alive. Once the bin is dropped or the
/// handle is [removed][TrashBin::remove] from it, [`throw_to_bin()`][Self::throw_to_bin] becomes
/// a no-op.
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
/// let root = scene.create_root("pools", None);
///
/// let manager = directory.activate("effects", root).unwrap();
/// let bin = manager.create_bin(BinSpec::new("spark", "spark".to_string())).unwrap();
///
/// let trash = bin.take_out(true);
/// assert!(trash.is_active());
///
/// assert!(trash.throw_to_bin());
/// assert!(!trash.is_active());
/// ```
pub struct Trash<S: Scene> {
    inner: Arc<TrashInner<S>>,
}

struct TrashInner<S: Scene> {
    id: InstanceId,
    object: S::Object,
    scene: Arc<S>,
    active: Mutex<bool>,

    // Non-owning. Bins own their trashes, never the other way around.
    bin: Mutex<Weak<BinCore<S>>>,
}

impl<S: Scene> Trash<S> {
    /// Wraps a freshly created or adopted object. The handle starts out detached and assumes the
    /// object is shown, which is how scenes hand out new objects.
    pub(crate) fn new(object: S::Object, scene: Arc<S>) -> Self {
        let id = scene.instance_id(&object);

        Self {
            inner: Arc::new(TrashInner {
                id,
                object,
                scene,
                active: Mutex::new(true),
                bin: Mutex::new(Weak::new()),
            }),
        }
    }

    /// The identity of the wrapped object.
    #[must_use]
    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    /// The wrapped object.
    #[must_use]
    pub fn object(&self) -> &S::Object {
        &self.inner.object
    }

    /// Whether the wrapped object is currently shown.
    #[must_use]
    pub fn is_active(&self) -> bool {
        *self.inner.active.lock().expect(ERR_POISONED_LOCK)
    }

    /// Shows or hides the wrapped object.
    ///
    /// The scene is only notified if the flag actually changes, so repeated calls with the same
    /// value are cheap. Concurrent callers are serialized, so the flag always matches what the
    /// scene was last told.
    pub fn set_active(&self, active: bool) {
        let mut current = self.inner.active.lock().expect(ERR_POISONED_LOCK);

        if *current != active {
            *current = active;

            // Still under the flag lock, so the scene sees changes in the same order as the flag.
            self.inner.scene.set_active(&self.inner.object, active);
        }
    }

    /// The bin that currently owns this trash, if any.
    #[must_use]
    pub fn bin(&self) -> Option<TrashBin<S>> {
        self.owner().upgrade().map(TrashBin::from_core)
    }

    /// Returns this trash to the bin that owns it.
    ///
    /// Returns `false` if the trash has no owning bin or was not checked out.
    pub fn throw_to_bin(&self) -> bool {
        match self.bin() {
            Some(bin) => bin.take_in(self),
            None => {
                tracing::debug!(trash = %self.id(), "trash has no owning bin, nothing to return");
                false
            }
        }
    }

    /// Whether `self` and `other` are the same handle.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn owner(&self) -> Weak<BinCore<S>> {
        self.inner.bin.lock().expect(ERR_POISONED_LOCK).clone()
    }

    pub(crate) fn is_owned_by(&self, bin: &Arc<BinCore<S>>) -> bool {
        std::ptr::eq(self.owner().as_ptr(), Arc::as_ptr(bin))
    }

    pub(crate) fn bind(&self, bin: Weak<BinCore<S>>) {
        *self.inner.bin.lock().expect(ERR_POISONED_LOCK) = bin;
    }

    /// Binds the trash to `bin` if no live bin owns it.
    ///
    /// Returns `false` and leaves the binding alone if some other bin still owns the trash.
    pub(crate) fn claim(&self, bin: &Arc<BinCore<S>>) -> bool {
        let mut owner = self.inner.bin.lock().expect(ERR_POISONED_LOCK);

        if owner.strong_count() > 0 && !std::ptr::eq(owner.as_ptr(), Arc::as_ptr(bin)) {
            return false;
        }

        *owner = Arc::downgrade(bin);
        true
    }

    pub(crate) fn unbind(&self) {
        self.bind(Weak::new());
    }
}

impl<S: Scene> Clone for Trash<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Scene> Debug for Trash<S> {
    #[cfg_attr(test, mutants::skip)] // Formatting only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trash")
            .field("id", &self.inner.id)
            .field("object", &self.inner.object)
            .field("active", &self.is_active())
            .field("has_bin", &(self.owner().strong_count() > 0))
            .finish_non_exhaustive()
    }
}
