use std::fmt::{self, Debug};
use std::sync::Mutex;

use foldhash::{HashMap, HashMapExt};

use crate::constants::ERR_POISONED_LOCK;
use crate::{InstanceId, Scene, Trash};

/// Index from object identity to the handle that wraps the object.
///
/// Shared by every bin of one directory. Lock order: a bin may lock the ledger while holding its
/// own state lock, never the other way around.
pub(crate) struct Ledger<S: Scene> {
    trashes: Mutex<HashMap<InstanceId, Trash<S>>>,
}

impl<S: Scene> Ledger<S> {
    pub(crate) fn new() -> Self {
        Self {
            trashes: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn get(&self, id: InstanceId) -> Option<Trash<S>> {
        self.trashes
            .lock()
            .expect(ERR_POISONED_LOCK)
            .get(&id)
            .cloned()
    }

    /// Returns the handle of the object with identity `id`, wrapping the object first if the
    /// ledger does not know it yet.
    pub(crate) fn get_or_insert_with(
        &self,
        id: InstanceId,
        wrap: impl FnOnce() -> Trash<S>,
    ) -> Trash<S> {
        self.trashes
            .lock()
            .expect(ERR_POISONED_LOCK)
            .entry(id)
            .or_insert_with(wrap)
            .clone()
    }

    pub(crate) fn insert(&self, trash: &Trash<S>) {
        self.trashes
            .lock()
            .expect(ERR_POISONED_LOCK)
            .insert(trash.id(), trash.clone());
    }

    /// Forgets `trash`, unless its object has since been wrapped by a different handle.
    pub(crate) fn remove(&self, trash: &Trash<S>) {
        let mut trashes = self.trashes.lock().expect(ERR_POISONED_LOCK);

        if trashes
            .get(&trash.id())
            .is_some_and(|known| known.ptr_eq(trash))
        {
            trashes.remove(&trash.id());
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.trashes.lock().expect(ERR_POISONED_LOCK).len()
    }
}

impl<S: Scene> Debug for Ledger<S> {
    #[cfg_attr(test, mutants::skip)] // Formatting only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("len", &self.len())
            .finish()
    }
}
