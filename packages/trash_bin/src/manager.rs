use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::constants::ERR_POISONED_LOCK;
use crate::directory::DirectoryCore;
use crate::ledger::Ledger;
use crate::{BinSpec, Directory, Error, Result, Scene, TrashBin, TrashConfig};

/// A named collection of [`TrashBin`]s that share one root in the scene.
///
/// Managers are created by [`Directory::activate()`] and stay reachable by name through the
/// directory until they are [deactivated][Self::deactivate]. This type is a cheaply cloneable
/// handle to the shared manager.
///
/// # Thread safety
///
/// Creating bins and taking out trashes are serialized per manager. A take-out (finding the bin,
/// taking out a trash and placing it) is atomic relative to other operations on the same manager.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use trash_bin::{BinSpec, Directory, HeadlessScene, Scene, TrashConfig, Vec3};
///
/// let scene = Arc::new(HeadlessScene::new());
/// let directory = Directory::new(Arc::clone(&scene));
/// let manager = directory
///     .activate("trash-bin", scene.create_root("trash-bin", None))
///     .unwrap();
///
/// manager
///     .create_bin(BinSpec::new("cube", "cube".to_string()))
///     .unwrap();
///
/// let cube = manager
///     .take_out(&TrashConfig::new("cube").position(Vec3::new(0.0, 2.0, 0.0)))
///     .unwrap();
///
/// assert_eq!(scene.world_position(cube), Some(Vec3::new(0.0, 2.0, 0.0)));
/// assert!(directory.take_in(&cube));
/// ```
pub struct TrashBinManager<S: Scene> {
    core: Arc<ManagerCore<S>>,
}

struct ManagerCore<S: Scene> {
    unique_name: String,
    root: S::Transform,

    scene: Arc<S>,
    ledger: Arc<Ledger<S>>,

    // Non-owning. The directory owns its managers.
    directory: Weak<DirectoryCore<S>>,

    bins: Mutex<BTreeMap<String, TrashBin<S>>>,
}

impl<S: Scene> TrashBinManager<S> {
    pub(crate) fn new(
        unique_name: String,
        root: S::Transform,
        scene: Arc<S>,
        ledger: Arc<Ledger<S>>,
        directory: Weak<DirectoryCore<S>>,
    ) -> Self {
        Self {
            core: Arc::new(ManagerCore {
                unique_name,
                root,
                scene,
                ledger,
                directory,
                bins: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// The name under which the manager is registered in its directory.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core.unique_name
    }

    /// The root shared by all bins that do not have their own root.
    #[must_use]
    pub fn root(&self) -> &S::Transform {
        &self.core.root
    }

    /// Creates a bin, sets it up under the manager root and preloads it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateBin`] if the manager already has a bin with the same name. No
    /// objects are instantiated in that case.
    pub fn create_bin(&self, spec: BinSpec<S::Prefab>) -> Result<TrashBin<S>> {
        let mut bins = self.lock_bins();

        match bins.entry(spec.name.clone()) {
            Entry::Occupied(_) => {
                tracing::error!(
                    manager = %self.core.unique_name,
                    bin = %spec.name,
                    "bin name is already used"
                );

                Err(Error::DuplicateBin {
                    manager: self.core.unique_name.clone(),
                    bin: spec.name,
                })
            }
            Entry::Vacant(entry) => {
                let bin = TrashBin::new(
                    spec,
                    Arc::clone(&self.core.scene),
                    Arc::clone(&self.core.ledger),
                );
                bin.setup(&self.core.root);

                tracing::debug!(
                    manager = %self.core.unique_name,
                    bin = %bin.name(),
                    "bin created"
                );

                Ok(entry.insert(bin).clone())
            }
        }
    }

    /// The bin named `name`, if the manager has one.
    #[must_use]
    pub fn bin(&self, name: &str) -> Option<TrashBin<S>> {
        self.lock_bins().get(name).cloned()
    }

    /// The names of all bins, in ascending order.
    #[must_use]
    pub fn bin_names(&self) -> Vec<String> {
        self.lock_bins().keys().cloned().collect()
    }

    /// Takes a trash out of the bin named in `config` and places it as `config` describes.
    ///
    /// The trash is first attached to the configured parent (or detached from any parent), then
    /// moved and rotated, relative to the parent if the config asks for local placement and has
    /// a parent, otherwise relative to the scene.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BinNotFound`] if the manager has no bin with the configured name.
    pub fn take_out(&self, config: &TrashConfig<S::Transform>) -> Result<S::Object> {
        let bins = self.lock_bins();

        let Some(bin) = bins.get(config.bin_name()) else {
            tracing::error!(
                manager = %self.core.unique_name,
                bin = %config.bin_name(),
                "cannot take out trash from a bin that does not exist"
            );

            return Err(self.bin_not_found(config.bin_name()));
        };

        let trash = bin.take_out(config.is_active);
        let object = trash.object();

        let scene = &self.core.scene;
        let space = config.space();

        scene.set_parent(object, config.parent.as_ref());
        scene.set_position(object, config.position, space);
        scene.set_rotation(object, config.rotation, space);

        Ok(object.clone())
    }

    /// Takes in every taken-out trash of the bin named `bin_name`, or of every bin if `None`.
    ///
    /// Returns the number of trashes taken in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BinNotFound`] if a bin name is given and the manager has no such bin.
    pub fn take_in_all(&self, bin_name: Option<&str>) -> Result<usize> {
        let bins = self.lock_bins();

        match bin_name {
            Some(name) => match bins.get(name) {
                Some(bin) => Ok(bin.take_in_all()),
                None => {
                    tracing::error!(
                        manager = %self.core.unique_name,
                        bin = %name,
                        "cannot take in trashes of a bin that does not exist"
                    );

                    Err(self.bin_not_found(name))
                }
            },
            None => Ok(bins
                .values()
                .map(TrashBin::take_in_all)
                .fold(0_usize, usize::saturating_add)),
        }
    }

    /// Whether the manager is still registered in its directory.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.directory()
            .and_then(|directory| directory.lookup_quiet(&self.core.unique_name))
            .is_some_and(|registered| registered.ptr_eq(self))
    }

    /// Removes the manager from its directory.
    ///
    /// Trashes that are taken out stay taken out, and the bins keep working for anyone who
    /// still holds them. Returns `false` if the manager was not registered.
    pub fn deactivate(&self) -> bool {
        self.directory()
            .is_some_and(|directory| directory.unregister(self))
    }

    /// Whether `self` and `other` are the same manager.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    fn directory(&self) -> Option<Directory<S>> {
        self.core.directory.upgrade().map(Directory::from_core)
    }

    fn lock_bins(&self) -> MutexGuard<'_, BTreeMap<String, TrashBin<S>>> {
        self.core.bins.lock().expect(ERR_POISONED_LOCK)
    }

    fn bin_not_found(&self, bin: &str) -> Error {
        Error::BinNotFound {
            manager: self.core.unique_name.clone(),
            bin: bin.to_string(),
        }
    }
}

impl<S: Scene> Clone for TrashBinManager<S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<S: Scene> Debug for TrashBinManager<S> {
    #[cfg_attr(test, mutants::skip)] // Formatting only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrashBinManager")
            .field("unique_name", &self.core.unique_name)
            .field("root", &self.core.root)
            .field("bins", &self.bin_names())
            .finish_non_exhaustive()
    }
}
