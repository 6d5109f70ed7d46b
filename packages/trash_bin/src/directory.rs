use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt::{self, Debug};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::constants::ERR_POISONED_LOCK;
use crate::ledger::Ledger;
use crate::{
    BinSpec, Error, ManagerConfig, Result, Scene, Trash, TrashBinManager, TrashConfig,
};

/// Looks up [`TrashBinManager`]s by their unique name.
///
/// A directory is the entry point of the package: it owns the [`Scene`] that all of its managers
/// instantiate objects in, keeps every active manager reachable by name and knows which
/// [`Trash`] wraps which object, so objects can be returned without knowing where they came from.
///
/// Create one directory per scene and pass clones of it to whoever needs to take out or return
/// objects. All clones refer to the same directory.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use trash_bin::{BinSpec, Directory, HeadlessScene, Scene, TrashConfig};
///
/// let scene = Arc::new(HeadlessScene::new());
/// let directory = Directory::new(Arc::clone(&scene));
///
/// let manager = directory
///     .activate("trash-bin", scene.create_root("trash-bin", None))
///     .unwrap();
/// manager
///     .create_bin(BinSpec::new("cube", "cube".to_string()))
///     .unwrap();
///
/// // Anywhere else, with only the directory at hand:
/// let cube = directory
///     .take_out("trash-bin", &TrashConfig::new("cube"))
///     .unwrap();
///
/// assert!(directory.take_in(&cube));
/// assert_eq!(directory.take_in_all("trash-bin", None).unwrap(), 0);
/// ```
pub struct Directory<S: Scene> {
    core: Arc<DirectoryCore<S>>,
}

pub(crate) struct DirectoryCore<S: Scene> {
    scene: Arc<S>,
    ledger: Arc<Ledger<S>>,
    managers: Mutex<BTreeMap<String, TrashBinManager<S>>>,
}

impl<S: Scene> Directory<S> {
    /// Creates an empty directory for managers that live in `scene`.
    #[must_use]
    pub fn new(scene: Arc<S>) -> Self {
        Self {
            core: Arc::new(DirectoryCore {
                scene,
                ledger: Arc::new(Ledger::new()),
                managers: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    pub(crate) fn from_core(core: Arc<DirectoryCore<S>>) -> Self {
        Self { core }
    }

    /// The scene that objects of this directory live in.
    #[must_use]
    pub fn scene(&self) -> &Arc<S> {
        &self.core.scene
    }

    /// Creates a manager and registers it under `unique_name`.
    ///
    /// Bins of the manager that do not have their own root park their free trashes under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyManagerName`] if `unique_name` is empty and
    /// [`Error::DuplicateManagerName`] if another active manager already uses it. Nothing is
    /// registered in either case.
    pub fn activate(
        &self,
        unique_name: impl Into<String>,
        root: S::Transform,
    ) -> Result<TrashBinManager<S>> {
        let unique_name = unique_name.into();

        if unique_name.is_empty() {
            tracing::error!("a trash bin manager must have a unique name");
            return Err(Error::EmptyManagerName);
        }

        let mut managers = self.lock_managers();

        match managers.entry(unique_name) {
            Entry::Occupied(entry) => {
                tracing::error!(manager = %entry.key(), "the manager name is already used");

                Err(Error::DuplicateManagerName {
                    name: entry.key().clone(),
                })
            }
            Entry::Vacant(entry) => {
                let manager = TrashBinManager::new(
                    entry.key().clone(),
                    root,
                    Arc::clone(&self.core.scene),
                    Arc::clone(&self.core.ledger),
                    Arc::downgrade(&self.core),
                );

                tracing::debug!(manager = %entry.key(), "manager activated");

                Ok(entry.insert(manager).clone())
            }
        }
    }

    /// Activates a manager and creates every bin listed in `config`, in order.
    ///
    /// Prefab keys of the bins are turned into prefabs by `resolve_prefab`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPrefab`] if `resolve_prefab` returns `None` for any bin, and any
    /// error of [`activate()`][Self::activate]. Prefabs are resolved before the manager is
    /// activated, so a failure leaves nothing registered.
    pub fn activate_from_config<F>(
        &self,
        config: &ManagerConfig,
        root: S::Transform,
        mut resolve_prefab: F,
    ) -> Result<TrashBinManager<S>>
    where
        F: FnMut(&str) -> Option<S::Prefab>,
    {
        config.validate()?;

        let specs = config
            .bins
            .iter()
            .map(|bin| {
                let Some(prefab) = resolve_prefab(&bin.prefab) else {
                    tracing::error!(bin = %bin.name, prefab = %bin.prefab, "unknown prefab");

                    return Err(Error::UnknownPrefab {
                        bin: bin.name.clone(),
                        prefab: bin.prefab.clone(),
                    });
                };

                Ok(BinSpec::new(bin.name.clone(), prefab)
                    .preload_count(bin.preload_count)
                    .own_root(bin.has_own_root))
            })
            .collect::<Result<Vec<_>>>()?;

        let manager = self.activate(config.unique_name.clone(), root)?;

        for spec in specs {
            if let Err(error) = manager.create_bin(spec) {
                manager.deactivate();
                return Err(error);
            }
        }

        Ok(manager)
    }

    /// The manager registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManagerNotFound`] if no active manager has that name.
    pub fn lookup(&self, name: &str) -> Result<TrashBinManager<S>> {
        self.lookup_quiet(name).ok_or_else(|| {
            tracing::error!(manager = %name, "trash bin manager not found");

            Error::ManagerNotFound {
                name: name.to_string(),
            }
        })
    }

    /// Whether an active manager is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lock_managers().contains_key(name)
    }

    /// The number of active managers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_managers().len()
    }

    /// Whether no manager is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_managers().is_empty()
    }

    /// The names of all active managers, in ascending order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.lock_managers().keys().cloned().collect()
    }

    /// Takes a trash out of a bin of the manager named `manager_name`.
    ///
    /// See [`TrashBinManager::take_out()`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManagerNotFound`] or [`Error::BinNotFound`] if the manager or the bin
    /// does not exist.
    pub fn take_out(
        &self,
        manager_name: &str,
        config: &TrashConfig<S::Transform>,
    ) -> Result<S::Object> {
        self.lookup(manager_name)?.take_out(config)
    }

    /// Returns a taken-out object to the bin it came from.
    ///
    /// Returns `false` if the object does not belong to any bin of this directory or is not
    /// taken out.
    pub fn take_in(&self, object: &S::Object) -> bool {
        match self.trash(object) {
            Some(trash) => trash.throw_to_bin(),
            None => {
                tracing::warn!(?object, "object is not pooled, so it cannot be taken in");
                false
            }
        }
    }

    /// Takes in every taken-out trash of one bin, or of every bin if `bin_name` is `None`, of the
    /// manager named `manager_name`.
    ///
    /// Returns the number of trashes taken in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManagerNotFound`] or [`Error::BinNotFound`] if the manager or the bin
    /// does not exist.
    pub fn take_in_all(&self, manager_name: &str, bin_name: Option<&str>) -> Result<usize> {
        self.lookup(manager_name)?.take_in_all(bin_name)
    }

    /// The trash that wraps `object`, if the object belongs to a bin of this directory.
    #[must_use]
    pub fn trash(&self, object: &S::Object) -> Option<Trash<S>> {
        self.core.ledger.get(self.core.scene.instance_id(object))
    }

    /// Unregisters the manager named `name`.
    ///
    /// Taken-out trashes of the manager are not returned. Returns `false` if no manager was
    /// registered under that name.
    pub fn deactivate(&self, name: &str) -> bool {
        let removed = self.lock_managers().remove(name).is_some();

        if removed {
            tracing::debug!(manager = %name, "manager deactivated");
        }

        removed
    }

    /// Unregisters every manager. Returns the number of managers unregistered.
    pub fn clear(&self) -> usize {
        let mut managers = self.lock_managers();
        let count = managers.len();
        managers.clear();

        tracing::debug!(count, "all managers deactivated");

        count
    }

    /// Whether `self` and `other` are the same directory.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    pub(crate) fn lookup_quiet(&self, name: &str) -> Option<TrashBinManager<S>> {
        self.lock_managers().get(name).cloned()
    }

    /// Unregisters `manager` if it is the one registered under its name.
    pub(crate) fn unregister(&self, manager: &TrashBinManager<S>) -> bool {
        let mut managers = self.lock_managers();

        if managers
            .get(manager.name())
            .is_some_and(|registered| registered.ptr_eq(manager))
        {
            managers.remove(manager.name());
            tracing::debug!(manager = %manager.name(), "manager deactivated");
            true
        } else {
            false
        }
    }

    fn lock_managers(&self) -> MutexGuard<'_, BTreeMap<String, TrashBinManager<S>>> {
        self.core.managers.lock().expect(ERR_POISONED_LOCK)
    }
}

impl<S: Scene> Clone for Directory<S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<S: Scene> Debug for Directory<S> {
    #[cfg_attr(test, mutants::skip)] // Formatting only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("managers", &self.names())
            .field("ledger", &self.core.ledger)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;
    use crate::HeadlessScene;

    assert_impl_all!(Directory<HeadlessScene>: Send, Sync, Clone);

    fn directory() -> (Arc<HeadlessScene>, Directory<HeadlessScene>) {
        let scene = Arc::new(HeadlessScene::new());
        let directory = Directory::new(Arc::clone(&scene));
        (scene, directory)
    }

    #[test]
    fn empty_name_is_rejected() {
        let (scene, directory) = directory();

        let result = directory.activate("", scene.create_root("root", None));

        assert!(matches!(result, Err(Error::EmptyManagerName)));
        assert!(directory.is_empty());
    }

    #[test]
    fn duplicate_name_keeps_first_manager() {
        let (scene, directory) = directory();

        let first = directory
            .activate("trash-bin", scene.create_root("first", None))
            .unwrap();
        let second = directory.activate("trash-bin", scene.create_root("second", None));

        assert!(matches!(second, Err(Error::DuplicateManagerName { .. })));
        assert_eq!(directory.len(), 1);
        assert!(directory.lookup("trash-bin").unwrap().ptr_eq(&first));
    }

    #[test]
    fn lookup_of_unknown_manager_fails() {
        let (_scene, directory) = directory();

        assert!(matches!(
            directory.lookup("nope"),
            Err(Error::ManagerNotFound { .. })
        ));
        assert!(matches!(
            directory.take_out("nope", &TrashConfig::new("cube")),
            Err(Error::ManagerNotFound { .. })
        ));
        assert!(matches!(
            directory.take_in_all("nope", None),
            Err(Error::ManagerNotFound { .. })
        ));
    }

    #[test]
    fn take_in_of_unpooled_object_fails() {
        let (scene, directory) = directory();
        let stranger = scene.instantiate(&"stranger".to_string(), None);

        assert!(directory.trash(&stranger).is_none());
        assert!(!directory.take_in(&stranger));
    }

    #[test]
    fn deactivate_frees_the_name() {
        let (scene, directory) = directory();
        let root = scene.create_root("root", None);

        let first = directory.activate("trash-bin", root).unwrap();
        assert!(directory.deactivate("trash-bin"));
        assert!(!directory.deactivate("trash-bin"));
        assert!(!first.is_active());

        let second = directory.activate("trash-bin", root).unwrap();
        assert!(second.is_active());

        // The stale handle must not unregister its successor.
        assert!(!first.deactivate());
        assert!(directory.contains("trash-bin"));
    }

    #[test]
    fn clear_unregisters_everything() {
        let (scene, directory) = directory();
        let root = scene.create_root("root", None);

        directory.activate("a", root).unwrap();
        directory.activate("b", root).unwrap();

        assert_eq!(directory.names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(directory.clear(), 2);
        assert!(directory.is_empty());
    }

    #[test]
    fn deactivated_managers_leave_nothing_in_the_ledger() {
        let (scene, directory) = directory();
        let root = scene.create_root("root", None);

        for _ in 0..3 {
            directory
                .activate("trash-bin", root)
                .unwrap()
                .create_bin(BinSpec::new("cube", "cube".to_string()).preload_count(10))
                .unwrap();

            // One more than preloaded, so the bin also grows and holds a busy trash.
            for _ in 0..11 {
                directory
                    .take_out("trash-bin", &TrashConfig::new("cube"))
                    .unwrap();
            }

            assert_eq!(directory.core.ledger.len(), 11);
            assert!(directory.deactivate("trash-bin"));
            assert_eq!(directory.core.ledger.len(), 0);
        }

        directory
            .activate("trash-bin", root)
            .unwrap()
            .create_bin(BinSpec::new("cube", "cube".to_string()).preload_count(4))
            .unwrap();
        assert_eq!(directory.clear(), 1);
        assert_eq!(directory.core.ledger.len(), 0);
    }

    #[test]
    fn clones_share_registrations() {
        let (scene, directory) = directory();
        let clone = directory.clone();

        directory
            .activate("trash-bin", scene.create_root("root", None))
            .unwrap();

        assert!(clone.contains("trash-bin"));
        assert!(clone.ptr_eq(&directory));
    }

    #[test]
    fn activate_from_config_creates_bins() {
        let (scene, directory) = directory();
        let config = ManagerConfig::from_toml_str(
            r#"
            unique_name = "trash-bin"

            [[bins]]
            name = "cube"
            prefab = "cube"
            preload_count = 2

            [[bins]]
            name = "bullet"
            prefab = "bullet"
            has_own_root = true
            "#,
        )
        .unwrap();

        let manager = directory
            .activate_from_config(&config, scene.create_root("root", None), |key| {
                Some(key.to_string())
            })
            .unwrap();

        assert_eq!(manager.bin_names(), vec!["bullet".to_string(), "cube".to_string()]);
        assert_eq!(manager.bin("cube").unwrap().free_count(), 2);
        assert!(manager.bin("bullet").unwrap().has_own_root());
        assert_eq!(scene.instantiated_count(), 3);
    }

    #[test]
    fn activate_from_config_with_unknown_prefab_registers_nothing() {
        let (scene, directory) = directory();
        let config = ManagerConfig::from_toml_str(
            r#"
            unique_name = "trash-bin"

            [[bins]]
            name = "cube"
            prefab = "cube"
            "#,
        )
        .unwrap();

        let result =
            directory.activate_from_config(&config, scene.create_root("root", None), |_| None);

        assert!(matches!(result, Err(Error::UnknownPrefab { .. })));
        assert!(directory.is_empty());
        assert_eq!(scene.instantiated_count(), 0);
    }
}
