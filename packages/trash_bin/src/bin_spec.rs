/// Describes a [`TrashBin`][crate::TrashBin] to be created by a
/// [`TrashBinManager`][crate::TrashBinManager].
///
/// # Examples
///
/// ```
/// use trash_bin::BinSpec;
///
/// // One preloaded object, sharing the manager root.
/// let spec = BinSpec::new("cube", "cube-prefab");
///
/// // Ten preloaded objects under a dedicated root named after the bin.
/// let spec = BinSpec::new("bullet", "bullet-prefab")
///     .preload_count(10)
///     .own_root(true);
/// ```
#[derive(Clone, Debug)]
#[must_use]
pub struct BinSpec<P> {
    pub(crate) name: String,
    pub(crate) prefab: P,
    pub(crate) preload_count: usize,
    pub(crate) has_own_root: bool,
}

impl<P> BinSpec<P> {
    /// The number of objects preloaded when no explicit count is given.
    pub const DEFAULT_PRELOAD_COUNT: usize = 1;

    /// Creates a spec for a bin named `name` that instantiates `prefab`.
    pub fn new(name: impl Into<String>, prefab: P) -> Self {
        Self {
            name: name.into(),
            prefab,
            preload_count: Self::DEFAULT_PRELOAD_COUNT,
            has_own_root: false,
        }
    }

    /// Sets how many objects are created eagerly when the bin is set up.
    pub fn preload_count(mut self, count: usize) -> Self {
        self.preload_count = count;
        self
    }

    /// Sets whether the bin keeps its free objects under a dedicated root (named after the bin)
    /// instead of directly under the manager root.
    pub fn own_root(mut self, has_own_root: bool) -> Self {
        self.has_own_root = has_own_root;
        self
    }

    /// The name of the bin.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
