use std::fmt::{self, Debug, Display};

use crate::{Quat, Vec3};

/// Identity of an instantiated object, unique among all live objects of one [`Scene`].
///
/// Pools use this as the key of their busy set and the directory uses it to find the
/// [`Trash`][crate::Trash] handle that wraps an object.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Wraps a raw identity value assigned by a scene.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identity value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for InstanceId {
    #[cfg_attr(test, mutants::skip)] // Formatting only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a position or rotation is expressed relative to the parent or to the scene.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub enum Space {
    /// Relative to the parent transform.
    Local,

    /// Relative to the scene origin.
    #[default]
    World,
}

/// The world in which pooled objects live.
///
/// A scene knows how to create new objects from a template ("prefab") and how to move
/// existing objects around. The pooling core never does either on its own; it only decides
/// *when* an object needs to be created, hidden, shown or reparented.
///
/// # Reentrancy
///
/// Pools call into the scene while holding their internal lock. Implementations must not call
/// back into any [`TrashBin`][crate::TrashBin], [`TrashBinManager`][crate::TrashBinManager] or
/// [`Directory`][crate::Directory] from these methods.
pub trait Scene: Send + Sync + 'static {
    /// The template from which new objects are instantiated.
    type Prefab: Send + Sync + 'static;

    /// A reference to one instantiated object. Cloning the reference must not clone the object.
    type Object: Clone + Debug + Send + Sync + 'static;

    /// A reference to a placement context that objects can be attached to.
    type Transform: Clone + Debug + PartialEq + Send + Sync + 'static;

    /// Creates a new object from `prefab`, attached to `parent` if one is given.
    fn instantiate(&self, prefab: &Self::Prefab, parent: Option<&Self::Transform>)
    -> Self::Object;

    /// Returns the identity of an object.
    fn instance_id(&self, object: &Self::Object) -> InstanceId;

    /// Creates a new, empty placement context named `name`, attached to `parent` if one is given.
    fn create_root(&self, name: &str, parent: Option<&Self::Transform>) -> Self::Transform;

    /// Shows or hides an object.
    fn set_active(&self, object: &Self::Object, active: bool);

    /// Attaches an object to `parent`, or detaches it from any parent if `None`.
    fn set_parent(&self, object: &Self::Object, parent: Option<&Self::Transform>);

    /// Moves an object.
    fn set_position(&self, object: &Self::Object, position: Vec3, space: Space);

    /// Rotates an object.
    fn set_rotation(&self, object: &Self::Object, rotation: Quat, space: Space);
}
