use crate::{Quat, Space, Vec3};

/// Describes which bin to take a trash out of and where to put it.
///
/// By default the trash is shown, has no parent and is placed at the scene origin with no
/// rotation.
///
/// # Examples
///
/// ```
/// use trash_bin::{Quat, TrashConfig, Vec3};
///
/// let config: TrashConfig<u64> = TrashConfig::new("cube")
///     .position(Vec3::new(0.0, 1.0, 0.0))
///     .rotation(Quat::from_rotation_y(45.0_f32.to_radians()));
///
/// // Attached to a parent, positioned relative to it.
/// let config = TrashConfig::new("muzzle-flash")
///     .parent(7_u64)
///     .position(Vec3::new(0.0, 0.0, 0.5))
///     .local(true);
/// ```
#[derive(Clone, Debug)]
#[must_use]
pub struct TrashConfig<T> {
    pub(crate) bin_name: String,
    pub(crate) parent: Option<T>,
    pub(crate) position: Vec3,
    pub(crate) rotation: Quat,
    pub(crate) is_local: bool,
    pub(crate) is_active: bool,
}

impl<T> TrashConfig<T> {
    /// Creates a config that takes a trash out of the bin named `bin_name`.
    pub fn new(bin_name: impl Into<String>) -> Self {
        Self {
            bin_name: bin_name.into(),
            parent: None,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            is_local: false,
            is_active: true,
        }
    }

    /// Attaches the taken-out trash to `parent`.
    pub fn parent(mut self, parent: T) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets where the taken-out trash is placed.
    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets how the taken-out trash is rotated.
    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets whether position and rotation are relative to the parent.
    ///
    /// Has no effect without a parent: position and rotation are then always relative to the
    /// scene.
    pub fn local(mut self, is_local: bool) -> Self {
        self.is_local = is_local;
        self
    }

    /// Sets whether the taken-out trash is shown.
    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// The name of the bin to take a trash out of.
    #[must_use]
    pub fn bin_name(&self) -> &str {
        &self.bin_name
    }

    /// The space in which position and rotation are applied.
    #[must_use]
    pub fn space(&self) -> Space {
        if self.is_local && self.parent.is_some() {
            Space::Local
        } else {
            Space::World
        }
    }
}
