#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Named registries of preloading object pools.
//!
//! Creating and destroying scene objects (projectiles, particles, enemies) is often far more
//! expensive than hiding an object and showing it again later. This package keeps such objects
//! around in pools: an object is taken out of its pool when needed and thrown back in when done,
//! instead of being destroyed.
//!
//! # Building blocks
//!
//! * [`Scene`] - the world the objects live in. It creates objects from prefabs and moves them
//!   around. Implement it for your engine, or use [`HeadlessScene`] where nothing is rendered.
//! * [`TrashBin`] - a pool of objects created from one prefab. Every object in a bin is either
//!   free or busy (taken out). Bins preload a configurable number of objects and grow by one
//!   object whenever a trash is taken out of a bin with no free trashes.
//! * [`Trash`] - the handle that wraps one pooled object and knows which bin owns it.
//! * [`TrashBinManager`] - a named collection of bins sharing one root in the scene. It takes out
//!   trashes by bin name and places them as described by a [`TrashConfig`].
//! * [`Directory`] - looks up managers by their unique name, and returns objects to whatever bin
//!   they came from.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use trash_bin::{BinSpec, Directory, HeadlessScene, Quat, Scene, TrashConfig, Vec3};
//!
//! let scene = Arc::new(HeadlessScene::new());
//! let directory = Directory::new(Arc::clone(&scene));
//!
//! let manager = directory
//!     .activate("trash-bin", scene.create_root("trash-bin", None))
//!     .unwrap();
//! let cubes = manager
//!     .create_bin(BinSpec::new("cube", "cube".to_string()).preload_count(1))
//!     .unwrap();
//!
//! let config = TrashConfig::new("cube")
//!     .position(Vec3::new(0.0, 0.0, 5.0))
//!     .rotation(Quat::from_rotation_y(90.0_f32.to_radians()));
//!
//! // The preloaded cube is reused.
//! let first = directory.take_out("trash-bin", &config).unwrap();
//! assert_eq!(cubes.len(), 1);
//!
//! // No free cube left, so a new one is created.
//! let second = directory.take_out("trash-bin", &config).unwrap();
//! assert_eq!(cubes.len(), 2);
//!
//! // Objects go back to their bin when no longer needed.
//! assert!(directory.take_in(&first));
//! assert_eq!(directory.take_in_all("trash-bin", Some("cube")).unwrap(), 1);
//! assert_eq!(cubes.free_count(), 2);
//! # drop(second);
//! ```
//!
//! # Thread safety
//!
//! All types are thread-safe. Each bin serializes its own operations with one lock and each
//! manager serializes bin creation and take-outs with another, so a trash is never lost, handed
//! out twice or found both free and busy.
//!
//! # Diagnostics
//!
//! Failures never panic. Operations that look something up by name return a [`Result`];
//! operations on individual trashes return `false` when they do nothing. Both also report the
//! problem through [`tracing`]. Pool activity is counted with [`nm`] events whose names start
//! with `trash_bin_`.

mod bin;
mod bin_spec;
mod config;
mod constants;
mod directory;
mod error;
mod headless;
mod ledger;
mod manager;
mod metrics;
mod scene;
mod trash;
mod trash_config;

pub use bin::*;
pub use bin_spec::*;
pub use config::*;
pub use directory::*;
pub use error::*;
pub use headless::*;
pub use manager::*;
pub use scene::*;
pub use trash::*;
pub use trash_config::*;

pub use glam::{EulerRot, Quat, Vec3};
