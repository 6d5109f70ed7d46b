//! Integration tests for the `trash_bin` package.
//!
//! These exercise the public API end to end: a directory with managers, bins and a headless
//! scene, driven the way a game loop would drive it.

use std::sync::Arc;

use trash_bin::{
    BinSpec, Directory, Error, HeadlessScene, ManagerConfig, NodeId, Quat, Scene, TrashBinManager,
    TrashConfig, Vec3,
};

fn setup() -> (
    Arc<HeadlessScene>,
    Directory<HeadlessScene>,
    TrashBinManager<HeadlessScene>,
) {
    let scene = Arc::new(HeadlessScene::new());
    let directory = Directory::new(Arc::clone(&scene));
    let manager = directory
        .activate("trash-bin", scene.create_root("trash-bin", None))
        .unwrap();

    (scene, directory, manager)
}

fn spawn_config() -> TrashConfig<NodeId> {
    TrashConfig::new("cube")
        .position(Vec3::ZERO)
        .rotation(Quat::IDENTITY)
        .active(true)
}

#[test]
fn cube_spawner_scenario() {
    let (_scene, directory, manager) = setup();
    let cubes = manager
        .create_bin(BinSpec::new("cube", "cube".to_string()).preload_count(1))
        .unwrap();

    let h1 = directory.take_out("trash-bin", &spawn_config()).unwrap();
    assert_eq!(cubes.len(), 1);
    assert_eq!(cubes.busy_count(), 1);

    let h2 = directory.take_out("trash-bin", &spawn_config()).unwrap();
    assert_ne!(h1, h2);
    assert_eq!(cubes.len(), 2);
    assert_eq!(cubes.free_count(), 0);

    assert!(directory.take_in(&h1));
    assert_eq!(cubes.free_count(), 1);

    assert_eq!(directory.take_in_all("trash-bin", Some("cube")).unwrap(), 1);
    assert_eq!(cubes.free_count(), 2);
    assert_eq!(cubes.busy_count(), 0);
}

#[test]
fn preload_before_any_take_out() {
    let (scene, _directory, manager) = setup();

    let bin = manager
        .create_bin(BinSpec::new("bullet", "bullet".to_string()).preload_count(16))
        .unwrap();

    assert_eq!(bin.free_count(), 16);
    assert_eq!(bin.busy_count(), 0);
    assert_eq!(scene.instantiated_count(), 16);
}

#[test]
fn registry_names_are_unique() {
    let (scene, directory, first) = setup();

    let second = directory.activate("trash-bin", scene.create_root("impostor", None));

    assert!(matches!(second, Err(Error::DuplicateManagerName { .. })));
    assert!(directory.lookup("trash-bin").unwrap().ptr_eq(&first));
    assert_eq!(directory.len(), 1);
}

#[test]
fn bulk_reclaim_returns_every_take_out() {
    let (_scene, directory, manager) = setup();
    let bin = manager
        .create_bin(BinSpec::new("cube", "cube".to_string()).preload_count(0))
        .unwrap();

    let taken = (0..7)
        .map(|_| directory.take_out("trash-bin", &spawn_config()).unwrap())
        .collect::<Vec<_>>();

    assert_eq!(directory.take_in_all("trash-bin", None).unwrap(), 7);
    assert_eq!(bin.busy_count(), 0);
    assert_eq!(bin.free_count(), 7);

    // Reclaimed in ascending id order, which is also creation order here.
    let expected = taken
        .iter()
        .map(|object| directory.trash(object).unwrap().id())
        .collect::<Vec<_>>();
    assert_eq!(bin.free_ids(), expected);
}

#[test]
fn take_in_twice_is_a_no_op() {
    let (_scene, directory, manager) = setup();
    manager
        .create_bin(BinSpec::new("cube", "cube".to_string()))
        .unwrap();

    let object = directory.take_out("trash-bin", &spawn_config()).unwrap();

    assert!(directory.take_in(&object));
    assert!(!directory.take_in(&object));
}

#[test]
fn reused_object_reflects_latest_request() {
    let (scene, directory, manager) = setup();
    manager
        .create_bin(BinSpec::new("cube", "cube".to_string()))
        .unwrap();

    let first = directory.take_out("trash-bin", &spawn_config()).unwrap();
    assert!(directory.take_in(&first));

    let again = directory
        .take_out(
            "trash-bin",
            &TrashConfig::new("cube")
                .position(Vec3::new(3.0, 0.0, 0.0))
                .active(false),
        )
        .unwrap();

    assert_eq!(again, first);
    assert_eq!(scene.is_active(again), Some(false));
    assert_eq!(scene.world_position(again), Some(Vec3::new(3.0, 0.0, 0.0)));
}

#[test]
fn free_and_busy_stay_disjoint() {
    let (_scene, directory, manager) = setup();
    let bin = manager
        .create_bin(BinSpec::new("cube", "cube".to_string()).preload_count(3))
        .unwrap();

    let a = directory.take_out("trash-bin", &spawn_config()).unwrap();
    let _b = directory.take_out("trash-bin", &spawn_config()).unwrap();
    assert!(directory.take_in(&a));
    let _c = directory.take_out("trash-bin", &spawn_config()).unwrap();

    let free = bin.free_ids();
    let busy = bin.busy_ids();

    assert!(free.iter().all(|id| !busy.contains(id)));
    assert_eq!(free.len() + busy.len(), bin.len());
}

#[test]
fn removed_object_is_no_longer_pooled() {
    let (scene, directory, manager) = setup();
    let bin = manager
        .create_bin(BinSpec::new("cube", "cube".to_string()))
        .unwrap();

    let object = directory.take_out("trash-bin", &spawn_config()).unwrap();
    let trash = directory.trash(&object).unwrap();

    assert!(bin.remove(&trash));
    assert!(bin.is_empty());
    assert!(directory.trash(&object).is_none());
    assert!(!directory.take_in(&object));

    // The object itself still exists in the scene; it simply is not pooled any more.
    assert_eq!(scene.name(object).as_deref(), Some("cube"));
}

#[test]
fn adopted_object_moves_between_bins() {
    let (_scene, directory, manager) = setup();
    let cubes = manager
        .create_bin(BinSpec::new("cube", "cube".to_string()))
        .unwrap();
    let debris = manager
        .create_bin(BinSpec::new("debris", "debris".to_string()).preload_count(0))
        .unwrap();

    let object = directory.take_out("trash-bin", &spawn_config()).unwrap();
    let trash = debris.adopt(object);

    assert!(cubes.is_empty());
    assert_eq!(debris.free_ids(), vec![trash.id()]);

    // Taking it in again is a no-op because the new bin holds it as free.
    assert!(!directory.take_in(&object));

    let reused = manager.take_out(&TrashConfig::new("debris")).unwrap();
    assert_eq!(reused, object);
    assert!(directory.take_in(&object));
    assert_eq!(debris.free_count(), 1);
}

#[test]
fn configured_manager_matches_configuration() {
    let scene = Arc::new(HeadlessScene::new());
    let directory = Directory::new(Arc::clone(&scene));

    let config = ManagerConfig::from_toml_str(
        r#"
        unique_name = "effects"

        [[bins]]
        name = "spark"
        prefab = "fx/spark"
        preload_count = 8
        has_own_root = true

        [[bins]]
        name = "smoke"
        prefab = "fx/smoke"
        preload_count = 0
        "#,
    )
    .unwrap();

    let root = scene.create_root("effects", None);
    let manager = directory
        .activate_from_config(&config, root, |key| {
            key.strip_prefix("fx/").map(str::to_string)
        })
        .unwrap();

    let sparks = manager.bin("spark").unwrap();
    let spark_root = sparks.root().unwrap();

    assert_eq!(sparks.free_count(), 8);
    assert_eq!(scene.name(spark_root).as_deref(), Some("spark"));
    assert_eq!(scene.parent(spark_root), Some(root));
    assert_eq!(scene.children(spark_root).len(), 8);

    let smoke = directory
        .take_out("effects", &TrashConfig::new("smoke"))
        .unwrap();
    assert_eq!(scene.name(smoke).as_deref(), Some("smoke"));
}

#[test]
fn deactivated_manager_is_not_found() {
    let (_scene, directory, manager) = setup();
    manager
        .create_bin(BinSpec::new("cube", "cube".to_string()))
        .unwrap();

    let object = directory.take_out("trash-bin", &spawn_config()).unwrap();
    assert!(directory.deactivate("trash-bin"));

    assert!(matches!(
        directory.take_out("trash-bin", &spawn_config()),
        Err(Error::ManagerNotFound { .. })
    ));

    // Objects taken out before deactivation can still be returned.
    assert!(directory.take_in(&object));
}
