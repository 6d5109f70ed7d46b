//! Spawns cubes at random rotations on every simulated key press, the way a game would spawn
//! short-lived objects, and recycles them through a trash bin.
//!
//! Pool diagnostics are logged at debug level and the pool metrics are printed at the end.

use std::f32::consts::TAU;
use std::sync::Arc;
use std::thread;

use trash_bin::{Directory, EulerRot, HeadlessScene, ManagerConfig, Quat, Scene, TrashConfig, Vec3};

const CONFIG: &str = r#"
unique_name = "trash-bin"

[[bins]]
name = "cube"
prefab = "cube"
preload_count = 1
"#;

const KEY_PRESSES: usize = 10;
const SPAWNERS: usize = 3;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Cube spawner ===");

    let scene = Arc::new(HeadlessScene::new());
    let directory = Directory::new(Arc::clone(&scene));

    let config = ManagerConfig::from_toml_str(CONFIG).expect("embedded config is valid");
    directory
        .activate_from_config(&config, scene.create_root("trash-bin", None), |key| {
            Some(key.to_string())
        })
        .expect("the directory is empty, so activation cannot fail");

    // Every spawner thread stands in for an input handler reacting to key presses.
    let spawners = (0..SPAWNERS)
        .map(|spawner| {
            let directory = directory.clone();

            thread::spawn(move || {
                #[expect(
                    clippy::cast_precision_loss,
                    reason = "spawner index is tiny, precision is irrelevant"
                )]
                let position = Vec3::new(spawner as f32 * 2.0, 0.0, 0.0);

                let mut spawned = Vec::new();

                for _ in 0..KEY_PRESSES {
                    let rotation = Quat::from_euler(
                        EulerRot::YXZ,
                        rand::random::<f32>() * TAU,
                        rand::random::<f32>() * TAU,
                        rand::random::<f32>() * TAU,
                    );

                    let cube = directory
                        .take_out(
                            "trash-bin",
                            &TrashConfig::new("cube")
                                .position(position)
                                .rotation(rotation),
                        )
                        .expect("the cube bin exists");

                    spawned.push(cube);

                    // Cubes older than a few presses are thrown back.
                    if spawned.len() > 3 {
                        let oldest = spawned.remove(0);
                        directory.take_in(&oldest);
                    }
                }
            })
        })
        .collect::<Vec<_>>();

    for spawner in spawners {
        spawner.join().expect("spawner thread panicked");
    }

    let manager = directory.lookup("trash-bin").expect("manager is active");
    let cubes = manager.bin("cube").expect("cube bin exists");

    println!(
        "Cubes: {} total, {} in use, {} free",
        cubes.len(),
        cubes.busy_count(),
        cubes.free_count()
    );
    println!(
        "Objects ever instantiated: {} (instead of {})",
        scene.instantiated_count(),
        SPAWNERS * KEY_PRESSES
    );

    let reclaimed = directory
        .take_in_all("trash-bin", None)
        .expect("manager is active");
    println!("Reclaimed {reclaimed} cubes at shutdown");

    directory.clear();

    println!();
    println!("{}", nm::Report::collect());
}
