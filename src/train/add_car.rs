//! Appending a new, correctly shaped car to a train.

use log::debug;

use crate::scene::{NodeId, Scene, SceneError};

use super::config::CarOverride;

pub const MAIN_PART_NAME: &str = "Main";
pub const WHEEL_A_NAME: &str = "Wheel 1";
pub const WHEEL_B_NAME: &str = "Wheel 2";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddCarError {
    #[error("{0} is not a train")]
    InvalidTrain(NodeId),
    #[error("could not allocate car nodes: {0}")]
    AllocationFailure(#[source] SceneError),
}

/// Appends a car with its Main, Wheel 1 and Wheel 2 parts as the last child of
/// `train`, and returns the new car.
///
/// The car gets an override holding a copy of the train's current defaults.
/// If any step fails, the nodes created by this call are released again and
/// the scene is left as it was.
pub fn add_car(scene: &mut Scene, train: NodeId) -> Result<NodeId, AddCarError> {
    let seeded = scene
        .train_config(train)
        .map(super::TrainConfig::seed_override)
        .ok_or(AddCarError::InvalidTrain(train))?;
    let sequence = scene.children(train).len() + 1;

    let names = [
        format!("Car {sequence}"),
        MAIN_PART_NAME.to_owned(),
        WHEEL_A_NAME.to_owned(),
        WHEEL_B_NAME.to_owned(),
    ];
    let mut allocated = [NodeId::default(); 4];
    for (slot, name) in names.into_iter().enumerate() {
        match scene.add_node(name) {
            Ok(id) => allocated[slot] = id,
            Err(err) => {
                release_all(scene, &allocated[..slot]);
                return Err(AddCarError::AllocationFailure(err));
            }
        }
    }

    let car = link_car(scene, train, allocated, seeded)?;
    scene.mark_dirty(train);

    debug!("appended car {sequence} as {car} under {train}");
    Ok(car)
}

/// Wires freshly allocated `[car, main, wheel_a, wheel_b]` under `train`.
/// On failure all four nodes are released.
fn link_car(
    scene: &mut Scene,
    train: NodeId,
    nodes: [NodeId; 4],
    seeded: CarOverride,
) -> Result<NodeId, AddCarError> {
    let [car, main, wheel_a, wheel_b] = nodes;
    let linked = scene
        .attach_car_override(car, seeded)
        .and_then(|()| assemble(scene, train, car, [main, wheel_a, wheel_b]));
    match linked {
        Ok(()) => Ok(car),
        Err(err) => {
            release_all(scene, &nodes);
            Err(AddCarError::AllocationFailure(err))
        }
    }
}

fn assemble(scene: &mut Scene, train: NodeId, car: NodeId, parts: [NodeId; 3]) -> Result<(), SceneError> {
    for part in parts {
        scene.append_child(car, part)?;
    }
    scene.append_child(train, car)
}

fn release_all(scene: &mut Scene, nodes: &[NodeId]) {
    for &id in nodes {
        scene.release_node(id);
    }
}
