//! Train placement: settings, offset arithmetic, the placement pass and car
//! creation.

mod add_car;
mod config;
mod offset;
mod place;

pub use add_car::{AddCarError, MAIN_PART_NAME, WHEEL_A_NAME, WHEEL_B_NAME, add_car};
pub use config::{
    CarOverride, DEFAULT_CAR_LENGTH, DEFAULT_UP, DEFAULT_WHEEL_DISTANCE, PlacementReport, TrainConfig,
};
pub use offset::{normalize_offset, to_relative};
pub use place::{CarPlacement, PlacementError, PlacementTrace, place, place_with_sampler, place_with_trace};
