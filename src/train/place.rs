//! Placement of a train's cars along its path curve.
//!
//! One pass reads the train settings, prepares fresh arc-length samplers for
//! the path and the optional rail, then walks the cars front to back. Each car
//! gets three samples: the body and the first wheel share the car's offset,
//! the second wheel trails by the wheel distance. The wheels look along the
//! path tangent, the body looks at the second wheel. The next car starts one
//! car length behind.
//!
//! Whatever the outcome, the pass ends by writing a [`PlacementReport`] into
//! the train's settings. Transforms written before a failure are kept.

use log::{debug, warn};

use crate::geom::{
    ArcLengthSampler, Curve3, CurveSampler, DEFAULT_SAMPLER_RESOLUTION, Point3, SamplerError,
    SplineCurve, Transform, Vec3,
};
use crate::scene::{CarParts, NodeId, Scene};

use super::config::{DEFAULT_UP, PlacementReport, TrainConfig};
use super::offset::{normalize_offset, to_relative};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlacementError {
    #[error("{0} does not carry train settings")]
    InvalidTrain(NodeId),
    #[error("no path curve is set")]
    NoPath,
    #[error("path curve has zero length")]
    ZeroLength,
    #[error("train has no cars")]
    NoCars,
    #[error("car {index} ('{name}') is missing one of its three parts")]
    MalformedCar { index: usize, name: String },
    #[error("could not prepare curve sampling: {0}")]
    OutOfResources(#[from] SamplerError),
}

/// Offsets and transforms computed for one car.
#[derive(Debug, Clone, PartialEq)]
pub struct CarPlacement {
    pub car: NodeId,
    pub main_offset: f64,
    pub wheel_a_offset: f64,
    pub wheel_b_offset: f64,
    pub main: Transform,
    pub wheel_a: Transform,
    pub wheel_b: Transform,
}

/// Report of a successful pass together with the per-car details.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementTrace {
    pub report: PlacementReport,
    pub cars: Vec<CarPlacement>,
}

/// Places every car of `train` and returns the status written to the train.
pub fn place(scene: &mut Scene, train: NodeId) -> Result<PlacementReport, PlacementError> {
    place_with_trace(scene, train).map(|trace| trace.report)
}

/// Like [`place`], also returning the offsets and transforms used per car.
pub fn place_with_trace(scene: &mut Scene, train: NodeId) -> Result<PlacementTrace, PlacementError> {
    place_with_sampler::<ArcLengthSampler>(scene, train)
}

/// Runs a placement pass with an explicit sampler implementation.
pub fn place_with_sampler<S: CurveSampler>(
    scene: &mut Scene,
    train: NodeId,
) -> Result<PlacementTrace, PlacementError> {
    let mut progress = Progress::default();
    let outcome = run_pass::<S>(scene, train, &mut progress);

    let report = PlacementReport {
        car_count: progress.car_count,
        track_length: progress.track_length,
        error: outcome.as_ref().err().map(ToString::to_string),
    };
    if let Some(config) = scene.train_config_mut(train) {
        config.info = report.clone();
    }
    scene.clear_dirty(train);

    match &outcome {
        Ok(_) => debug!("placed {} cars on a track of length {:?}", report.car_count, report.track_length),
        Err(err) => debug!("placement of {train} stopped: {err}"),
    }

    outcome.map(|cars| PlacementTrace { report, cars })
}

/// What is known so far during a pass, reported on every exit path.
#[derive(Debug, Default)]
struct Progress {
    car_count: usize,
    track_length: Option<f64>,
}

/// World-space sample of one offset along the path.
#[derive(Debug, Clone, Copy)]
struct TrackSample {
    position: Point3,
    tangent: Vec3,
    up_reference: Point3,
}

struct Track<S> {
    path: S,
    rail: Option<S>,
}

impl<S: CurveSampler> Track<S> {
    fn sample(&self, offset: f64) -> TrackSample {
        let t = self.path.uniform_to_natural(offset);
        let position = self.path.sample_point(t);
        let tangent = self.path.sample_tangent(t);
        let up_reference = match &self.rail {
            Some(rail) => rail.sample_point(rail.uniform_to_natural(offset)),
            None => position + DEFAULT_UP,
        };
        TrackSample {
            position,
            tangent,
            up_reference,
        }
    }
}

fn run_pass<S: CurveSampler>(
    scene: &mut Scene,
    train: NodeId,
    progress: &mut Progress,
) -> Result<Vec<CarPlacement>, PlacementError> {
    let config = scene
        .train_config(train)
        .cloned()
        .ok_or(PlacementError::InvalidTrain(train))?;
    let path_id = config.path.ok_or(PlacementError::NoPath)?;
    let resolution = config.subdivision.unwrap_or(DEFAULT_SAMPLER_RESOLUTION);

    let path = scene.resolve_curve(path_id).ok_or(PlacementError::NoPath)?;
    let path = init_sampler::<S>(path, resolution)?;
    let path_length = path.length();
    progress.track_length = Some(path_length);
    if is_zero_length(path_length) {
        return Err(PlacementError::ZeroLength);
    }

    let rail = match config.rail {
        Some(rail_id) => match scene.resolve_curve(rail_id) {
            Some(curve) => Some(init_sampler::<S>(curve, resolution)?),
            None => {
                warn!("rail {rail_id} of {train} does not resolve to a spline; using the default up vector");
                None
            }
        },
        None => None,
    };
    let track = Track { path, rail };

    let cars = scene.children(train).to_vec();
    if cars.is_empty() {
        return Err(PlacementError::NoCars);
    }

    let mut placements = Vec::with_capacity(cars.len());
    let mut current_offset = config.offset;
    for (index, &car) in cars.iter().enumerate() {
        let (car_length, wheel_distance) = resolve_car_attributes(scene, car, &config);
        let rel_wheel_distance = to_relative(wheel_distance, path_length);
        let rel_length = to_relative(car_length, path_length);

        let main_offset = normalize_offset(current_offset, config.circular);
        let wheel_a_offset = main_offset;
        let wheel_b_offset = normalize_offset(wheel_a_offset - rel_wheel_distance, true);

        let parts = scene
            .car_parts(car)
            .ok_or_else(|| PlacementError::MalformedCar {
                index: index + 1,
                name: scene.name(car).unwrap_or_default().to_owned(),
            })?;

        debug!("car {car}: offsets main={main_offset:.6} wheel_a={wheel_a_offset:.6} wheel_b={wheel_b_offset:.6}");

        let main = track.sample(main_offset);
        let wheel_a = track.sample(wheel_a_offset);
        let wheel_b = track.sample(wheel_b_offset);

        let wheel_a_matrix =
            Transform::target_align(wheel_a.position, wheel_a.position + wheel_a.tangent, wheel_a.up_reference);
        let wheel_b_matrix =
            Transform::target_align(wheel_b.position, wheel_b.position + wheel_b.tangent, wheel_b.up_reference);
        let main_matrix = Transform::target_align(main.position, wheel_b.position, main.up_reference);

        write_car(scene, car, parts, main_matrix, wheel_a_matrix, wheel_b_matrix);

        placements.push(CarPlacement {
            car,
            main_offset,
            wheel_a_offset,
            wheel_b_offset,
            main: main_matrix,
            wheel_a: wheel_a_matrix,
            wheel_b: wheel_b_matrix,
        });

        current_offset -= rel_length;
        progress.car_count = index + 1;
    }

    Ok(placements)
}

fn init_sampler<S: CurveSampler>(curve: &SplineCurve, resolution: usize) -> Result<S, SamplerError> {
    S::init(curve, curve.domain(), resolution)
}

// Exact comparison: near-zero tracks are still placed.
#[allow(clippy::float_cmp)]
fn is_zero_length(length: f64) -> bool {
    length == 0.0
}

/// Length and wheel distance of `car`, from its override when it has one.
/// The override's label follows the car's current name.
fn resolve_car_attributes(scene: &mut Scene, car: NodeId, config: &TrainConfig) -> (f64, f64) {
    let name = scene.name(car).unwrap_or_default().to_owned();
    match scene.car_override_mut(car) {
        Some(car_override) => {
            car_override.label = name;
            (car_override.length, car_override.wheel_distance)
        }
        None => (config.default_length, config.default_wheel_distance),
    }
}

/// Writes the car transforms and puts the scales of all four nodes back.
fn write_car(
    scene: &mut Scene,
    car: NodeId,
    parts: CarParts,
    main: Transform,
    wheel_a: Transform,
    wheel_b: Transform,
) {
    let writes = [
        (car, main),
        (parts.main, main),
        (parts.wheel_a, wheel_a),
        (parts.wheel_b, wheel_b),
    ];

    for (node, matrix) in writes {
        if let Some(scene_node) = scene.node_mut(node) {
            let scale = scene_node.scale();
            scene_node.set_world_transform(matrix);
            scene_node.set_scale(scale);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{CurveShape, Line3, Tolerance};
    use crate::train::{CarOverride, add_car};

    fn straight_track(scene: &mut Scene, length: f64) -> NodeId {
        let line = SplineCurve::new(CurveShape::Line(Line3::new(
            Point3::ORIGIN,
            Point3::new(length, 0.0, 0.0),
        )));
        let path = scene.add_spline("track", line);
        let train = scene.add_node("train").unwrap();
        scene.set_train_config(train, TrainConfig::with_path(path)).unwrap();
        train
    }

    #[test]
    fn single_car_wheel_b_trails_by_wheel_distance() {
        let mut scene = Scene::new();
        let train = straight_track(&mut scene, 100.0);
        add_car(&mut scene, train).unwrap();

        let trace = place_with_trace(&mut scene, train).unwrap();
        let car = &trace.cars[0];
        assert_eq!(car.main_offset, 0.0);
        assert_eq!(car.wheel_a_offset, 0.0);
        assert!((car.wheel_b_offset - 0.75).abs() < 1e-12);

        let tol = Tolerance::LOOSE;
        assert!(tol.approx_eq_point3(car.wheel_b.origin(), Point3::new(75.0, 0.0, 0.0)));
        assert!(tol.approx_eq_point3(car.main.origin(), Point3::ORIGIN));
        assert_eq!(trace.report.car_count, 1);
        assert!(tol.approx_eq_f64(trace.report.track_length.unwrap(), 100.0));
    }

    #[test]
    fn wheels_face_along_the_tangent() {
        let mut scene = Scene::new();
        let train = straight_track(&mut scene, 100.0);
        add_car(&mut scene, train).unwrap();
        scene.train_config_mut(train).unwrap().offset = 0.5;

        let trace = place_with_trace(&mut scene, train).unwrap();
        let car = &trace.cars[0];
        let tol = Tolerance::LOOSE;
        assert!(tol.approx_eq_vec3(car.wheel_a.z_axis(), Vec3::X));
        // Body looks back at the trailing wheel.
        assert!(tol.approx_eq_vec3(car.main.z_axis(), -Vec3::X));
    }

    #[test]
    fn status_is_written_on_every_exit() {
        let mut scene = Scene::new();
        let train = scene.add_node("train").unwrap();
        scene.set_train_config(train, TrainConfig::default()).unwrap();

        assert_eq!(place(&mut scene, train), Err(PlacementError::NoPath));
        let info = &scene.train_config(train).unwrap().info;
        assert_eq!(info.car_count, 0);
        assert_eq!(info.track_length, None);
        assert_eq!(info.error.as_deref(), Some("no path curve is set"));
    }

    #[test]
    fn missing_train_settings_is_invalid() {
        let mut scene = Scene::new();
        let plain = scene.add_node("plain").unwrap();
        assert_eq!(place(&mut scene, plain), Err(PlacementError::InvalidTrain(plain)));
    }

    #[test]
    fn override_label_follows_car_name() {
        let mut scene = Scene::new();
        let train = straight_track(&mut scene, 100.0);
        let car = add_car(&mut scene, train).unwrap();
        scene.set_name(car, "Locomotive").unwrap();

        place(&mut scene, train).unwrap();
        assert_eq!(scene.car_override(car).map(|o| o.label.as_str()), Some("Locomotive"));
    }

    #[test]
    fn override_supersedes_defaults() {
        let mut scene = Scene::new();
        let train = straight_track(&mut scene, 100.0);
        let first = add_car(&mut scene, train).unwrap();
        add_car(&mut scene, train).unwrap();
        scene
            .attach_car_override(
                first,
                CarOverride {
                    length: 10.0,
                    wheel_distance: 5.0,
                    label: String::new(),
                },
            )
            .unwrap();
        scene.train_config_mut(train).unwrap().offset = 0.5;

        let trace = place_with_trace(&mut scene, train).unwrap();
        assert!((trace.cars[0].wheel_b_offset - 0.45).abs() < 1e-12);
        assert!((trace.cars[1].main_offset - 0.4).abs() < 1e-12);
    }

    struct FailingSampler;

    impl CurveSampler for FailingSampler {
        fn init(_: &SplineCurve, _: (f64, f64), _: usize) -> Result<Self, SamplerError> {
            Err(SamplerError::NonFiniteCurve)
        }

        fn length(&self) -> f64 {
            0.0
        }

        fn uniform_to_natural(&self, u: f64) -> f64 {
            u
        }

        fn sample_point(&self, _: f64) -> Point3 {
            Point3::ORIGIN
        }

        fn sample_tangent(&self, _: f64) -> Vec3 {
            Vec3::ZERO
        }
    }

    #[test]
    fn sampler_failure_is_out_of_resources() {
        let mut scene = Scene::new();
        let train = straight_track(&mut scene, 100.0);
        add_car(&mut scene, train).unwrap();

        let result = place_with_sampler::<FailingSampler>(&mut scene, train);
        assert_eq!(result, Err(PlacementError::OutOfResources(SamplerError::NonFiniteCurve)));
        assert!(scene.train_config(train).unwrap().info.error.is_some());
    }
}
