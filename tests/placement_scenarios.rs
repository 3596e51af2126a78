use train_driver::geom::{
    Circle3, CurveShape, Line3, Point3, Polyline3, SamplerError, SplineCurve, Tolerance, Transform, Vec3,
};
use train_driver::scene::{CurveId, NodeId, Scene};
use train_driver::train::{
    CarOverride, PlacementError, TrainConfig, add_car, normalize_offset, place, place_with_trace,
};

const TOL: Tolerance = Tolerance::LOOSE;

fn line(start: Point3, end: Point3) -> SplineCurve {
    SplineCurve::new(CurveShape::Line(Line3::new(start, end)))
}

/// Straight track of the given length along +X.
fn straight_path(scene: &mut Scene, length: f64) -> CurveId {
    scene.add_spline("Path", line(Point3::ORIGIN, Point3::new(length, 0.0, 0.0)))
}

fn train_on(scene: &mut Scene, path: CurveId, configure: impl FnOnce(&mut TrainConfig)) -> NodeId {
    let train = scene.add_node("Train").unwrap();
    let mut config = TrainConfig::with_path(path);
    configure(&mut config);
    scene.set_train_config(train, config).unwrap();
    train
}

fn with_cars(scene: &mut Scene, train: NodeId, count: usize) -> Vec<NodeId> {
    (0..count).map(|_| add_car(scene, train).unwrap()).collect()
}

fn set_car_length(scene: &mut Scene, car: NodeId, length: f64) {
    scene.car_override_mut(car).unwrap().length = length;
}

fn snapshot(scene: &Scene) -> Vec<(Option<Transform>, Option<Vec3>)> {
    (0..scene.node_count() + 8)
        .map(|i| (scene.world_transform(NodeId(i)), scene.local_scale(NodeId(i))))
        .collect()
}

#[test]
fn one_car_on_a_hundred_unit_track() {
    let mut scene = Scene::new();
    let path = straight_path(&mut scene, 100.0);
    let train = train_on(&mut scene, path, |_| {});
    let car = with_cars(&mut scene, train, 1)[0];

    let trace = place_with_trace(&mut scene, train).expect("placement succeeds");
    let placement = &trace.cars[0];
    assert_eq!(placement.main_offset, 0.0);
    assert_eq!(placement.wheel_a_offset, 0.0);
    assert!(TOL.approx_eq_f64(placement.wheel_b_offset, 0.75));

    let parts = scene.car_parts(car).unwrap();
    let wheel_b = scene.world_transform(parts.wheel_b).unwrap();
    assert!(TOL.approx_eq_point3(wheel_b.origin(), Point3::new(75.0, 0.0, 0.0)));
    let wheel_a = scene.world_transform(parts.wheel_a).unwrap();
    assert!(TOL.approx_eq_point3(wheel_a.origin(), Point3::ORIGIN));

    // Car root shares the body's matrix.
    assert_eq!(scene.world_transform(car), scene.world_transform(parts.main));
}

#[test]
fn second_car_wraps_on_circular_train() {
    let mut scene = Scene::new();
    let path = straight_path(&mut scene, 100.0);
    let train = train_on(&mut scene, path, |config| {
        config.circular = true;
        config.offset = 0.1;
    });
    for car in with_cars(&mut scene, train, 2) {
        set_car_length(&mut scene, car, 50.0);
    }

    let trace = place_with_trace(&mut scene, train).unwrap();
    assert!(TOL.approx_eq_f64(trace.cars[0].main_offset, 0.1));
    assert!(TOL.approx_eq_f64(trace.cars[1].main_offset, 0.6));
    assert_eq!(trace.report.car_count, 2);
}

#[test]
fn main_offsets_follow_the_chaining_law() {
    for (circular, start) in [(true, 0.3), (false, 0.1), (true, -0.45)] {
        let mut scene = Scene::new();
        let path = straight_path(&mut scene, 100.0);
        let train = train_on(&mut scene, path, |config| {
            config.circular = circular;
            config.offset = start;
            config.default_length = 7.0;
        });
        for car in with_cars(&mut scene, train, 5) {
            set_car_length(&mut scene, car, 7.0);
        }

        let trace = place_with_trace(&mut scene, train).unwrap();
        for (k, placement) in trace.cars.iter().enumerate() {
            let expected = normalize_offset(start - (k as f64 * 7.0) / 100.0, circular);
            assert!(
                (placement.main_offset - expected).abs() < 1e-9,
                "car {k} circular={circular}: {} != {expected}",
                placement.main_offset
            );
        }
    }
}

#[test]
fn wheel_pair_spans_the_seam_on_clamped_train() {
    let mut scene = Scene::new();
    let loop_path = Polyline3::new(
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(25.0, 0.0, 0.0),
            Point3::new(25.0, 0.0, 25.0),
            Point3::new(0.0, 0.0, 25.0),
        ],
        true,
    )
    .unwrap();
    let path = scene.add_spline("Loop", SplineCurve::new(CurveShape::Polyline(loop_path)));
    let train = train_on(&mut scene, path, |config| config.offset = 0.1);
    with_cars(&mut scene, train, 1);

    let trace = place_with_trace(&mut scene, train).unwrap();
    assert!(TOL.approx_eq_f64(trace.cars[0].wheel_b_offset, 0.85));
}

#[test]
fn placement_is_idempotent() {
    let mut scene = Scene::new();
    let path = straight_path(&mut scene, 100.0);
    let train = train_on(&mut scene, path, |config| {
        config.circular = true;
        config.offset = 0.8;
    });
    with_cars(&mut scene, train, 3);

    let first = place(&mut scene, train).unwrap();
    let before = snapshot(&scene);
    let second = place(&mut scene, train).unwrap();

    assert_eq!(first, second);
    assert_eq!(before, snapshot(&scene));
}

#[test]
fn scales_survive_placement() {
    let mut scene = Scene::new();
    let path = straight_path(&mut scene, 100.0);
    let train = train_on(&mut scene, path, |config| config.offset = 0.5);
    let car = with_cars(&mut scene, train, 1)[0];
    let parts = scene.car_parts(car).unwrap();

    let scales = [
        (car, Vec3::new(2.0, 2.0, 2.0)),
        (parts.main, Vec3::new(1.0, 3.0, 0.5)),
        (parts.wheel_a, Vec3::new(0.25, 0.25, 0.25)),
        (parts.wheel_b, Vec3::new(4.0, 1.0, 1.0)),
    ];
    for (node, scale) in scales {
        scene.set_local_scale(node, scale).unwrap();
    }

    place(&mut scene, train).unwrap();

    for (node, scale) in scales {
        assert_eq!(scene.local_scale(node), Some(scale));
        let lengths = scene.world_transform(node).unwrap().axis_lengths();
        assert!(TOL.approx_eq_vec3(lengths, scale), "{node}: {lengths:?}");
    }
}

#[test]
fn missing_path_touches_nothing() {
    let mut scene = Scene::new();
    let train = scene.add_node("Train").unwrap();
    scene.set_train_config(train, TrainConfig::default()).unwrap();
    let car = add_car(&mut scene, train).unwrap();
    let moved = Transform::translate(Vec3::new(5.0, 6.0, 7.0));
    scene.set_world_transform(car, moved).unwrap();

    assert_eq!(place(&mut scene, train), Err(PlacementError::NoPath));
    assert_eq!(scene.world_transform(car), Some(moved));
    let info = &scene.train_config(train).unwrap().info;
    assert_eq!(info.car_count, 0);
    assert!(info.error.is_some());
}

#[test]
fn malformed_first_car_is_reported_without_writes() {
    let mut scene = Scene::new();
    let path = straight_path(&mut scene, 100.0);
    let train = train_on(&mut scene, path, |_| {});

    let car = scene.add_node("Car 1").unwrap();
    let main = scene.add_node("Main").unwrap();
    let wheel = scene.add_node("Wheel 1").unwrap();
    scene.append_child(car, main).unwrap();
    scene.append_child(car, wheel).unwrap();
    scene.append_child(train, car).unwrap();
    with_cars(&mut scene, train, 1);

    let before = snapshot(&scene);
    let result = place(&mut scene, train);
    assert_eq!(
        result,
        Err(PlacementError::MalformedCar {
            index: 1,
            name: "Car 1".to_owned()
        })
    );
    assert_eq!(before, snapshot(&scene));
    let info = &scene.train_config(train).unwrap().info;
    assert_eq!(info.car_count, 0);
    assert!(TOL.approx_eq_f64(info.track_length.unwrap(), 100.0));
}

#[test]
fn malformed_later_car_keeps_earlier_placements() {
    let mut scene = Scene::new();
    let path = straight_path(&mut scene, 100.0);
    let train = train_on(&mut scene, path, |config| config.offset = 0.5);
    let first = with_cars(&mut scene, train, 1)[0];
    let broken = scene.add_node("Broken").unwrap();
    scene.append_child(train, broken).unwrap();

    let result = place(&mut scene, train);
    assert_eq!(
        result,
        Err(PlacementError::MalformedCar {
            index: 2,
            name: "Broken".to_owned()
        })
    );

    let origin = scene.world_transform(first).unwrap().origin();
    assert!(TOL.approx_eq_point3(origin, Point3::new(50.0, 0.0, 0.0)));
    assert_eq!(scene.world_transform(broken), Some(Transform::identity()));
    assert_eq!(scene.train_config(train).unwrap().info.car_count, 1);
}

#[test]
fn empty_train_and_degenerate_path_fail() {
    let mut scene = Scene::new();
    let path = straight_path(&mut scene, 100.0);
    let train = train_on(&mut scene, path, |_| {});
    assert_eq!(place(&mut scene, train), Err(PlacementError::NoCars));
    let info = scene.train_config(train).unwrap().info.clone();
    assert_eq!(info.car_count, 0);
    assert!(info.track_length.is_some());

    let point = scene.add_spline("Point", line(Point3::new(1.0, 1.0, 1.0), Point3::new(1.0, 1.0, 1.0)));
    let stuck = train_on(&mut scene, point, |_| {});
    with_cars(&mut scene, stuck, 1);
    assert_eq!(place(&mut scene, stuck), Err(PlacementError::ZeroLength));
    assert_eq!(scene.train_config(stuck).unwrap().info.track_length, Some(0.0));
}

#[test]
fn rail_curve_sets_the_up_axis() {
    let mut scene = Scene::new();
    let path = straight_path(&mut scene, 100.0);
    let rail = scene.add_spline(
        "Rail",
        line(Point3::new(0.0, 0.0, 10.0), Point3::new(100.0, 0.0, 10.0)),
    );
    let banked = train_on(&mut scene, path, |config| {
        config.rail = Some(rail);
        config.offset = 0.5;
    });
    let flat = train_on(&mut scene, path, |config| config.offset = 0.5);
    with_cars(&mut scene, banked, 1);
    with_cars(&mut scene, flat, 1);

    let banked = place_with_trace(&mut scene, banked).unwrap();
    let flat = place_with_trace(&mut scene, flat).unwrap();

    assert!(TOL.approx_eq_vec3(banked.cars[0].wheel_a.y_axis(), Vec3::Z));
    assert!(TOL.approx_eq_vec3(flat.cars[0].wheel_a.y_axis(), Vec3::Y));
    assert!(TOL.approx_eq_vec3(banked.cars[0].wheel_a.z_axis(), Vec3::X));
}

#[test]
fn generators_resolve_a_single_level() {
    let mut scene = Scene::new();
    let path = straight_path(&mut scene, 100.0);
    let instance = scene.add_generator("Instance", path);
    let nested = scene.add_generator("Nested", instance);

    let via_generator = train_on(&mut scene, instance, |_| {});
    with_cars(&mut scene, via_generator, 1);
    let report = place(&mut scene, via_generator).unwrap();
    assert!(TOL.approx_eq_f64(report.track_length.unwrap(), 100.0));

    let too_deep = train_on(&mut scene, nested, |_| {});
    with_cars(&mut scene, too_deep, 1);
    assert_eq!(place(&mut scene, too_deep), Err(PlacementError::NoPath));
}

#[test]
fn dangling_rail_falls_back_to_default_up() {
    let mut scene = Scene::new();
    let path = straight_path(&mut scene, 100.0);
    let instance = scene.add_generator("Instance", path);
    let nested = scene.add_generator("Nested", instance);
    let train = train_on(&mut scene, path, |config| config.rail = Some(nested));
    with_cars(&mut scene, train, 1);

    let trace = place_with_trace(&mut scene, train).unwrap();
    assert!(TOL.approx_eq_vec3(trace.cars[0].wheel_a.y_axis(), Vec3::Y));
}

#[test]
fn added_cars_take_defaults_at_call_time() {
    let mut scene = Scene::new();
    let path = straight_path(&mut scene, 100.0);
    let train = train_on(&mut scene, path, |_| {});

    let first = add_car(&mut scene, train).unwrap();
    scene.train_config_mut(train).unwrap().default_wheel_distance = 10.0;
    let second = add_car(&mut scene, train).unwrap();

    assert_eq!(scene.name(first), Some("Car 1"));
    assert_eq!(scene.name(second), Some("Car 2"));
    assert_eq!(
        scene.car_override(first).map(|o| (o.length, o.wheel_distance)),
        Some((30.0, 25.0))
    );
    assert_eq!(
        scene.car_override(second).map(|o| (o.length, o.wheel_distance)),
        Some((30.0, 10.0))
    );

    let report = place(&mut scene, train).unwrap();
    assert_eq!(report.car_count, 2);
    assert_eq!(
        scene.car_override(first).map(|o| o.label.clone()),
        Some("Car 1".to_owned())
    );
}

#[test]
fn override_replaces_defaults_for_one_car() {
    let mut scene = Scene::new();
    let path = straight_path(&mut scene, 100.0);
    let train = train_on(&mut scene, path, |config| config.offset = 0.9);
    let cars = with_cars(&mut scene, train, 2);
    scene
        .attach_car_override(
            cars[0],
            CarOverride {
                length: 20.0,
                wheel_distance: 10.0,
                label: String::new(),
            },
        )
        .unwrap();

    let trace = place_with_trace(&mut scene, train).unwrap();
    assert!(TOL.approx_eq_f64(trace.cars[0].wheel_b_offset, 0.8));
    assert!(TOL.approx_eq_f64(trace.cars[1].main_offset, 0.7));
    assert!(TOL.approx_eq_f64(trace.cars[1].wheel_b_offset, 0.45));
}

#[test]
fn chained_offsets_that_land_on_the_seam_wrap_to_zero() {
    let mut scene = Scene::new();
    let path = straight_path(&mut scene, 100.0);
    let train = train_on(&mut scene, path, |config| {
        config.circular = true;
        config.offset = 0.3;
    });
    for car in with_cars(&mut scene, train, 4) {
        set_car_length(&mut scene, car, 10.0);
    }

    let trace = place_with_trace(&mut scene, train).unwrap();
    for placement in &trace.cars {
        for offset in [placement.main_offset, placement.wheel_a_offset, placement.wheel_b_offset] {
            assert!((0.0..1.0).contains(&offset), "offset {offset} left the unit domain");
        }
    }
    // 0.3 - 0.1 - 0.1 - 0.1 is a hair below zero.
    assert_eq!(trace.cars[3].main_offset, 0.0);
    let main = scene.world_transform(scene.car_parts(trace.cars[3].car).unwrap().main).unwrap();
    assert!(TOL.approx_eq_point3(main.origin(), Point3::ORIGIN));
}

#[test]
fn subdivision_below_two_samples_is_out_of_resources() {
    let mut scene = Scene::new();
    let path = straight_path(&mut scene, 100.0);
    let train = train_on(&mut scene, path, |config| config.subdivision = Some(1));
    with_cars(&mut scene, train, 1);

    let err = place(&mut scene, train).unwrap_err();
    assert_eq!(
        err,
        PlacementError::OutOfResources(SamplerError::ResolutionTooLow { requested: 1, min: 2 })
    );

    let info = &scene.train_config(train).unwrap().info;
    assert_eq!(info.car_count, 0);
    assert_eq!(info.track_length, None);
    assert_eq!(info.error.as_deref(), Some(err.to_string().as_str()));
    assert!(!scene.is_dirty(train));
}

#[test]
fn subdivision_sets_the_path_sampler_resolution() {
    let mut scene = Scene::new();
    let circle = Circle3::from_center_xaxis_normal(Point3::ORIGIN, Vec3::X, Vec3::Y, 10.0);
    let path = scene.add_spline("Ring", SplineCurve::new(CurveShape::Circle(circle)));

    let coarse = train_on(&mut scene, path, |config| config.subdivision = Some(4));
    with_cars(&mut scene, coarse, 1);
    let fine = train_on(&mut scene, path, |_| {});
    with_cars(&mut scene, fine, 1);

    // Four samples over a full turn measure an inscribed triangle.
    let coarse_length = place(&mut scene, coarse).unwrap().track_length.unwrap();
    assert!((coarse_length - 30.0 * 3.0_f64.sqrt()).abs() < 1e-9, "got {coarse_length}");

    let fine_length = place(&mut scene, fine).unwrap().track_length.unwrap();
    assert!((fine_length - std::f64::consts::TAU * 10.0).abs() < 0.1, "got {fine_length}");
}
