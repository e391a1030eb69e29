use approx::assert_abs_diff_eq;
use rovercore::{
    command::Command,
    config::{MotionConfig, RoverConfig},
    geometry,
    objects::Category,
    Error, Rover, TABLE_CAPACITY,
};
use roversim::{Obstacle, Simulator, Surface, World, Zone};
use uom::si::{angle::degree, f64::Angle, length::centimeter};

fn world(obstacles: Vec<Obstacle>, zones: Vec<Zone>) -> Simulator {
    Simulator::builder()
        .world(World { obstacles, zones })
        .build()
}

fn run(rover: &mut Rover<TABLE_CAPACITY>, sim: &mut Simulator, command: Command) -> String {
    let mut telemetry = String::new();
    rover.execute(sim, command, &mut telemetry).unwrap();
    telemetry
}

/// The dead-reckoned pose has to agree with where the robot really is.
fn assert_tracks(rover: &Rover<TABLE_CAPACITY>, sim: &Simulator) {
    let (estimate, truth) = (rover.pose(), sim.pose());
    assert_abs_diff_eq!(
        estimate.x.get::<centimeter>(),
        truth.x.get::<centimeter>(),
        epsilon = 1e-6
    );
    assert_abs_diff_eq!(
        estimate.y.get::<centimeter>(),
        truth.y.get::<centimeter>(),
        epsilon = 1e-6
    );
    assert!(geometry::separation(estimate.heading, truth.heading).get::<degree>() < 1e-6);
}

#[test]
fn test_forward() {
    let mut sim = world(vec![], vec![]);
    let mut rover = Rover::default();

    let telemetry = run(&mut rover, &mut sim, Command::Forward);

    let pose = rover.pose();
    assert_abs_diff_eq!(pose.x.get::<centimeter>(), 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(pose.y.get::<centimeter>(), 15.0, epsilon = 0.02);
    assert_abs_diff_eq!(pose.heading.get::<degree>(), 90.0, epsilon = 1e-9);
    assert_tracks(&rover, &sim);
    assert!(telemetry.contains("Heading: 90.000 deg"));
    assert!(rover.table().is_empty());
}

#[test]
fn test_turns() {
    let mut sim = world(vec![], vec![]);
    let mut rover = Rover::default();

    run(&mut rover, &mut sim, Command::TurnLeft);
    assert_abs_diff_eq!(rover.pose().heading.get::<degree>(), 135.0, epsilon = 0.1);
    run(&mut rover, &mut sim, Command::TurnRight);
    run(&mut rover, &mut sim, Command::TurnRight);
    assert_abs_diff_eq!(rover.pose().heading.get::<degree>(), 45.0, epsilon = 0.2);
    assert_tracks(&rover, &sim);
}

#[test]
fn test_rotation_gain_compensates_odometry() {
    let mut sim = Simulator::builder().angle_scale(1.0 / 1.13).build();
    let config = RoverConfig::builder()
        .motion(MotionConfig::builder().rotation_gain(1.13).build())
        .build();
    let mut rover = Rover::<TABLE_CAPACITY>::new(config);

    run(&mut rover, &mut sim, Command::TurnLeft);
    assert_abs_diff_eq!(rover.pose().heading.get::<degree>(), 135.0, epsilon = 0.1);
    assert_abs_diff_eq!(sim.pose().heading.get::<degree>(), 135.0, epsilon = 0.1);
}

#[test]
fn test_square_returns_home() {
    let mut sim = world(vec![], vec![]);
    let mut rover = Rover::default();
    for _ in 0..4 {
        run(&mut rover, &mut sim, Command::Forward);
        run(&mut rover, &mut sim, Command::TurnLeft);
        run(&mut rover, &mut sim, Command::TurnLeft);
    }
    assert_tracks(&rover, &sim);
    assert_abs_diff_eq!(rover.pose().x.get::<centimeter>(), 0.0, epsilon = 0.5);
    assert_abs_diff_eq!(rover.pose().y.get::<centimeter>(), 0.0, epsilon = 0.5);
}

#[test]
fn test_left_bumper() {
    // Touches the left side of the bumper after about 2.3 cm.
    let mut sim = world(vec![Obstacle::flat(-11.0, 19.0, 3.0)], vec![]);
    let mut rover = Rover::default();

    run(&mut rover, &mut sim, Command::Forward);

    assert_eq!(rover.table().len(), 1);
    let hazard = rover.table().get(0).unwrap();
    assert_eq!(hazard.category, Category::Flat);
    assert_abs_diff_eq!(hazard.x.get::<centimeter>(), 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(hazard.y.get::<centimeter>(), 2.3, epsilon = 0.05);

    // Backed up 15 cm and turned away to the right.
    let pose = rover.pose();
    assert_abs_diff_eq!(pose.y.get::<centimeter>(), 2.3 - 15.0, epsilon = 0.05);
    assert!(geometry::separation(pose.heading, Angle::new::<degree>(0.0)).get::<degree>() < 0.1);
    assert_tracks(&rover, &sim);
}

#[test]
fn test_both_bumpers() {
    // Straight ahead, touched after 8 cm of the 15 cm command.
    let mut sim = world(vec![Obstacle::flat(0.0, 28.0, 3.0)], vec![]);
    let mut rover = Rover::default();

    run(&mut rover, &mut sim, Command::Forward);

    assert_eq!(rover.table().get(0).map(|o| o.category), Some(Category::Flat));
    assert_abs_diff_eq!(rover.pose().y.get::<centimeter>(), 1.0, epsilon = 0.05);
    assert_abs_diff_eq!(rover.pose().heading.get::<degree>(), 90.0, epsilon = 1e-9);
    assert_tracks(&rover, &sim);
}

#[test]
fn test_cliff() {
    let mut sim = world(
        vec![],
        vec![Zone::from_cm((-50.0, 20.0), (50.0, 60.0), Surface::Drop)],
    );
    let mut rover = Rover::default();

    run(&mut rover, &mut sim, Command::Forward);

    let hazard = rover.table().get(0).unwrap();
    assert_eq!(hazard.category, Category::Cliff);
    assert_abs_diff_eq!(hazard.y.get::<centimeter>(), 5.22, epsilon = 0.05);
    // The whole command is undone from where the cliff was seen.
    assert_abs_diff_eq!(rover.pose().y.get::<centimeter>(), 5.22 - 15.0, epsilon = 0.05);
    assert_tracks(&rover, &sim);
}

#[test]
fn test_tape() {
    let mut sim = world(
        vec![],
        vec![
            Zone::from_cm((-50.0, 20.0), (50.0, 25.0), Surface::WhiteTape),
            Zone::from_cm((-50.0, -40.0), (50.0, -30.0), Surface::RedTape),
        ],
    );
    let mut rover = Rover::default();

    run(&mut rover, &mut sim, Command::Forward);
    assert_eq!(rover.table().get(0).map(|o| o.category), Some(Category::WhiteTape));

    run(&mut rover, &mut sim, Command::TurnLeft);
    run(&mut rover, &mut sim, Command::TurnLeft);
    run(&mut rover, &mut sim, Command::TurnLeft);
    run(&mut rover, &mut sim, Command::TurnLeft);
    run(&mut rover, &mut sim, Command::Forward);
    assert_eq!(rover.table().len(), 2);
    assert_eq!(rover.table().get(1).map(|o| o.category), Some(Category::RedTape));
    assert_tracks(&rover, &sim);
}

#[test]
fn test_persistent_cliff_gives_up() {
    let mut sim = world(
        vec![],
        vec![Zone::from_cm((-100.0, -100.0), (100.0, 100.0), Surface::Drop)],
    );
    let mut rover = Rover::default();

    let mut telemetry = String::new();
    let result = rover.execute(&mut sim, Command::Forward, &mut telemetry);

    assert_eq!(result, Err(Error::HazardPersists));
    assert_eq!(rover.table().len(), 1);
    assert_abs_diff_eq!(rover.pose().y.get::<centimeter>(), -45.0, epsilon = 0.1);
    assert_tracks(&rover, &sim);
    let (left, right) = sim.wheels();
    assert_eq!((left.value, right.value), (0.0, 0.0));
}
