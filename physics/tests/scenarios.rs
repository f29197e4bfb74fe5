use glam::{Quat, Vec3};
use physics::{
    intersect::deepest_penetration, shapes::Shape, BodyHandle, Collider, CombineRule, Material,
    RigidBody, World, WorldConfig,
};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

fn bouncy() -> Material {
    Material {
        restitution: 1.0,
        static_friction: 0.0,
        dynamic_friction: 0.0,
        combine: CombineRule::Average,
    }
}

fn floating_sphere(position: Vec3, velocity: Vec3, material: Material) -> RigidBody {
    RigidBody::new(position)
        .with_gravity(false)
        .with_damping(1.0, 1.0)
        .with_linear_velocity(velocity)
        .with_collider(Collider::new(Shape::make_sphere(0.5)).with_material(material))
}

#[test]
fn elastic_head_on_spheres_swap_velocities() {
    let mut world = World::new(WorldConfig::default()).unwrap();
    let a = world
        .add_body(floating_sphere(Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0), bouncy()))
        .unwrap();
    let b = world
        .add_body(floating_sphere(
            Vec3::new(0.9, 0.0, 0.0),
            Vec3::new(-0.5, 0.0, 0.0),
            bouncy(),
        ))
        .unwrap();

    let stats = world.step();
    assert_eq!(stats.contacts, 1);

    let va = world.body(a).unwrap().linear_velocity();
    let vb = world.body(b).unwrap().linear_velocity();
    assert!((va.x - -0.5).abs() < 1e-4, "{va}");
    assert!((vb.x - 0.5).abs() < 1e-4, "{vb}");
    assert_eq!((va.y, va.z), (0.0, 0.0));
    assert_eq!((vb.y, vb.z), (0.0, 0.0));
}

#[test]
fn chain_forms_single_batch_in_any_order() {
    let mut rng = Pcg64Mcg::seed_from_u64(7);
    for _ in 0..8 {
        let mut positions = [0.0f32, 0.9, 1.8];
        positions.shuffle(&mut rng);

        let mut world = World::new(WorldConfig::default()).unwrap();
        let handles = positions
            .iter()
            .map(|&x| {
                world
                    .add_body(floating_sphere(
                        Vec3::new(x, 0.0, 0.0),
                        Vec3::ZERO,
                        Material::default(),
                    ))
                    .unwrap()
            })
            .collect::<Vec<BodyHandle>>();

        world.step();
        let batches = world.batches();
        assert_eq!(batches.len(), 1);
        let batch = batches.iter().next().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.bodies().len(), 3);
        for handle in &handles {
            assert!(batch.contains_body(*handle));
        }
    }
}

#[test]
fn box_on_plane_stays_above_floor() {
    let mut world = World::new(WorldConfig::default()).unwrap();
    world.add_static_shape(Collider::new(Shape::make_plane(Vec3::Y, -1.0)));
    let epsilon = world.config().resolver.position_epsilon;

    for (y, expected_contacts) in [(0.999, 0), (-0.05, 4)] {
        let cube = world
            .add_body(
                RigidBody::new(Vec3::new(0.0, y, 0.0))
                    .with_gravity(false)
                    .with_collider(Collider::new(Shape::make_box(Vec3::ONE))),
            )
            .unwrap();

        let stats = world.step();
        assert_eq!(stats.contacts, expected_contacts, "box at {y}");
        assert_eq!(stats.position_iterations > 0, expected_contacts > 0);

        // corrections stop once every contact is within epsilon; the rotation part is
        // linearized, so allow one more epsilon of slack
        let tolerance = 2.0 * epsilon;
        let body = world.body(cube).unwrap();
        let aabb = body.aabb().unwrap();
        assert!(aabb.mins.y >= -1.0 - tolerance, "min y {}", aabb.mins.y);
        let depth = deepest_penetration(&world.static_shapes()[0], &body.colliders()[0]);
        assert!(depth.unwrap_or(0.0) <= tolerance, "depth {depth:?}");

        world.remove_body(cube).unwrap();
    }
}

#[test]
fn resting_body_sleeps_once() {
    let mut world = World::new(WorldConfig::default()).unwrap();
    world.add_static_shape(Collider::new(Shape::make_plane(Vec3::Y, 0.0)));
    let ball = world
        .add_body(
            RigidBody::new(Vec3::new(0.0, 0.5, 0.0))
                .with_collider(Collider::new(Shape::make_sphere(0.5))),
        )
        .unwrap();

    let mut transitions = 0;
    let mut was_awake = true;
    for _ in 0..300 {
        world.step();
        let awake = world.body(ball).unwrap().is_awake();
        if was_awake && !awake {
            transitions += 1;
        }
        assert!(!(awake && !was_awake), "woke up again");
        was_awake = awake;
    }
    assert_eq!(transitions, 1);
    let body = world.body(ball).unwrap();
    assert_eq!(body.linear_velocity(), Vec3::ZERO);
    assert!(body.position().y > 0.45);
}

fn random_scene(seed: u64) -> (World, Vec<BodyHandle>) {
    let mut rng = Pcg64Mcg::seed_from_u64(seed);
    let mut world = World::new(WorldConfig::default()).unwrap();
    world.add_static_shape(Collider::new(Shape::make_plane(Vec3::Y, 0.0)));
    let mut handles = Vec::new();
    for _ in 0..24 {
        let position = Vec3::new(
            rng.gen_range(-4.0..4.0),
            rng.gen_range(1.0..8.0),
            rng.gen_range(-4.0..4.0),
        );
        let shape = if rng.gen_bool(0.5) {
            Shape::make_sphere(rng.gen_range(0.3..0.8))
        } else {
            Shape::make_box(Vec3::splat(rng.gen_range(0.3..0.8)))
        };
        let body = RigidBody::new(position)
            .with_orientation(Quat::from_rotation_y(rng.gen_range(0.0..3.0)))
            .with_collider(Collider::new(shape));
        handles.push(world.add_body(body).unwrap());
    }
    (world, handles)
}

#[test]
fn identical_scenes_evolve_identically() {
    let (mut first, handles) = random_scene(42);
    let (mut second, _) = random_scene(42);
    for _ in 0..120 {
        first.step();
        second.step();
        assert_eq!(first.last_step_stats(), second.last_step_stats());
    }
    for handle in handles {
        let a = first.body(handle).unwrap();
        let b = second.body(handle).unwrap();
        assert_eq!(a.position(), b.position());
        assert_eq!(a.orientation(), b.orientation());
        assert_eq!(a.linear_velocity(), b.linear_velocity());
    }
}

#[test]
fn removing_bodies_mid_simulation() {
    let (mut world, handles) = random_scene(3);
    for _ in 0..30 {
        world.step();
    }
    for handle in handles.iter().step_by(2) {
        world.remove_body(*handle).unwrap();
    }
    for batch in world.batches().iter() {
        for handle in handles.iter().step_by(2) {
            assert!(!batch.contains_body(*handle));
        }
    }
    for _ in 0..30 {
        world.step();
    }
    assert_eq!(world.bodies().count(), handles.len() / 2);
    for body in world.bodies() {
        assert!(body.position().is_finite());
    }
}

#[test]
fn partial_json_config() {
    let config = WorldConfig::from_json_str(
        r#"{ "gravity": [0.0, -5.0, 0.0], "resolver": { "position_iterations": 8 } }"#,
    )
    .unwrap();
    assert_eq!(config.gravity, Vec3::new(0.0, -5.0, 0.0));
    assert_eq!(config.resolver.position_iterations, 8);
    assert_eq!(config.max_substeps, WorldConfig::default().max_substeps);

    let mut world = World::new(config).unwrap();
    let ball = world
        .add_body(RigidBody::new(Vec3::ZERO).with_damping(1.0, 1.0).with_collider(
            Collider::new(Shape::make_sphere(0.5)),
        ))
        .unwrap();
    world.step();
    let dt = world.config().fixed_timestep;
    let velocity = world.body(ball).unwrap().linear_velocity();
    assert!((velocity.y - -5.0 * dt).abs() < 1e-5);
}
