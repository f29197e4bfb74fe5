use glam::{Quat, Vec3};
use physics::{
    shapes::Shape, BodyHandle, Collider, CombineRule, Material, PhysicsError, RigidBody, World,
};

const W: f32 = 50.0;
const H: f32 = 25.0;

fn wall_material() -> Material {
    Material {
        restitution: 0.5,
        static_friction: 0.0,
        dynamic_friction: 0.0,
        combine: CombineRule::Average,
    }
}

/// Ground plane at y = 0 fenced in by four static walls.
pub fn add_standard_sandbox(world: &mut World) {
    world.add_static_shape(
        Collider::new(Shape::make_plane(Vec3::Y, 0.0)).with_material(Material::default()),
    );

    let wall_x = Shape::make_box(Vec3::new(1.0, 2.5, H));
    let wall_z = Shape::make_box(Vec3::new(W, 2.5, 1.0));
    for (shape, position) in [
        (&wall_x, Vec3::new(W, 2.5, 0.0)),
        (&wall_x, Vec3::new(-W, 2.5, 0.0)),
        (&wall_z, Vec3::new(0.0, 2.5, H)),
        (&wall_z, Vec3::new(0.0, 2.5, -H)),
    ] {
        world.add_static_shape(
            Collider::new(shape.clone())
                .with_offset(position, Quat::IDENTITY)
                .with_material(wall_material()),
        );
    }
}

pub fn add_box_stack(world: &mut World) -> Result<Vec<BodyHandle>, PhysicsError> {
    const STACK_HEIGHT: usize = 5;
    let cube = Shape::make_box(Vec3::ONE);
    let mut handles = Vec::with_capacity(STACK_HEIGHT);
    for y in 0..STACK_HEIGHT {
        let offset = if y & 1 == 0 { 0.0 } else { 0.15 };
        let delta = 0.04;
        let scale_height = 2.0 + delta;
        let delta_height = 1.0 + delta;
        let body = RigidBody::new(Vec3::new(
            offset * scale_height,
            delta_height + y as f32 * scale_height,
            offset * scale_height,
        ))
        .with_collider(Collider::new(cube.clone()));
        handles.push(world.add_body(body)?);
    }
    Ok(handles)
}

pub fn add_dynamic_balls(world: &mut World) -> Result<Vec<BodyHandle>, PhysicsError> {
    let radius = 0.5;
    let ball = Shape::make_sphere(radius);
    let mut handles = Vec::new();
    for x in 0..6 {
        let xx = ((x as f32) - 1.0) * radius * 1.5 - 10.0;
        for z in 0..6 {
            let zz = ((z as f32) - 1.0) * radius * 1.5;
            let body = RigidBody::new(Vec3::new(xx, 10.0, zz)).with_collider(
                Collider::new(ball.clone()).with_material(Material {
                    restitution: 0.5,
                    ..Default::default()
                }),
            );
            handles.push(world.add_body(body)?);
        }
    }
    Ok(handles)
}

/// Capsules, cylinders and cones tumbling onto the ground.
pub fn add_tumblers(world: &mut World) -> Result<Vec<BodyHandle>, PhysicsError> {
    let shapes = [
        Shape::make_capsule(0.4, 1.2),
        Shape::make_cylinder(0.5, 1.0),
        Shape::make_cone(0.6, 1.2),
    ];
    let mut handles = Vec::new();
    for (i, shape) in shapes.into_iter().enumerate() {
        let body = RigidBody::new(Vec3::new(8.0 + i as f32 * 3.0, 4.0, -5.0))
            .with_orientation(Quat::from_axis_angle(
                Vec3::new(1.0, 0.0, 1.0).normalize(),
                std::f32::consts::FRAC_PI_4,
            ))
            .with_angular_velocity(Vec3::new(0.0, 2.0, 0.0))
            .with_collider(Collider::new(shape).with_mass(2.0));
        handles.push(world.add_body(body)?);
    }
    Ok(handles)
}

pub fn build(world: &mut World) -> Result<Vec<BodyHandle>, PhysicsError> {
    add_standard_sandbox(world);
    let mut handles = add_box_stack(world)?;
    handles.extend(add_dynamic_balls(world)?);
    handles.extend(add_tumblers(world)?);
    Ok(handles)
}
