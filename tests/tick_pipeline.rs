//! End-to-end tests driving [`hork_physics::PhysicsWorld`] through a handful
//! of fixed ticks against a real `rapier3d` world, with a minimal
//! hand-rolled scene graph standing in for the embedding engine.

use hork_physics::body::{BodyFlags, DynamicBody, StaticBody, Trigger};
use hork_physics::character::CharacterController;
use hork_physics::config::PhysicsWorldConfig;
use hork_physics::contacts::ContactEvent;
use hork_physics::handle::{BodyHandle, ExtendedHandle, GameObjectHandle};
use hork_physics::shape::{ColliderDesc, PlacedCollider};
use hork_physics::water::WaterVolume;
use hork_physics::{ComponentManager, GameObject, GameObjectRegistry, PhysicsWorld, TickScheduler};

use fyrox_core::algebra::{UnitQuaternion, Vector3};
use fyrox_core::pool::Handle;

const DT: f32 = 1.0 / 60.0;

/// A Vec-indexed component store, one per body kind, playing the role the
/// embedding engine's per-node-type pools play in the real pipeline.
struct Slab<T>(Vec<T>);

impl<T> Slab<T> {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn push(&mut self, item: T) -> BodyHandle {
        let index = self.0.len() as u32;
        self.0.push(item);
        Handle::new(index, 1)
    }
}

impl<T> ComponentManager<T> for Slab<T> {
    fn resolve(&self, handle: BodyHandle) -> Option<&T> {
        self.0.get(handle.index() as usize)
    }

    fn resolve_mut(&mut self, handle: BodyHandle) -> Option<&mut T> {
        self.0.get_mut(handle.index() as usize)
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (BodyHandle, &T)> + '_> {
        Box::new(
            self.0
                .iter()
                .enumerate()
                .map(|(i, v)| (Handle::new(i as u32, 1), v)),
        )
    }

    fn iter_mut(&mut self) -> Box<dyn Iterator<Item = (BodyHandle, &mut T)> + '_> {
        Box::new(
            self.0
                .iter_mut()
                .enumerate()
                .map(|(i, v)| (Handle::new(i as u32, 1), v)),
        )
    }
}

/// A scene node: just a transform plus the event log a real game object
/// would forward to gameplay code.
struct TestObject {
    position: Vector3<f32>,
    rotation: UnitQuaternion<f32>,
    scale: Vector3<f32>,
    is_dynamic: bool,
    transform_locked: bool,
    begin_overlaps: Vec<(ExtendedHandle, ExtendedHandle)>,
    end_overlaps: Vec<(ExtendedHandle, ExtendedHandle)>,
    begin_contacts: Vec<ContactEvent>,
}

impl Default for TestObject {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            is_dynamic: true,
            transform_locked: false,
            begin_overlaps: Vec::new(),
            end_overlaps: Vec::new(),
            begin_contacts: Vec::new(),
        }
    }
}

impl GameObject for TestObject {
    fn world_position(&self) -> Vector3<f32> {
        self.position
    }

    fn set_world_position(&mut self, position: Vector3<f32>) {
        self.position = position;
    }

    fn world_rotation(&self) -> UnitQuaternion<f32> {
        self.rotation
    }

    fn set_world_rotation(&mut self, rotation: UnitQuaternion<f32>) {
        self.rotation = rotation;
    }

    fn world_scale(&self) -> Vector3<f32> {
        self.scale
    }

    fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    fn transform_locked(&self) -> bool {
        self.transform_locked
    }

    fn set_transform_locked(&mut self, locked: bool) {
        self.transform_locked = locked;
    }

    fn on_begin_overlap(&mut self, trigger: ExtendedHandle, target: ExtendedHandle) {
        self.begin_overlaps.push((trigger, target));
    }

    fn on_end_overlap(&mut self, trigger: ExtendedHandle, target: ExtendedHandle) {
        self.end_overlaps.push((trigger, target));
    }

    fn on_begin_contact(&mut self, event: &ContactEvent) {
        self.begin_contacts.push(event.clone());
    }

    fn on_update_contact(&mut self, _event: &ContactEvent) {}

    fn on_end_contact(&mut self, _event: &ContactEvent) {}
}

struct TestObjects(Vec<TestObject>);

impl TestObjects {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn spawn(&mut self, object: TestObject) -> GameObjectHandle {
        let index = self.0.len() as u32;
        self.0.push(object);
        Handle::new(index, 1)
    }

    fn object(&self, handle: GameObjectHandle) -> &TestObject {
        &self.0[handle.index() as usize]
    }
}

impl GameObjectRegistry for TestObjects {
    fn get(&self, handle: GameObjectHandle) -> Option<&dyn GameObject> {
        self.0.get(handle.index() as usize).map(|o| o as &dyn GameObject)
    }

    fn get_mut(&mut self, handle: GameObjectHandle) -> Option<&mut dyn GameObject> {
        self.0
            .get_mut(handle.index() as usize)
            .map(|o| o as &mut dyn GameObject)
    }
}

struct FixedScheduler {
    frame: u64,
}

impl TickScheduler for FixedScheduler {
    fn is_paused(&self) -> bool {
        false
    }

    fn fixed_time_step(&self) -> f32 {
        DT
    }

    fn fixed_frame_num(&self) -> u64 {
        self.frame
    }
}

fn tick(
    world: &mut PhysicsWorld,
    frame: u64,
    statics: &Slab<StaticBody>,
    dynamics: &Slab<DynamicBody>,
    triggers: &Slab<Trigger>,
    characters: &mut Slab<CharacterController>,
    water: &Slab<WaterVolume>,
    objects: &mut TestObjects,
) {
    let heightfields = Slab::<hork_physics::body::HeightFieldBody>::new();
    let scheduler = FixedScheduler { frame };
    world.tick(
        &scheduler,
        statics,
        dynamics,
        triggers,
        &heightfields,
        characters,
        water,
        objects,
    );
}

fn sphere(radius: f32) -> PlacedCollider {
    PlacedCollider {
        desc: ColliderDesc::Sphere { radius },
        local_position: Vector3::zeros(),
        local_rotation: UnitQuaternion::identity(),
    }
}

fn cuboid(half_extents: Vector3<f32>) -> PlacedCollider {
    PlacedCollider {
        desc: ColliderDesc::Cuboid { half_extents },
        local_position: Vector3::zeros(),
        local_rotation: UnitQuaternion::identity(),
    }
}

/// (a) A free-falling dynamic body reaches the expected height after one
/// second of fixed ticks under an explicit non-default gravity.
#[test]
fn deferred_add_free_fall_matches_kinematics() {
    let mut world = PhysicsWorld::new(PhysicsWorldConfig {
        gravity: Vector3::new(0.0, -10.0, 0.0),
        ..PhysicsWorldConfig::default()
    });
    let mut objects = TestObjects::new();
    let mut dynamics = Slab::<DynamicBody>::new();
    let statics = Slab::<StaticBody>::new();
    let triggers = Slab::<Trigger>::new();
    let water = Slab::<WaterVolume>::new();
    let mut characters = Slab::<CharacterController>::new();

    let start = Vector3::new(0.0, 10.0, 0.0);
    let object = objects.spawn(TestObject {
        position: start,
        ..TestObject::default()
    });

    let handle = dynamics.push(DynamicBody::default());
    {
        let body = &mut dynamics.0[handle.index() as usize];
        body.colliders = vec![sphere(0.5)];
        body.mass_override = Some(1.0);
        body.game_object = object;
        body.begin_play(handle, &mut world.registry, start, UnitQuaternion::identity(), Vector3::new(1.0, 1.0, 1.0));
    }

    for frame in 0..60 {
        tick(
            &mut world,
            frame,
            &statics,
            &dynamics,
            &triggers,
            &mut characters,
            &water,
            &mut objects,
        );
    }

    // Free fall under g=10 for t=1s: delta_y = -0.5 * 10 * 1^2 = -5.
    let y = objects.object(object).position.y;
    assert!((y - 5.0).abs() < 0.25, "expected y close to 5.0, got {y}");
}

/// (b) A queued impulse on an otherwise-resting body shows up as the
/// expected velocity change on the very next tick.
#[test]
fn queued_impulse_changes_velocity_by_impulse_over_mass() {
    let mut world = PhysicsWorld::new(PhysicsWorldConfig::default());
    let mut objects = TestObjects::new();
    let mut dynamics = Slab::<DynamicBody>::new();
    let statics = Slab::<StaticBody>::new();
    let triggers = Slab::<Trigger>::new();
    let water = Slab::<WaterVolume>::new();
    let mut characters = Slab::<CharacterController>::new();

    let start = Vector3::new(0.0, 0.0, 0.0);
    let object = objects.spawn(TestObject {
        position: start,
        ..TestObject::default()
    });

    let handle = dynamics.push(DynamicBody::default());
    {
        let body = &mut dynamics.0[handle.index() as usize];
        body.colliders = vec![sphere(0.5)];
        body.mass_override = Some(2.0);
        body.flags = BodyFlags::empty();
        body.game_object = object;
        body.begin_play(handle, &mut world.registry, start, UnitQuaternion::identity(), Vector3::new(1.0, 1.0, 1.0));
        body.add_impulse(&mut world.registry, handle, Vector3::new(10.0, 0.0, 0.0));
    }

    tick(
        &mut world,
        0,
        &statics,
        &dynamics,
        &triggers,
        &mut characters,
        &water,
        &mut objects,
    );

    let native = dynamics.0[handle.index() as usize].native();
    let velocity = world.registry.rigid_bodies.get(native).unwrap().linvel();
    // impulse / mass = 10 / 2 = 5 m/s along x.
    assert!((velocity.x - 5.0).abs() < 0.25, "expected vx close to 5.0, got {}", velocity.x);
    assert!(velocity.y.abs() < 0.25);
}

/// (c) A body crossing a box trigger produces exactly one begin and one end
/// overlap event, in that order.
#[test]
fn trigger_reports_exactly_one_begin_and_one_end() {
    let mut world = PhysicsWorld::new(PhysicsWorldConfig {
        gravity: Vector3::zeros(),
        ..PhysicsWorldConfig::default()
    });
    let mut objects = TestObjects::new();
    let mut dynamics = Slab::<DynamicBody>::new();
    let statics = Slab::<StaticBody>::new();
    let mut triggers = Slab::<Trigger>::new();
    let water = Slab::<WaterVolume>::new();
    let mut characters = Slab::<CharacterController>::new();

    let trigger_object = objects.spawn(TestObject::default());
    let trigger_handle = triggers.push(Trigger::default());
    {
        let trigger = &mut triggers.0[trigger_handle.index() as usize];
        trigger.colliders = vec![cuboid(Vector3::new(1.0, 1.0, 1.0))];
        trigger.game_object = trigger_object;
        trigger.begin_play(
            trigger_handle,
            &mut world.registry,
            Vector3::zeros(),
            UnitQuaternion::identity(),
            Vector3::new(1.0, 1.0, 1.0),
            false,
        );
    }

    let ball_start = Vector3::new(3.0, 0.0, 0.0);
    let ball_object = objects.spawn(TestObject {
        position: ball_start,
        ..TestObject::default()
    });
    let ball_handle = dynamics.push(DynamicBody::default());
    {
        let ball = &mut dynamics.0[ball_handle.index() as usize];
        ball.colliders = vec![sphere(0.25)];
        ball.game_object = ball_object;
        ball.begin_play(
            ball_handle,
            &mut world.registry,
            ball_start,
            UnitQuaternion::identity(),
            Vector3::new(1.0, 1.0, 1.0),
        );
    }
    let native = dynamics.0[ball_handle.index() as usize].native();
    world
        .registry
        .rigid_bodies
        .get_mut(native)
        .unwrap()
        .set_linvel(Vector3::new(-1.0, 0.0, 0.0), true);

    // 5 seconds at 60Hz covers entry (around t=1.75s) and exit (around
    // t=4.25s) at constant velocity, box half-extent 1 and ball radius 0.25.
    for frame in 0..300 {
        tick(
            &mut world,
            frame,
            &statics,
            &dynamics,
            &triggers,
            &mut characters,
            &water,
            &mut objects,
        );
    }

    let owner = objects.object(trigger_object);
    assert_eq!(owner.begin_overlaps.len(), 1, "expected exactly one begin overlap");
    assert_eq!(owner.end_overlaps.len(), 1, "expected exactly one end overlap");
}

/// (d) A kinematic body driven toward a resting dynamic body produces a
/// nonzero contact impulse on the dynamic body.
#[test]
fn kinematic_push_produces_nonzero_contact_impulse() {
    let mut world = PhysicsWorld::new(PhysicsWorldConfig::default());
    let mut objects = TestObjects::new();
    let mut dynamics = Slab::<DynamicBody>::new();
    let statics = Slab::<StaticBody>::new();
    let triggers = Slab::<Trigger>::new();
    let water = Slab::<WaterVolume>::new();
    let mut characters = Slab::<CharacterController>::new();

    let box_object = objects.spawn(TestObject::default());
    let box_handle = dynamics.push(DynamicBody::default());
    {
        let box_body = &mut dynamics.0[box_handle.index() as usize];
        box_body.colliders = vec![cuboid(Vector3::new(0.5, 0.5, 0.5))];
        box_body.game_object = box_object;
        box_body.begin_play(
            box_handle,
            &mut world.registry,
            Vector3::zeros(),
            UnitQuaternion::identity(),
            Vector3::new(1.0, 1.0, 1.0),
        );
        box_body.set_kinematic(box_handle, &mut world.registry, true, objects.get_mut(box_object).unwrap());
    }

    let ball_start = Vector3::new(0.3, 0.5, 0.0);
    let ball_object = objects.spawn(TestObject {
        position: ball_start,
        ..TestObject::default()
    });
    let ball_handle = dynamics.push(DynamicBody::default());
    {
        let ball = &mut dynamics.0[ball_handle.index() as usize];
        ball.colliders = vec![sphere(0.25)];
        ball.flags = BodyFlags::DISPATCH_CONTACT_EVENTS;
        ball.game_object = ball_object;
        ball.begin_play(
            ball_handle,
            &mut world.registry,
            ball_start,
            UnitQuaternion::identity(),
            Vector3::new(1.0, 1.0, 1.0),
        );
    }

    // Drive the kinematic box toward the resting ball.
    objects.get_mut(box_object).unwrap().set_world_position(Vector3::new(1.0, 0.0, 0.0));

    for frame in 0..10 {
        tick(
            &mut world,
            frame,
            &statics,
            &dynamics,
            &triggers,
            &mut characters,
            &water,
            &mut objects,
        );
    }

    let owner = objects.object(ball_object);
    assert!(!owner.begin_contacts.is_empty(), "expected at least one contact event");
    let impulse = owner.begin_contacts[0].points.first().map(|p| p.impulse).unwrap_or(0.0);
    assert!(impulse > 0.0, "expected nonzero contact impulse, got {impulse}");
}

/// (e) A character falling onto a slope steeper than its configured maximum
/// ends up classified as on-steep-ground with its velocity no longer
/// pointing into the surface.
#[test]
fn character_on_steep_slope_is_classified_and_projected() {
    let mut world = PhysicsWorld::new(PhysicsWorldConfig::default());
    let mut objects = TestObjects::new();
    let statics_obj = objects.spawn(TestObject::default());
    let mut statics = Slab::<StaticBody>::new();
    let static_handle = statics.push(StaticBody::default());
    {
        let slope = &mut statics.0[static_handle.index() as usize];
        // A large, thin plate, rotated 50 degrees about Z: every point away
        // from its edges has a uniform 50 degree slope, well past the
        // default 45 degree maximum.
        slope.colliders = vec![cuboid(Vector3::new(10.0, 0.5, 10.0))];
        slope.game_object = statics_obj;
        slope.begin_play(
            static_handle,
            &mut world.registry,
            Vector3::new(0.0, -3.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 50.0f32.to_radians()),
            Vector3::new(1.0, 1.0, 1.0),
        );
    }

    let dynamics = Slab::<DynamicBody>::new();
    let triggers = Slab::<Trigger>::new();
    let water = Slab::<WaterVolume>::new();
    let mut characters = Slab::<CharacterController>::new();

    let character_object = objects.spawn(TestObject {
        position: Vector3::new(0.0, 2.0, 0.0),
        ..TestObject::default()
    });
    let character_handle = characters.push(CharacterController::default());
    {
        let character = &mut characters.0[character_handle.index() as usize];
        character.game_object = character_object;
        character.begin_play(&mut world.registry, Vector3::new(0.0, 2.0, 0.0), UnitQuaternion::identity());
    }

    let mut observed_steep = false;
    let mut velocity_into_surface = true;
    for frame in 0..180 {
        tick(
            &mut world,
            frame,
            &statics,
            &dynamics,
            &triggers,
            &mut characters,
            &water,
            &mut objects,
        );
        let character = &characters.0[character_handle.index() as usize];
        if character.is_on_steep_ground() {
            observed_steep = true;
            let normal = character.ground_normal();
            velocity_into_surface = character.linear_velocity.dot(&normal) > 1e-3;
            break;
        }
    }

    assert!(observed_steep, "character never reached the steep-ground state");
    assert!(!velocity_into_surface, "velocity still points into the slope after projection");
}

/// (f) A sphere submerged in a water volume floats upward without sinking
/// through the volume's floor.
#[test]
fn buoyancy_floats_submerged_body_upward() {
    let mut world = PhysicsWorld::new(PhysicsWorldConfig::default());
    let mut objects = TestObjects::new();
    let mut dynamics = Slab::<DynamicBody>::new();
    let statics = Slab::<StaticBody>::new();
    let triggers = Slab::<Trigger>::new();
    let mut water = Slab::<WaterVolume>::new();
    let mut characters = Slab::<CharacterController>::new();

    let water_object = objects.spawn(TestObject::default());
    water.push(WaterVolume {
        half_extents: Vector3::new(5.0, 1.0, 5.0),
        game_object: water_object,
        ..WaterVolume::default()
    });

    let start = Vector3::new(0.0, 0.5, 0.0);
    let sphere_object = objects.spawn(TestObject {
        position: start,
        ..TestObject::default()
    });
    let sphere_handle = dynamics.push(DynamicBody::default());
    {
        let body = &mut dynamics.0[sphere_handle.index() as usize];
        body.colliders = vec![sphere(0.2)];
        body.mass_override = Some(1.0);
        body.game_object = sphere_object;
        body.begin_play(sphere_handle, &mut world.registry, start, UnitQuaternion::identity(), Vector3::new(1.0, 1.0, 1.0));
    }

    for frame in 0..30 {
        tick(
            &mut world,
            frame,
            &statics,
            &dynamics,
            &triggers,
            &mut characters,
            &water,
            &mut objects,
        );
    }

    let native = dynamics.0[sphere_handle.index() as usize].native();
    let velocity_y = world.registry.rigid_bodies.get(native).unwrap().linvel().y;
    let position_y = objects.object(sphere_object).position.y;
    assert!(velocity_y > 0.0, "expected upward velocity, got {velocity_y}");
    assert!(position_y > -1.0, "sphere sank through the volume floor, y={position_y}");
}
