//! Mutable simulation data: the state arrays plus the rapier world that advances them.

use nalgebra::{Isometry3, Vector3};
use rapier3d::dynamics::{
    CCDSolver, ImpulseJointSet, IntegrationParameters, IslandManager, MultibodyJointSet,
    RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};
use rapier3d::geometry::{BroadPhaseMultiSap, ColliderSet, NarrowPhase};
use rapier3d::pipeline::{PhysicsPipeline, QueryPipeline};

use crate::colliders::geom_collider;
use crate::joints::JointFrame;
use crate::model::{ActuatorKind, Model};

/// Simulation variables for a model, advanced over time.
///
/// `qpos`/`qvel` follow the model's joint address tables. Per-body arrays are
/// indexed by body id: `xpos` (3), `xquat` (4, w first), `xmat` (9, row major)
/// and `xfrc_applied` (6, world force then world torque).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State {
    time: f64,
    qpos: Vec<f64>,
    qvel: Vec<f64>,
    qacc: Vec<f64>,
    ctrl: Vec<f64>,
    actuator_force: Vec<f64>,
    xpos: Vec<[f64; 3]>,
    xquat: Vec<[f64; 4]>,
    xmat: Vec<[f64; 9]>,
    xfrc_applied: Vec<[f64; 6]>,
}

impl State {
    fn new(model: &Model) -> Self {
        let nbody = model.nbody();
        Self {
            time: 0.0,
            qpos: vec![0.0; model.nq()],
            qvel: vec![0.0; model.nv()],
            qacc: vec![0.0; model.nv()],
            ctrl: vec![0.0; model.nu()],
            actuator_force: vec![0.0; model.nu()],
            xpos: vec![[0.0; 3]; nbody],
            xquat: vec![[1.0, 0.0, 0.0, 0.0]; nbody],
            xmat: vec![[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]; nbody],
            xfrc_applied: vec![[0.0; 6]; nbody],
        }
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn qpos(&self) -> &[f64] {
        &self.qpos
    }

    pub fn qvel(&self) -> &[f64] {
        &self.qvel
    }

    /// Generalized accelerations over the last step.
    pub fn qacc(&self) -> &[f64] {
        &self.qacc
    }

    pub fn ctrl(&self) -> &[f64] {
        &self.ctrl
    }

    /// Scalar actuator forces used in the last step, before gearing.
    pub fn actuator_force(&self) -> &[f64] {
        &self.actuator_force
    }

    /// World position of a body frame.
    pub fn xpos(&self, body: usize) -> [f64; 3] {
        self.xpos[body]
    }

    /// World orientation of a body frame as `[w, x, y, z]`.
    pub fn xquat(&self, body: usize) -> [f64; 4] {
        self.xquat[body]
    }

    /// World rotation matrix of a body frame, row major.
    pub fn xmat(&self, body: usize) -> [f64; 9] {
        self.xmat[body]
    }

    /// External wrench applied to a body, world frame.
    pub fn xfrc_applied(&self, body: usize) -> [f64; 6] {
        self.xfrc_applied[body]
    }
}

/// Placement of a model body inside the rapier world.
#[derive(Debug, Clone, Copy)]
struct BodyFrame {
    handle: RigidBodyHandle,
    /// Body frame relative to the rigid body frame.
    offset: Isometry3<f32>,
}

/// Rapier pipeline components.
struct World {
    pipeline: PhysicsPipeline,
    gravity: Vector3<f32>,
    integration_params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl World {
    fn new(model: &Model) -> Self {
        let [gx, gy, gz] = model.options().gravity;
        let mut integration_params = IntegrationParameters::default();
        integration_params.dt = model.timestep() as f32;
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: Vector3::new(gx as f32, gy as f32, gz as f32),
            integration_params,
            islands: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }
}

/// Simulation data for one model: the [`State`] plus the engine world behind it.
pub struct Data {
    state: State,
    world: World,
    bodies: Vec<BodyFrame>,
    joints: Vec<JointFrame>,
    nbody: usize,
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("state", &self.state)
            .field("rigid_bodies", &self.world.bodies.len())
            .field("colliders", &self.world.colliders.len())
            .finish()
    }
}

impl Data {
    /// Build the engine world for `model` at its reference configuration.
    pub fn new(model: &Model) -> Self {
        let mut world = World::new(model);
        let poses = model.reference_poses();

        // Bodies are stored parents-first, so a single pass can fold welded
        // children into their ancestor's rigid body.
        let mut frames: Vec<BodyFrame> = Vec::with_capacity(model.nbody());
        for (id, body) in model.bodies().iter().enumerate() {
            let frame = match body.parent {
                None => BodyFrame {
                    handle: world.bodies.insert(RigidBodyBuilder::fixed().build()),
                    offset: Isometry3::identity(),
                },
                Some(_) if body.joint.is_some() => {
                    let mut builder = RigidBodyBuilder::dynamic()
                        .position(poses[id].cast::<f32>())
                        .can_sleep(false);
                    if let Some(mprops) = group_mass_properties(model, id) {
                        builder = builder.additional_mass_properties(mprops);
                    }
                    BodyFrame {
                        handle: world.bodies.insert(builder.build()),
                        offset: Isometry3::identity(),
                    }
                }
                Some(parent) => BodyFrame {
                    handle: frames[parent].handle,
                    offset: frames[parent].offset * body.local_isometry().cast::<f32>(),
                },
            };
            frames.push(frame);
        }

        for geom in model.geoms() {
            let frame = frames[geom.body];
            let collider = geom_collider(geom, &frame.offset);
            world
                .colliders
                .insert_with_parent(collider, frame.handle, &mut world.bodies);
        }

        let mut joints = Vec::with_capacity(model.joints().len());
        for joint in model.joints() {
            let body = &model.bodies()[joint.body];
            let parent = body.parent.map(|p| frames[p]).unwrap_or(frames[0]);
            let frame = JointFrame::new(
                joint,
                parent.handle,
                parent.offset,
                frames[joint.body].handle,
                body.local_isometry().cast::<f32>(),
            );
            if let Some(constraint) = frame.constraint(joint) {
                world.impulse_joints.insert(
                    parent.handle,
                    frames[joint.body].handle,
                    constraint,
                    true,
                );
            }
            joints.push(frame);
        }

        log::debug!(
            "Built world for '{}': {} rigid bodies, {} colliders, {} impulse joints",
            model.name(),
            world.bodies.len(),
            world.colliders.len(),
            world.impulse_joints.len()
        );

        let mut data = Self {
            state: State::new(model),
            world,
            bodies: frames,
            joints,
            nbody: model.nbody(),
        };
        data.forward(model);
        data
    }

    /// Current state.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> State {
        self.state.clone()
    }

    /// Simulated time in seconds.
    pub fn time(&self) -> f64 {
        self.state.time
    }

    /// Control inputs, one per actuator.
    pub fn ctrl_mut(&mut self) -> &mut [f64] {
        &mut self.state.ctrl
    }

    /// External wrench on a body: world force `[0..3]` and torque `[3..6]`.
    ///
    /// The wrench stays applied on every step until overwritten.
    pub fn xfrc_applied_mut(&mut self, body: usize) -> &mut [f64; 6] {
        &mut self.state.xfrc_applied[body]
    }

    /// Recompute derived quantities (body poses, joint coordinates) from the
    /// engine without advancing time.
    pub fn forward(&mut self, model: &Model) {
        debug_assert_eq!(model.nbody(), self.nbody, "data was built for another model");

        for (id, frame) in self.bodies.iter().enumerate() {
            let Some(rb) = self.world.bodies.get(frame.handle) else {
                continue;
            };
            let pose = rb.position() * frame.offset;
            let t = pose.translation.vector;
            let q = pose.rotation;
            let m = q.to_rotation_matrix();
            self.state.xpos[id] = [t.x as f64, t.y as f64, t.z as f64];
            self.state.xquat[id] = [q.w as f64, q.i as f64, q.j as f64, q.k as f64];
            let mut xmat = [0.0; 9];
            for row in 0..3 {
                for col in 0..3 {
                    xmat[row * 3 + col] = m[(row, col)] as f64;
                }
            }
            self.state.xmat[id] = xmat;
        }

        for (joint, frame) in model.joints().iter().zip(self.joints.iter_mut()) {
            let nq = frame.kind().nq();
            let nv = frame.kind().nv();
            frame.read(
                &self.world.bodies,
                &mut self.state.qpos[joint.qposadr..joint.qposadr + nq],
                &mut self.state.qvel[joint.dofadr..joint.dofadr + nv],
            );
        }
    }

    /// Advance the simulation by one timestep.
    ///
    /// Applies `xfrc_applied` and actuator forces computed from `ctrl`, steps
    /// the engine, then refreshes derived quantities.
    pub fn step(&mut self, model: &Model) {
        let previous_qvel = self.state.qvel.clone();

        self.apply_external_forces(model);
        self.apply_actuator_forces(model);
        self.world.step();

        self.state.time += model.timestep();
        self.forward(model);

        let dt = model.timestep();
        for ((acc, now), before) in self
            .state
            .qacc
            .iter_mut()
            .zip(&self.state.qvel)
            .zip(&previous_qvel)
        {
            *acc = (now - before) / dt;
        }
    }

    fn apply_external_forces(&mut self, model: &Model) {
        for frame in &self.bodies {
            if let Some(rb) = self.world.bodies.get_mut(frame.handle) {
                rb.reset_forces(false);
                rb.reset_torques(false);
            }
        }

        for (id, wrench) in self.state.xfrc_applied.iter().enumerate().skip(1) {
            if wrench.iter().all(|v| *v == 0.0) {
                continue;
            }
            let frame = self.bodies[id];
            let Some(rb) = self.world.bodies.get_mut(frame.handle) else {
                continue;
            };
            let com = rb.position() * frame.offset * model.bodies()[id].local_com().cast::<f32>();
            let force = Vector3::new(wrench[0] as f32, wrench[1] as f32, wrench[2] as f32);
            let torque = Vector3::new(wrench[3] as f32, wrench[4] as f32, wrench[5] as f32);
            rb.add_force_at_point(force, com, true);
            rb.add_torque(torque, true);
        }
    }

    fn apply_actuator_forces(&mut self, model: &Model) {
        for (id, actuator) in model.actuators().iter().enumerate() {
            let joint = &model.joints()[actuator.joint];
            let ctrl = actuator.clamp_ctrl(self.state.ctrl[id]);
            let force = match actuator.kind {
                ActuatorKind::Motor => ctrl,
                ActuatorKind::Position { kp } => kp * (ctrl - self.state.qpos[joint.qposadr]),
                ActuatorKind::Velocity { kv } => kv * (ctrl - self.state.qvel[joint.dofadr]),
            };
            self.state.actuator_force[id] = force;
            self.joints[actuator.joint].apply_force(&mut self.world.bodies, actuator.gear * force);
        }
    }
}

/// Combined mass of a jointed body and everything welded to it, in its own frame.
fn group_mass_properties(
    model: &Model,
    root: usize,
) -> Option<rapier3d::dynamics::MassProperties> {
    let mut offsets: Vec<Option<Isometry3<f64>>> = vec![None; model.nbody()];
    offsets[root] = Some(Isometry3::identity());
    let mut total = None;
    for (id, body) in model.bodies().iter().enumerate().skip(root) {
        if body.group != root {
            continue;
        }
        let offset = match (id == root, body.parent) {
            (true, _) => Isometry3::identity(),
            (false, Some(parent)) => match offsets[parent] {
                Some(parent_offset) => parent_offset * body.local_isometry(),
                None => continue,
            },
            (false, None) => continue,
        };
        offsets[id] = Some(offset);
        if let Some(mprops) = body.mass_properties {
            let placed = mprops.transform_by(&offset.cast::<f32>());
            total = Some(match total {
                Some(acc) => acc + placed,
                None => placed,
            });
        }
    }
    total
}
