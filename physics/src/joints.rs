//! Joint construction and generalized-coordinate readout.
//!
//! Every jointed body owns its own rigid body; welded descendants are folded
//! into it. Hinge, slide and ball joints become impulse joints whose two local
//! frames coincide at the reference configuration, so rapier's limits and our
//! coordinate readout agree on where zero is. Free joints add no constraint.

use std::f32::consts::{PI, TAU};

use nalgebra::{Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3};
use rapier3d::dynamics::{
    GenericJoint, GenericJointBuilder, JointAxesMask, JointAxis, MotorModel, RigidBody,
    RigidBodyHandle, RigidBodySet,
};

use crate::model::{Joint, JointType};

/// Runtime bookkeeping for one model joint.
#[derive(Debug, Clone)]
pub(crate) struct JointFrame {
    kind: JointType,
    parent: RigidBodyHandle,
    /// Pose of the parent body inside its rigid body.
    parent_offset: Isometry3<f32>,
    child: RigidBodyHandle,
    /// Axis in the child body frame.
    axis: Unit<Vector3<f32>>,
    /// Child frame relative to the parent body frame at the reference configuration.
    rest: Isometry3<f32>,
    /// Last wrapped hinge angle, used to unwrap across ±π.
    last_angle: f32,
    /// Accumulated hinge angle.
    angle: f64,
}

impl JointFrame {
    pub fn new(
        joint: &Joint,
        parent: RigidBodyHandle,
        parent_offset: Isometry3<f32>,
        child: RigidBodyHandle,
        rest: Isometry3<f32>,
    ) -> Self {
        Self {
            kind: joint.kind,
            parent,
            parent_offset,
            child,
            axis: Unit::new_normalize(joint.axis.into_inner().cast::<f32>()),
            rest,
            last_angle: 0.0,
            angle: 0.0,
        }
    }

    pub fn kind(&self) -> JointType {
        self.kind
    }

    /// Rapier constraint for this joint, or `None` for free joints.
    pub fn constraint(&self, joint: &Joint) -> Option<GenericJoint> {
        let (mask, axis) = match self.kind {
            JointType::Free => return None,
            JointType::Hinge => (JointAxesMask::LOCKED_REVOLUTE_AXES, JointAxis::AngX),
            JointType::Slide => (JointAxesMask::LOCKED_PRISMATIC_AXES, JointAxis::LinX),
            JointType::Ball => (JointAxesMask::LOCKED_SPHERICAL_AXES, JointAxis::AngX),
        };

        // Joint frame in the child: anchored at the joint position, X along the axis.
        let orientation = UnitQuaternion::rotation_between(&Vector3::x(), &self.axis.into_inner())
            .unwrap_or_else(|| UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI));
        let frame2 = Isometry3::from_parts(
            Translation3::from(joint.pos.cast::<f32>()),
            orientation,
        );
        let frame1 = self.parent_offset * self.rest * frame2;

        let mut builder = GenericJointBuilder::new(mask)
            .local_frame1(frame1)
            .local_frame2(frame2)
            .contacts_enabled(false);

        if matches!(self.kind, JointType::Hinge | JointType::Slide) {
            if let Some((lo, hi)) = joint.range {
                builder = builder.limits(axis, [lo as f32, hi as f32]);
            }
            if joint.damping > 0.0 {
                builder = builder
                    .motor_model(axis, MotorModel::ForceBased)
                    .motor_velocity(axis, 0.0, joint.damping as f32);
            }
        }

        Some(builder.build())
    }

    /// Parent body frame in world coordinates.
    fn parent_frame<'a>(
        &self,
        bodies: &'a RigidBodySet,
    ) -> Option<(Isometry3<f32>, &'a RigidBody)> {
        let rb = bodies.get(self.parent)?;
        Some((rb.position() * self.parent_offset, rb))
    }

    /// Joint axis in world coordinates.
    pub fn world_axis(&self, bodies: &RigidBodySet) -> Option<Vector3<f32>> {
        let child = bodies.get(self.child)?;
        Some(child.position().rotation * self.axis.into_inner())
    }

    /// Write this joint's coordinates into `qpos` and `qvel` slices of its own width.
    pub fn read(&mut self, bodies: &RigidBodySet, qpos: &mut [f64], qvel: &mut [f64]) {
        let Some(child_rb) = bodies.get(self.child) else {
            return;
        };
        let child = *child_rb.position();
        let child_angvel = *child_rb.angvel();

        if self.kind == JointType::Free {
            let origin = Point3::from(child.translation.vector);
            let linear = velocity_at(child_rb, &origin);
            let angular = child.rotation.inverse() * child_angvel;
            write_vec(&mut qpos[..3], &child.translation.vector);
            write_quat(&mut qpos[3..7], &child.rotation);
            write_vec(&mut qvel[..3], &linear);
            write_vec(&mut qvel[3..6], &angular);
            return;
        }

        let Some((parent, parent_rb)) = self.parent_frame(bodies) else {
            return;
        };
        let relative = parent.inverse() * child;
        let rel_angvel = child_angvel - parent_rb.angvel();
        let axis_parent = self.rest.rotation * self.axis.into_inner();

        match self.kind {
            JointType::Hinge => {
                let delta = relative.rotation * self.rest.rotation.inverse();
                let raw = delta.scaled_axis().dot(&axis_parent);
                let mut step = raw - self.last_angle;
                if step > PI {
                    step -= TAU;
                } else if step < -PI {
                    step += TAU;
                }
                self.angle += step as f64;
                self.last_angle = raw;

                let axis_world = child.rotation * self.axis.into_inner();
                qpos[0] = self.angle;
                qvel[0] = rel_angvel.dot(&axis_world) as f64;
            }
            JointType::Slide => {
                let displacement =
                    (relative.translation.vector - self.rest.translation.vector).dot(&axis_parent);
                let axis_world = parent.rotation * axis_parent;
                let child_origin = Point3::from(child.translation.vector);
                let parent_origin = Point3::from(parent.translation.vector);
                let lever = child_origin - parent_origin;
                let rate = (velocity_at(child_rb, &child_origin)
                    - velocity_at(parent_rb, &parent_origin))
                .dot(&axis_world)
                    + lever.dot(&parent_rb.angvel().cross(&axis_world));
                qpos[0] = displacement as f64;
                qvel[0] = rate as f64;
            }
            JointType::Ball => {
                let rotation = self.rest.rotation.inverse() * relative.rotation;
                write_quat(&mut qpos[..4], &rotation);
                write_vec(&mut qvel[..3], &(child.rotation.inverse() * rel_angvel));
            }
            JointType::Free => unreachable!("handled above"),
        }
    }

    /// Apply a generalized force along a hinge or slide axis.
    ///
    /// Torque (hinge) or force (slide) acts on the child and reacts on the parent.
    pub fn apply_force(&self, bodies: &mut RigidBodySet, force: f64) {
        let Some(axis) = self.world_axis(bodies) else {
            return;
        };
        let load = axis * force as f32;
        match self.kind {
            JointType::Hinge => {
                if let Some(child) = bodies.get_mut(self.child) {
                    child.add_torque(load, true);
                }
                if let Some(parent) = bodies.get_mut(self.parent) {
                    parent.add_torque(-load, true);
                }
            }
            JointType::Slide => {
                if let Some(child) = bodies.get_mut(self.child) {
                    child.add_force(load, true);
                }
                if let Some(parent) = bodies.get_mut(self.parent) {
                    parent.add_force(-load, true);
                }
            }
            JointType::Ball | JointType::Free => {}
        }
    }
}

/// Velocity of a world point rigidly attached to a body.
pub(crate) fn velocity_at(rb: &RigidBody, point: &Point3<f32>) -> Vector3<f32> {
    rb.linvel() + rb.angvel().cross(&(point - rb.center_of_mass()))
}

fn write_vec(out: &mut [f64], v: &Vector3<f32>) {
    for (slot, value) in out.iter_mut().zip(v.iter()) {
        *slot = *value as f64;
    }
}

fn write_quat(out: &mut [f64], q: &UnitQuaternion<f32>) {
    out[0] = q.w as f64;
    out[1] = q.i as f64;
    out[2] = q.j as f64;
    out[3] = q.k as f64;
}
