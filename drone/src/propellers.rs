//! Propeller thrust and drag torque.

use common::debug::lookup;
use common::Controller;
use physics::{Data, Model, ObjectKind};

pub const PROPELLER_NAMES: [&str; 4] = ["prop1", "prop2", "prop3", "prop4"];

/// Thrust per propeller in newtons.
pub const THRUST: [f64; 4] = [1.2, 1.2, 1.2, 1.2];

/// Drag torque per propeller about its spin axis, N·m.
pub const TORQUE: [f64; 4] = [0.01, 0.0, 0.0, 0.0];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Propeller {
    pub body: usize,
    pub thrust: f64,
    pub torque: f64,
}

/// Writes each propeller's wrench into `xfrc_applied`.
///
/// Thrust and torque act along the propeller's local +Z and are rotated into
/// the world frame with the body's current orientation.
#[derive(Debug, Clone, Default)]
pub struct PropellerController {
    propellers: Vec<Propeller>,
}

impl PropellerController {
    /// Resolve the propeller bodies once. Missing bodies are reported and left out.
    pub fn new(model: &Model) -> Self {
        let propellers = PROPELLER_NAMES
            .iter()
            .zip(THRUST.iter().zip(TORQUE.iter()))
            .filter_map(|(name, (&thrust, &torque))| {
                match lookup(model, ObjectKind::Body, name) {
                    Ok(body) => Some(Propeller { body, thrust, torque }),
                    Err(err) => {
                        log::error!("{err}");
                        None
                    }
                }
            })
            .collect();
        Self { propellers }
    }

    pub fn propellers(&self) -> &[Propeller] {
        &self.propellers
    }
}

impl Controller for PropellerController {
    fn apply(&mut self, _model: &Model, data: &mut Data) {
        for prop in &self.propellers {
            let rotation = data.state().xmat(prop.body);
            let force = body_to_world(&rotation, [0.0, 0.0, prop.thrust]);
            let torque = body_to_world(&rotation, [0.0, 0.0, prop.torque]);

            let wrench = data.xfrc_applied_mut(prop.body);
            wrench[..3].copy_from_slice(&force);
            wrench[3..].copy_from_slice(&torque);
        }
    }
}

/// Rotate a body-frame vector by a row-major rotation matrix.
pub fn body_to_world(r: &[f64; 9], v: [f64; 3]) -> [f64; 3] {
    [
        r[0] * v[0] + r[1] * v[1] + r[2] * v[2],
        r[3] * v[0] + r[4] * v[1] + r[5] * v[2],
        r[6] * v[0] + r[7] * v[1] + r[8] * v[2],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const DRONE: &str = include_str!("../../models/drone.xml");

    #[test]
    fn test_resolves_all_propellers() {
        let model = Model::from_xml_str(DRONE).unwrap();
        let controller = PropellerController::new(&model);
        assert_eq!(controller.propellers().len(), 4);
        assert_eq!(
            controller.propellers()[0].body,
            model.name_to_id(ObjectKind::Body, "prop1").unwrap()
        );
    }

    #[test]
    fn test_missing_propellers_are_skipped() {
        let model = Model::from_xml_str(
            r#"<mujoco><worldbody>
                <body name="prop2"><freejoint/><geom type="sphere" size="0.05"/></body>
            </worldbody></mujoco>"#,
        )
        .unwrap();
        let controller = PropellerController::new(&model);
        assert_eq!(controller.propellers().len(), 1);
        assert_eq!(controller.propellers()[0].thrust, THRUST[1]);
    }

    #[test]
    fn test_wrench_written_in_world_frame() {
        let model = Model::from_xml_str(DRONE).unwrap();
        let mut data = model.make_data();
        let mut controller = PropellerController::new(&model);
        controller.apply(&model, &mut data);

        let prop1 = model.name_to_id(ObjectKind::Body, "prop1").unwrap();
        let wrench = data.state().xfrc_applied(prop1);
        assert_relative_eq!(wrench[2], 1.2, epsilon = 1e-6);
        assert_relative_eq!(wrench[5], 0.01, epsilon = 1e-6);
        assert_relative_eq!(wrench[0], 0.0, epsilon = 1e-6);

        let prop3 = model.name_to_id(ObjectKind::Body, "prop3").unwrap();
        assert_relative_eq!(data.state().xfrc_applied(prop3)[5], 0.0);
    }

    #[test]
    fn test_body_to_world_rotates() {
        // 90 degrees about X: local +Z maps to world -Y.
        let r = [1.0, 0.0, 0.0, 0.0, 0.0, -1.0, 0.0, 1.0, 0.0];
        let v = body_to_world(&r, [0.0, 0.0, 2.0]);
        assert_relative_eq!(v[1], -2.0);
        assert_relative_eq!(v[2], 0.0);
    }

    #[test]
    fn test_thrust_lifts_drone() {
        let model = Model::from_xml_str(DRONE).unwrap();
        let mut data = model.make_data();
        let mut controller = PropellerController::new(&model);
        let start = data.state().qpos()[2];
        for _ in 0..500 {
            controller.apply(&model, &mut data);
            data.step(&model);
        }
        assert!(data.state().qpos()[2] > start + 0.02);
        // Yaw torque from prop1 spins the airframe about Z.
        assert!(data.state().qvel()[5] > 0.0);
    }
}
