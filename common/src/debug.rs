//! Console helpers that report joint, body and actuator state by name.
//!
//! Each report has a `*_line` form returning the formatted text (or a
//! [`LookupError`]) and a `print_*` form that writes it to stdout. A failed
//! lookup is logged as an error and otherwise skipped.

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt::Write as _;

use physics::{JointType, Model, ObjectKind, State};
use thiserror::Error;

/// Failure to resolve a named object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: ObjectKind, name: String },

    #[error("joint '{0}' is not a hinge")]
    NotHinge(String),
}

/// Resolve `name` in the given category.
pub fn lookup(model: &Model, kind: ObjectKind, name: &str) -> Result<usize, LookupError> {
    model
        .name_to_id(kind, name)
        .ok_or_else(|| LookupError::NotFound {
            kind,
            name: name.to_string(),
        })
}

/// Radians to degrees.
pub fn rad_to_deg(radians: f64) -> f64 {
    radians * (180.0 / PI)
}

/// Degrees to radians.
pub fn deg_to_rad(degrees: f64) -> f64 {
    degrees * (PI / 180.0)
}

/// Roll (X), pitch (Y) and yaw (Z) angles in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl EulerAngles {
    pub fn to_degrees(self) -> Self {
        Self {
            roll: rad_to_deg(self.roll),
            pitch: rad_to_deg(self.pitch),
            yaw: rad_to_deg(self.yaw),
        }
    }
}

/// Convert a `[w, x, y, z]` quaternion to roll/pitch/yaw.
///
/// At the gimbal-lock boundary pitch saturates to ±π/2 instead of producing NaN.
pub fn quat_to_euler(quat: [f64; 4]) -> EulerAngles {
    let [w, x, y, z] = quat;

    let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));

    let sinp = 2.0 * (w * y - z * x);
    let pitch = if sinp.abs() >= 1.0 {
        FRAC_PI_2.copysign(sinp)
    } else {
        sinp.asin()
    };

    let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

    EulerAngles { roll, pitch, yaw }
}

/// Human readable joint type.
pub fn joint_type_label(kind: JointType) -> &'static str {
    match kind {
        JointType::Hinge => "Hinge (Revolute)",
        JointType::Slide => "Slide (Prismatic)",
        JointType::Ball => "Ball (Spherical)",
        JointType::Free => "Free (6DOF)",
    }
}

/// Type of the named joint.
pub fn joint_type_by_name(model: &Model, name: &str) -> Result<&'static str, LookupError> {
    let id = lookup(model, ObjectKind::Joint, name)?;
    Ok(joint_type_label(model.joints()[id].kind))
}

fn join(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn joint_state_line(model: &Model, state: &State, name: &str) -> Result<String, LookupError> {
    let joint = &model.joints()[lookup(model, ObjectKind::Joint, name)?];
    let qpos = &state.qpos()[joint.qposadr..joint.qposadr + joint.kind.nq()];
    let qvel = &state.qvel()[joint.dofadr..joint.dofadr + joint.kind.nv()];
    Ok(format!(
        "[Joint] {name} | qpos: {}, qvel: {}",
        join(qpos),
        join(qvel)
    ))
}

pub fn hinge_state_line(model: &Model, state: &State, name: &str) -> Result<String, LookupError> {
    let joint = &model.joints()[lookup(model, ObjectKind::Joint, name)?];
    if joint.kind != JointType::Hinge {
        return Err(LookupError::NotHinge(name.to_string()));
    }
    Ok(format!(
        "[Hinge Joint] {name} | Angle (deg): {}° | Angular Velocity (rad/s): {}",
        rad_to_deg(state.qpos()[joint.qposadr]),
        state.qvel()[joint.dofadr]
    ))
}

pub fn body_state_line(model: &Model, state: &State, name: &str) -> Result<String, LookupError> {
    let [x, y, z] = state.xpos(lookup(model, ObjectKind::Body, name)?);
    Ok(format!("[Body] {name} | Position: ({x}, {y}, {z})"))
}

pub fn body_inertia_line(model: &Model, name: &str) -> Result<String, LookupError> {
    let body = &model.bodies()[lookup(model, ObjectKind::Body, name)?];
    let [ix, iy, iz] = body.inertia;
    Ok(format!(
        "[Body Inertia] {name} | Mass: {} | Inertia Tensor: ({ix}, {iy}, {iz})",
        body.mass
    ))
}

/// Unit used when reporting orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleFormat {
    Radians,
    Degrees,
}

pub fn body_orientation_line(
    model: &Model,
    state: &State,
    name: &str,
    format: AngleFormat,
) -> Result<String, LookupError> {
    let euler = quat_to_euler(state.xquat(lookup(model, ObjectKind::Body, name)?));
    Ok(match format {
        AngleFormat::Radians => format!(
            "[Body Orientation (rad)] {name} | Roll: {}, Pitch: {}, Yaw: {}",
            euler.roll, euler.pitch, euler.yaw
        ),
        AngleFormat::Degrees => {
            let deg = euler.to_degrees();
            format!(
                "[Body Orientation (deg)] {name} | Roll: {}°, Pitch: {}°, Yaw: {}°",
                deg.roll, deg.pitch, deg.yaw
            )
        }
    })
}

pub fn actuator_line(model: &Model, state: &State, name: &str) -> Result<String, LookupError> {
    let id = lookup(model, ObjectKind::Actuator, name)?;
    Ok(format!("[Actuator] {name} | Control Input: {}", state.ctrl()[id]))
}

pub fn actuator_range_line(model: &Model, name: &str) -> Result<String, LookupError> {
    let actuator = &model.actuators()[lookup(model, ObjectKind::Actuator, name)?];
    Ok(match actuator.ctrlrange {
        Some((lo, hi)) => format!("[Actuator Range] {name} | Control Range: ({lo}, {hi})"),
        None => format!("[Actuator Range] {name} | Control Range: unlimited"),
    })
}

fn emit(line: Result<String, LookupError>) {
    match line {
        Ok(line) => println!("{line}"),
        Err(err) => log::error!("{err}"),
    }
}

pub fn print_joint_type(model: &Model, name: &str) {
    emit(joint_type_by_name(model, name).map(|kind| format!("[Joint Type] {name} | {kind}")));
}

pub fn print_joint_state(model: &Model, state: &State, name: &str) {
    emit(joint_state_line(model, state, name));
}

pub fn print_hinge_state_deg(model: &Model, state: &State, name: &str) {
    emit(hinge_state_line(model, state, name));
}

pub fn print_body_state(model: &Model, state: &State, name: &str) {
    emit(body_state_line(model, state, name));
}

pub fn print_body_inertia(model: &Model, name: &str) {
    emit(body_inertia_line(model, name));
}

pub fn print_body_orientation_rad(model: &Model, state: &State, name: &str) {
    emit(body_orientation_line(model, state, name, AngleFormat::Radians));
}

pub fn print_body_orientation_deg(model: &Model, state: &State, name: &str) {
    emit(body_orientation_line(model, state, name, AngleFormat::Degrees));
}

pub fn print_actuator(model: &Model, state: &State, name: &str) {
    emit(actuator_line(model, state, name));
}

pub fn print_actuator_range(model: &Model, name: &str) {
    emit(actuator_range_line(model, name));
}

/// Full report: time, every named joint, body and actuator.
pub fn all_states_report(model: &Model, state: &State) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "========== Simulation State ==========");
    let _ = writeln!(out, "[Time] Simulation Time: {} s", state.time());

    let mut push = |line: Result<String, LookupError>| {
        if let Ok(line) = line {
            let _ = writeln!(out, "{line}");
        }
    };

    for (id, joint) in model.joints().iter().enumerate() {
        let Some(name) = model.id_to_name(ObjectKind::Joint, id) else {
            continue;
        };
        match joint.kind {
            JointType::Hinge => push(hinge_state_line(model, state, name)),
            _ => push(joint_state_line(model, state, name)),
        }
    }
    for id in 1..model.nbody() {
        let Some(name) = model.id_to_name(ObjectKind::Body, id) else {
            continue;
        };
        push(body_state_line(model, state, name));
        push(body_orientation_line(model, state, name, AngleFormat::Degrees));
    }
    for id in 0..model.nu() {
        if let Some(name) = model.id_to_name(ObjectKind::Actuator, id) {
            push(actuator_line(model, state, name));
        }
    }

    let _ = writeln!(out, "=======================================");
    out
}

pub fn print_all_states(model: &Model, state: &State) {
    print!("{}", all_states_report(model, state));
}

/// Raw state vectors: time, `qpos`, `qvel`, `qacc` and `ctrl`.
pub fn state_vectors_report(state: &State) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Time: {}", state.time());
    for (label, values) in [
        ("qpos", state.qpos()),
        ("qvel", state.qvel()),
        ("qacc", state.qacc()),
        ("ctrl", state.ctrl()),
    ] {
        let _ = write!(out, "{label}: ");
        for value in values {
            let _ = write!(out, "{value}, ");
        }
        let _ = writeln!(out);
    }
    out
}

pub fn print_state_vectors(state: &State) {
    println!("{}", state_vectors_report(state));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ROBOT: &str = r#"
<mujoco model="robot">
  <worldbody>
    <body name="base" pos="0 0 1">
      <freejoint name="root"/>
      <geom type="box" size="0.1 0.1 0.1" mass="1"/>
      <body name="wheel" pos="0.2 0 0">
        <joint name="axle" type="hinge" axis="0 1 0"/>
        <geom type="cylinder" size="0.05 0.02"/>
      </body>
    </body>
  </worldbody>
  <actuator>
    <motor name="drive" joint="axle" ctrlrange="-2 2"/>
  </actuator>
</mujoco>"#;

    fn fixture() -> (Model, State) {
        let model = Model::from_xml_str(ROBOT).unwrap();
        let state = model.make_data().snapshot();
        (model, state)
    }

    #[test]
    fn test_identity_quaternion_has_zero_angles() {
        let e = quat_to_euler([1.0, 0.0, 0.0, 0.0]);
        assert_eq!(e, EulerAngles { roll: 0.0, pitch: 0.0, yaw: 0.0 });
    }

    #[test]
    fn test_gimbal_lock_saturates_pitch() {
        // 90° about Y gives sinp = 1 exactly, and rounding can push it past 1.
        let h = std::f64::consts::FRAC_1_SQRT_2;
        let up = quat_to_euler([h, 0.0, h, 0.0]);
        assert_relative_eq!(up.pitch, FRAC_PI_2);
        assert!(!up.roll.is_nan() && !up.yaw.is_nan());

        let over = quat_to_euler([0.8, 0.0, 0.8, 0.0]);
        assert_eq!(over.pitch, FRAC_PI_2);
        let under = quat_to_euler([0.8, 0.0, -0.8, 0.0]);
        assert_eq!(under.pitch, -FRAC_PI_2);
        assert_relative_eq!(under.to_degrees().pitch, -90.0);
    }

    #[test]
    fn test_yaw_about_z() {
        let half = 0.3f64;
        let e = quat_to_euler([half.cos(), 0.0, 0.0, half.sin()]);
        assert_relative_eq!(e.yaw, 0.6, epsilon = 1e-12);
        assert_relative_eq!(e.roll, 0.0);
        assert_relative_eq!(e.pitch, 0.0);
    }

    #[test]
    fn test_degree_conversion() {
        for r in [0.0, 0.5, -1.25, PI, 10.0] {
            assert_eq!(rad_to_deg(r), r * (180.0 / PI));
            assert_relative_eq!(deg_to_rad(rad_to_deg(r)), r, epsilon = 1e-12);
        }
        assert_relative_eq!(rad_to_deg(PI), 180.0);
    }

    #[test]
    fn test_missing_names_report_errors() {
        let (model, state) = fixture();
        let missing = LookupError::NotFound {
            kind: ObjectKind::Joint,
            name: "nope".into(),
        };
        assert_eq!(joint_type_by_name(&model, "nope"), Err(missing.clone()));
        assert_eq!(joint_state_line(&model, &state, "nope"), Err(missing.clone()));
        assert_eq!(hinge_state_line(&model, &state, "nope"), Err(missing));
        assert!(body_state_line(&model, &state, "nope").is_err());
        assert!(body_inertia_line(&model, "nope").is_err());
        assert!(body_orientation_line(&model, &state, "nope", AngleFormat::Degrees).is_err());
        assert!(actuator_line(&model, &state, "nope").is_err());
        assert!(actuator_range_line(&model, "nope").is_err());
        assert_eq!(
            LookupError::NotFound { kind: ObjectKind::Body, name: "x".into() }.to_string(),
            "body not found: x"
        );

        // The printing forms swallow the error.
        print_joint_state(&model, &state, "nope");
        print_body_state(&model, &state, "nope");
        print_actuator(&model, &state, "nope");
    }

    #[test]
    fn test_hinge_check() {
        let (model, state) = fixture();
        assert_eq!(
            hinge_state_line(&model, &state, "root"),
            Err(LookupError::NotHinge("root".into()))
        );
        let line = hinge_state_line(&model, &state, "axle").unwrap();
        assert!(line.starts_with("[Hinge Joint] axle | Angle (deg): "));
    }

    #[test]
    fn test_lines_for_known_names() {
        let (model, state) = fixture();
        assert_eq!(joint_type_by_name(&model, "root"), Ok("Free (6DOF)"));
        assert_eq!(joint_type_by_name(&model, "axle"), Ok("Hinge (Revolute)"));

        let joint = joint_state_line(&model, &state, "root").unwrap();
        assert!(joint.starts_with("[Joint] root | qpos: 0, 0, 1, 1, 0, 0, 0, qvel: "));

        let [x, y, z] = state.xpos(model.name_to_id(ObjectKind::Body, "wheel").unwrap());
        assert_relative_eq!(x, 0.2, epsilon = 1e-6);
        assert_eq!(
            body_state_line(&model, &state, "wheel").unwrap(),
            format!("[Body] wheel | Position: ({x}, {y}, {z})")
        );
        assert!(body_inertia_line(&model, "base").unwrap().contains("Mass: 1"));
        assert_eq!(
            actuator_range_line(&model, "drive").unwrap(),
            "[Actuator Range] drive | Control Range: (-2, 2)"
        );
        assert_eq!(
            actuator_line(&model, &state, "drive").unwrap(),
            "[Actuator] drive | Control Input: 0"
        );
    }

    #[test]
    fn test_all_states_report_covers_every_named_object() {
        let (model, state) = fixture();
        let report = all_states_report(&model, &state);
        assert!(report.contains("[Time] Simulation Time: 0 s"));
        assert!(report.contains("[Joint] root"));
        assert!(report.contains("[Hinge Joint] axle"));
        assert!(report.contains("[Body] base"));
        assert!(report.contains("[Body Orientation (deg)] wheel"));
        assert!(report.contains("[Actuator] drive"));
        assert!(!report.contains("[Body] world"));
    }

    #[test]
    fn test_state_vectors_report() {
        let (_, state) = fixture();
        let report = state_vectors_report(&state);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[0], "Time: 0");
        assert!(lines[1].starts_with("qpos: 0, 0, 1, 1, 0, 0, 0, "));
        assert_eq!(lines[4], "ctrl: 0, ");
    }
}
