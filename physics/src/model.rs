//! Compiled, immutable model description.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use nalgebra::{Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3};
use rapier3d::dynamics::MassProperties;

use crate::colliders::geom_mass_properties;
use crate::data::Data;
use crate::error::ModelError;
use crate::mjcf::{
    self, parse_array, parse_limited, parse_pose, parse_range, parse_real, ActuatorAttrs,
    ActuatorXml, AngleUnit, BodyXml, GeomXml, JointXml, MjcfDocument,
};

/// Default integration step in seconds.
pub const DEFAULT_TIMESTEP: f64 = 0.002;

/// Default geom density in kg/m³.
pub const DEFAULT_DENSITY: f64 = 1000.0;

/// Name given to body 0.
pub const WORLD_BODY_NAME: &str = "world";

/// Object categories addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Body,
    Joint,
    Geom,
    Actuator,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Body => "body",
            ObjectKind::Joint => "joint",
            ObjectKind::Geom => "geom",
            ObjectKind::Actuator => "actuator",
        }
    }
}

/// Per-category name tables.
#[derive(Debug, Clone, Default)]
struct NameTable {
    bodies: HashMap<String, usize>,
    joints: HashMap<String, usize>,
    geoms: HashMap<String, usize>,
    actuators: HashMap<String, usize>,
}

impl NameTable {
    fn of(&self, kind: ObjectKind) -> &HashMap<String, usize> {
        match kind {
            ObjectKind::Body => &self.bodies,
            ObjectKind::Joint => &self.joints,
            ObjectKind::Geom => &self.geoms,
            ObjectKind::Actuator => &self.actuators,
        }
    }

    fn of_mut(&mut self, kind: ObjectKind) -> &mut HashMap<String, usize> {
        match kind {
            ObjectKind::Body => &mut self.bodies,
            ObjectKind::Joint => &mut self.joints,
            ObjectKind::Geom => &mut self.geoms,
            ObjectKind::Actuator => &mut self.actuators,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Joint kinds and their generalized-coordinate footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointType {
    /// 6 DOF: 3 translations and a quaternion.
    Free,
    /// 3 rotational DOF stored as a quaternion.
    Ball,
    /// 1 translational DOF along the axis.
    Slide,
    /// 1 rotational DOF about the axis.
    Hinge,
}

impl JointType {
    /// Number of position coordinates.
    pub fn nq(self) -> usize {
        match self {
            JointType::Free => 7,
            JointType::Ball => 4,
            JointType::Slide | JointType::Hinge => 1,
        }
    }

    /// Number of velocity coordinates.
    pub fn nv(self) -> usize {
        match self {
            JointType::Free => 6,
            JointType::Ball => 3,
            JointType::Slide | JointType::Hinge => 1,
        }
    }

    fn parse(value: Option<&str>) -> Result<Self, ModelError> {
        match value.unwrap_or("hinge") {
            "hinge" => Ok(JointType::Hinge),
            "slide" => Ok(JointType::Slide),
            "ball" => Ok(JointType::Ball),
            "free" => Ok(JointType::Free),
            other => Err(ModelError::Unsupported {
                element: "joint",
                kind: other.to_string(),
            }),
        }
    }
}

/// Geometric primitive kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeomType {
    Plane,
    Sphere,
    Capsule,
    Cylinder,
    Box,
}

impl GeomType {
    fn parse(value: Option<&str>) -> Result<Self, ModelError> {
        match value.unwrap_or("sphere") {
            "plane" => Ok(GeomType::Plane),
            "sphere" => Ok(GeomType::Sphere),
            "capsule" => Ok(GeomType::Capsule),
            "cylinder" => Ok(GeomType::Cylinder),
            "box" => Ok(GeomType::Box),
            other => Err(ModelError::Unsupported {
                element: "geom",
                kind: other.to_string(),
            }),
        }
    }
}

/// Physics options from `<option>`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Options {
    /// Integration step in seconds.
    pub timestep: f64,
    /// Gravitational acceleration in world coordinates.
    pub gravity: [f64; 3],
}

impl Default for Options {
    fn default() -> Self {
        Self {
            timestep: DEFAULT_TIMESTEP,
            gravity: [0.0, 0.0, -9.81],
        }
    }
}

/// A body in the kinematic tree. Body 0 is the world.
#[derive(Debug, Clone)]
pub struct Body {
    pub name: Option<String>,
    pub parent: Option<usize>,
    /// Position relative to the parent frame.
    pub pos: Vector3<f64>,
    /// Orientation relative to the parent frame.
    pub quat: UnitQuaternion<f64>,
    pub joint: Option<usize>,
    pub geoms: Vec<usize>,
    /// Mass of this body's own geoms.
    pub mass: f64,
    /// Principal moments of inertia of this body's own geoms.
    pub inertia: [f64; 3],
    /// Body that owns the rigid body this one is welded into.
    pub group: usize,
    pub(crate) mass_properties: Option<MassProperties>,
}

impl Body {
    /// Pose relative to the parent frame.
    pub fn local_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.pos), self.quat)
    }

    /// Center of mass in the body frame.
    pub fn local_com(&self) -> Point3<f64> {
        self.mass_properties
            .map(|mp| mp.local_com.cast::<f64>())
            .unwrap_or_else(Point3::origin)
    }
}

/// A joint connecting a body to its parent.
#[derive(Debug, Clone)]
pub struct Joint {
    pub name: Option<String>,
    pub kind: JointType,
    pub body: usize,
    /// Anchor in the body frame.
    pub pos: Vector3<f64>,
    /// Axis in the body frame (hinge and slide).
    pub axis: Unit<Vector3<f64>>,
    /// Limits in radians (hinge) or meters (slide).
    pub range: Option<(f64, f64)>,
    pub damping: f64,
    /// First index of this joint in `qpos`.
    pub qposadr: usize,
    /// First index of this joint in `qvel`.
    pub dofadr: usize,
}

/// A collision/visual primitive attached to a body.
#[derive(Debug, Clone)]
pub struct Geom {
    pub name: Option<String>,
    pub kind: GeomType,
    pub body: usize,
    /// Type-dependent sizes: radius, half-length or half-extents.
    pub size: [f64; 3],
    /// Position in the body frame.
    pub pos: Vector3<f64>,
    /// Orientation in the body frame.
    pub quat: UnitQuaternion<f64>,
    pub rgba: [f32; 4],
    pub friction: f64,
    /// Mass override; density is used when absent.
    pub mass: Option<f64>,
    pub density: f64,
}

impl Geom {
    /// Pose in the body frame.
    pub fn local_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.pos), self.quat)
    }
}

/// How an actuator turns its control into a scalar force.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorKind {
    /// `force = ctrl`
    Motor,
    /// `force = kp * (ctrl - q)`
    Position { kp: f64 },
    /// `force = kv * (ctrl - qdot)`
    Velocity { kv: f64 },
}

/// A control channel acting on one hinge or slide joint.
#[derive(Debug, Clone)]
pub struct Actuator {
    pub name: Option<String>,
    pub kind: ActuatorKind,
    pub joint: usize,
    /// Transmission ratio applied to the scalar force.
    pub gear: f64,
    /// Clamp applied to `ctrl` when present.
    pub ctrlrange: Option<(f64, f64)>,
}

impl Actuator {
    /// Apply the control range, if the actuator is limited.
    pub fn clamp_ctrl(&self, ctrl: f64) -> f64 {
        match self.ctrlrange {
            Some((lo, hi)) => ctrl.clamp(lo, hi),
            None => ctrl,
        }
    }
}

/// Static description of a physical system: bodies, joints, geoms and actuators.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    options: Options,
    bodies: Vec<Body>,
    joints: Vec<Joint>,
    geoms: Vec<Geom>,
    actuators: Vec<Actuator>,
    names: NameTable,
    nq: usize,
    nv: usize,
}

impl Model {
    /// Load a model from an MJCF file.
    pub fn from_xml_path(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_xml_str(&xml)
    }

    /// Load a model from an MJCF string.
    pub fn from_xml_str(xml: &str) -> Result<Self, ModelError> {
        let document: MjcfDocument = quick_xml::de::from_str(xml)?;
        Compiler::compile(document)
    }

    /// Create simulation data for this model.
    pub fn make_data(&self) -> Data {
        Data::new(self)
    }

    /// Look up an object's index by name.
    pub fn name_to_id(&self, kind: ObjectKind, name: &str) -> Option<usize> {
        self.names.of(kind).get(name).copied()
    }

    /// Name of an object, if it has one.
    pub fn id_to_name(&self, kind: ObjectKind, id: usize) -> Option<&str> {
        match kind {
            ObjectKind::Body => self.bodies.get(id)?.name.as_deref(),
            ObjectKind::Joint => self.joints.get(id)?.name.as_deref(),
            ObjectKind::Geom => self.geoms.get(id)?.name.as_deref(),
            ObjectKind::Actuator => self.actuators.get(id)?.name.as_deref(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn timestep(&self) -> f64 {
        self.options.timestep
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn geoms(&self) -> &[Geom] {
        &self.geoms
    }

    pub fn actuators(&self) -> &[Actuator] {
        &self.actuators
    }

    /// Number of position coordinates.
    pub fn nq(&self) -> usize {
        self.nq
    }

    /// Number of velocity coordinates.
    pub fn nv(&self) -> usize {
        self.nv
    }

    /// Number of actuators.
    pub fn nu(&self) -> usize {
        self.actuators.len()
    }

    pub fn nbody(&self) -> usize {
        self.bodies.len()
    }

    /// Pose of every body in world coordinates at the reference configuration.
    pub fn reference_poses(&self) -> Vec<Isometry3<f64>> {
        let mut poses: Vec<Isometry3<f64>> = Vec::with_capacity(self.bodies.len());
        for body in &self.bodies {
            let pose = match body.parent {
                Some(parent) => poses[parent] * body.local_isometry(),
                None => Isometry3::identity(),
            };
            poses.push(pose);
        }
        poses
    }
}

/// Builds a [`Model`] from the raw document.
struct Compiler {
    angle: AngleUnit,
    model: Model,
}

impl Compiler {
    fn compile(document: MjcfDocument) -> Result<Model, ModelError> {
        let angle = AngleUnit::from_compiler(document.compiler.as_ref())?;
        let options = match &document.option {
            Some(option) => {
                let defaults = Options::default();
                let timestep =
                    parse_real("option", "timestep", option.timestep.as_deref(), defaults.timestep)?;
                if !timestep.is_finite() || timestep <= 0.0 {
                    return Err(ModelError::InvalidAttribute {
                        element: "option",
                        attribute: "timestep",
                        value: timestep.to_string(),
                    });
                }
                let gravity: [f64; 3] = parse_array(
                    "option",
                    "gravity",
                    option.gravity.as_deref(),
                    defaults.gravity,
                )?;
                if gravity.iter().any(|g| !g.is_finite()) {
                    return Err(ModelError::InvalidAttribute {
                        element: "option",
                        attribute: "gravity",
                        value: option.gravity.clone().unwrap_or_default(),
                    });
                }
                Options { timestep, gravity }
            }
            None => Options::default(),
        };

        let mut compiler = Compiler {
            angle,
            model: Model {
                name: document.model.unwrap_or_else(|| "model".to_string()),
                options,
                bodies: Vec::new(),
                joints: Vec::new(),
                geoms: Vec::new(),
                actuators: Vec::new(),
                names: NameTable::default(),
                nq: 0,
                nv: 0,
            },
        };

        compiler.push_body(Body {
            name: Some(WORLD_BODY_NAME.to_string()),
            parent: None,
            pos: Vector3::zeros(),
            quat: UnitQuaternion::identity(),
            joint: None,
            geoms: Vec::new(),
            mass: 0.0,
            inertia: [0.0; 3],
            group: 0,
            mass_properties: None,
        })?;

        let worldbody = document.worldbody.unwrap_or_default();
        for geom in &worldbody.geoms {
            compiler.add_geom(geom, 0)?;
        }
        for body in &worldbody.bodies {
            compiler.add_body(body, 0)?;
        }

        for item in document.actuator.map(|a| a.items).unwrap_or_default() {
            compiler.add_actuator(item)?;
        }

        compiler.finish()
    }

    fn register(&mut self, kind: ObjectKind, name: Option<&str>, id: usize) -> Result<(), ModelError> {
        let Some(name) = name else {
            return Ok(());
        };
        if self
            .model
            .names
            .of_mut(kind)
            .insert(name.to_string(), id)
            .is_some()
        {
            return Err(ModelError::DuplicateName {
                kind: kind.as_str(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn push_body(&mut self, body: Body) -> Result<usize, ModelError> {
        let id = self.model.bodies.len();
        self.register(ObjectKind::Body, body.name.as_deref(), id)?;
        self.model.bodies.push(body);
        Ok(id)
    }

    fn add_body(&mut self, xml: &BodyXml, parent: usize) -> Result<(), ModelError> {
        let (pos, quat) = parse_pose(
            "body",
            xml.pos.as_deref(),
            xml.quat.as_deref(),
            xml.euler.as_deref(),
            self.angle,
        )?;

        if xml.joints.len() + xml.freejoints.len() > 1 {
            return Err(ModelError::MultipleJoints(
                xml.name.clone().unwrap_or_else(|| format!("#{}", self.model.bodies.len())),
            ));
        }

        let id = self.push_body(Body {
            name: xml.name.clone(),
            parent: Some(parent),
            pos,
            quat,
            joint: None,
            geoms: Vec::new(),
            mass: 0.0,
            inertia: [0.0; 3],
            group: 0,
            mass_properties: None,
        })?;

        let joint = match (xml.joints.first(), xml.freejoints.first()) {
            (Some(joint), _) => Some(self.add_joint(joint, id)?),
            (None, Some(free)) => Some(self.push_joint(Joint {
                name: free.name.clone(),
                kind: JointType::Free,
                body: id,
                pos: Vector3::zeros(),
                axis: Vector3::z_axis(),
                range: None,
                damping: 0.0,
                qposadr: 0,
                dofadr: 0,
            })?),
            (None, None) => None,
        };
        let group = match joint {
            Some(_) => id,
            None => self.model.bodies[parent].group,
        };
        let body = &mut self.model.bodies[id];
        body.joint = joint;
        body.group = group;

        for geom in &xml.geoms {
            self.add_geom(geom, id)?;
        }
        for child in &xml.bodies {
            self.add_body(child, id)?;
        }
        Ok(())
    }

    fn add_joint(&mut self, xml: &JointXml, body: usize) -> Result<usize, ModelError> {
        let kind = JointType::parse(xml.kind.as_deref())?;
        let [px, py, pz] = parse_array("joint", "pos", xml.pos.as_deref(), [0.0; 3])?;
        let [ax, ay, az] = parse_array("joint", "axis", xml.axis.as_deref(), [0.0, 0.0, 1.0])?;
        let axis = Vector3::new(ax, ay, az);
        if axis.norm() == 0.0 {
            return Err(ModelError::InvalidAttribute {
                element: "joint",
                attribute: "axis",
                value: xml.axis.clone().unwrap_or_default(),
            });
        }

        let range = parse_range("joint", "range", xml.range.as_deref())?;
        let limited = parse_limited("joint", "limited", xml.limited.as_deref(), range.is_some())?;
        let range = match (limited, range, kind) {
            (true, Some((lo, hi)), JointType::Hinge) => {
                Some((self.angle.to_radians(lo), self.angle.to_radians(hi)))
            }
            (true, Some(range), JointType::Slide) => Some(range),
            _ => None,
        };

        self.push_joint(Joint {
            name: xml.name.clone(),
            kind,
            body,
            pos: Vector3::new(px, py, pz),
            axis: Unit::new_normalize(axis),
            range,
            damping: parse_real("joint", "damping", xml.damping.as_deref(), 0.0)?,
            qposadr: 0,
            dofadr: 0,
        })
    }

    fn push_joint(&mut self, mut joint: Joint) -> Result<usize, ModelError> {
        let id = self.model.joints.len();
        self.register(ObjectKind::Joint, joint.name.as_deref(), id)?;
        joint.qposadr = self.model.nq;
        joint.dofadr = self.model.nv;
        self.model.nq += joint.kind.nq();
        self.model.nv += joint.kind.nv();
        self.model.joints.push(joint);
        Ok(id)
    }

    fn add_geom(&mut self, xml: &GeomXml, body: usize) -> Result<(), ModelError> {
        let kind = GeomType::parse(xml.kind.as_deref())?;
        let sizes = match xml.size.as_deref() {
            Some(raw) => mjcf::parse_reals("geom", "size", raw)?,
            None => Vec::new(),
        };
        let required = match kind {
            GeomType::Sphere => 1,
            GeomType::Capsule | GeomType::Cylinder => if xml.fromto.is_some() { 1 } else { 2 },
            GeomType::Box => 3,
            GeomType::Plane => 0,
        };
        if sizes.len() < required || sizes.iter().any(|s| *s < 0.0) {
            return Err(ModelError::InvalidAttribute {
                element: "geom",
                attribute: "size",
                value: xml.size.clone().unwrap_or_default(),
            });
        }
        let mut size = [0.0; 3];
        for (slot, value) in size.iter_mut().zip(&sizes) {
            *slot = *value;
        }

        let (pos, quat) = match (&xml.fromto, kind) {
            (Some(fromto), GeomType::Capsule | GeomType::Cylinder) => {
                let [x0, y0, z0, x1, y1, z1] =
                    parse_array("geom", "fromto", Some(fromto), [0.0; 6])?;
                let from = Vector3::new(x0, y0, z0);
                let to = Vector3::new(x1, y1, z1);
                let dir = to - from;
                size[1] = dir.norm() / 2.0;
                let quat = UnitQuaternion::rotation_between(&Vector3::z(), &dir).unwrap_or_else(
                    || UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI),
                );
                ((from + to) / 2.0, quat)
            }
            _ => parse_pose(
                "geom",
                xml.pos.as_deref(),
                xml.quat.as_deref(),
                xml.euler.as_deref(),
                self.angle,
            )?,
        };

        let [r, g, b, a] = parse_array("geom", "rgba", xml.rgba.as_deref(), [0.5, 0.5, 0.5, 1.0])?;
        let friction = match xml.friction.as_deref() {
            Some(raw) => *mjcf::parse_reals("geom", "friction", raw)?
                .first()
                .ok_or_else(|| ModelError::InvalidAttribute {
                    element: "geom",
                    attribute: "friction",
                    value: raw.to_string(),
                })?,
            None => 1.0,
        };
        let mass = match xml.mass.as_deref() {
            Some(raw) => Some(parse_real("geom", "mass", Some(raw), 0.0)?),
            None => None,
        };

        let id = self.model.geoms.len();
        self.register(ObjectKind::Geom, xml.name.as_deref(), id)?;
        self.model.geoms.push(Geom {
            name: xml.name.clone(),
            kind,
            body,
            size,
            pos,
            quat,
            rgba: [r as f32, g as f32, b as f32, a as f32],
            friction,
            mass,
            density: parse_real("geom", "density", xml.density.as_deref(), DEFAULT_DENSITY)?,
        });
        self.model.bodies[body].geoms.push(id);
        Ok(())
    }

    fn add_actuator(&mut self, item: ActuatorXml) -> Result<(), ModelError> {
        let (attrs, kind) = match item {
            ActuatorXml::Motor(attrs) => (attrs, ActuatorKind::Motor),
            ActuatorXml::Position(attrs) => {
                let kp = parse_real("position", "kp", attrs.kp.as_deref(), 1.0)?;
                (attrs, ActuatorKind::Position { kp })
            }
            ActuatorXml::Velocity(attrs) => {
                let kv = parse_real("velocity", "kv", attrs.kv.as_deref(), 1.0)?;
                (attrs, ActuatorKind::Velocity { kv })
            }
        };
        let ActuatorAttrs {
            name,
            joint,
            gear,
            ctrlrange,
            ctrllimited,
            ..
        } = attrs;

        let label = name
            .clone()
            .unwrap_or_else(|| format!("#{}", self.model.actuators.len()));
        let joint_name = joint.unwrap_or_default();
        let joint_id = self
            .model
            .name_to_id(ObjectKind::Joint, &joint_name)
            .filter(|&id| matches!(self.model.joints[id].kind, JointType::Hinge | JointType::Slide))
            .ok_or_else(|| ModelError::ActuatorTarget {
                actuator: label,
                joint: joint_name,
            })?;

        let gear = match gear.as_deref() {
            Some(raw) => mjcf::parse_reals("actuator", "gear", raw)?
                .first()
                .copied()
                .unwrap_or(1.0),
            None => 1.0,
        };
        let range = parse_range("actuator", "ctrlrange", ctrlrange.as_deref())?;
        let limited = parse_limited(
            "actuator",
            "ctrllimited",
            ctrllimited.as_deref(),
            range.is_some(),
        )?;

        let id = self.model.actuators.len();
        self.register(ObjectKind::Actuator, name.as_deref(), id)?;
        self.model.actuators.push(Actuator {
            name,
            kind,
            joint: joint_id,
            gear,
            ctrlrange: if limited { range } else { None },
        });
        Ok(())
    }

    fn finish(mut self) -> Result<Model, ModelError> {
        for body in 1..self.model.bodies.len() {
            let mut total: Option<MassProperties> = None;
            for &geom in &self.model.bodies[body].geoms {
                let Some(mprops) = geom_mass_properties(&self.model.geoms[geom]) else {
                    continue;
                };
                total = Some(match total {
                    Some(acc) => acc + mprops,
                    None => mprops,
                });
            }
            let entry = &mut self.model.bodies[body];
            if let Some(mprops) = total {
                let inertia = mprops.principal_inertia();
                entry.mass = mprops.mass() as f64;
                entry.inertia = [inertia.x as f64, inertia.y as f64, inertia.z as f64];
            }
            entry.mass_properties = total;
        }

        // Every rigid body that can move needs mass, and planes must stay static.
        for (id, body) in self.model.bodies.iter().enumerate() {
            if body.joint.is_some() {
                let group_mass: f64 = self
                    .model
                    .bodies
                    .iter()
                    .filter(|b| b.group == id)
                    .map(|b| b.mass)
                    .sum();
                if group_mass <= 0.0 {
                    return Err(ModelError::MasslessBody(
                        body.name.clone().unwrap_or_else(|| format!("#{id}")),
                    ));
                }
            }
        }
        for (id, geom) in self.model.geoms.iter().enumerate() {
            if geom.kind == GeomType::Plane && self.model.bodies[geom.body].group != 0 {
                return Err(ModelError::MovingPlane(
                    geom.name.clone().unwrap_or_else(|| format!("#{id}")),
                ));
            }
        }

        Ok(self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ROBOT: &str = r#"
<mujoco model="robot">
  <option timestep="0.005"/>
  <worldbody>
    <light pos="0 0 3"/>
    <geom name="floor" type="plane" size="5 5 0.1"/>
    <body name="base" pos="0 0 0.5">
      <freejoint name="root"/>
      <geom name="chassis" type="box" size="0.2 0.1 0.05" mass="2"/>
      <body name="arm" pos="0.2 0 0">
        <joint name="shoulder" type="hinge" axis="0 1 0" range="-90 90" damping="0.1"/>
        <geom type="capsule" fromto="0 0 0 0.3 0 0" size="0.02"/>
        <body name="tool" pos="0.3 0 0">
          <geom type="sphere" size="0.03"/>
        </body>
      </body>
      <body name="slider" pos="0 0 0.1">
        <joint name="lift" type="slide" axis="0 0 1"/>
        <geom type="cylinder" size="0.02 0.05"/>
      </body>
    </body>
  </worldbody>
  <actuator>
    <motor name="shoulder_motor" joint="shoulder" gear="2" ctrlrange="-1 1"/>
    <velocity name="lift_vel" joint="lift" kv="5"/>
  </actuator>
</mujoco>
"#;

    #[test]
    fn test_counts_and_addresses() {
        let model = Model::from_xml_str(ROBOT).unwrap();
        assert_eq!(model.name(), "robot");
        assert_eq!(model.nbody(), 5);
        assert_eq!(model.joints().len(), 3);
        assert_eq!(model.nq(), 7 + 1 + 1);
        assert_eq!(model.nv(), 6 + 1 + 1);
        assert_eq!(model.nu(), 2);
        assert_relative_eq!(model.timestep(), 0.005);

        let shoulder = model.name_to_id(ObjectKind::Joint, "shoulder").unwrap();
        assert_eq!(model.joints()[shoulder].qposadr, 7);
        assert_eq!(model.joints()[shoulder].dofadr, 6);
        assert_eq!(model.joints()[shoulder].kind, JointType::Hinge);
        let (lo, hi) = model.joints()[shoulder].range.unwrap();
        assert_relative_eq!(lo, -std::f64::consts::FRAC_PI_2);
        assert_relative_eq!(hi, std::f64::consts::FRAC_PI_2);
    }

    #[test]
    fn test_name_lookup() {
        let model = Model::from_xml_str(ROBOT).unwrap();
        assert_eq!(model.name_to_id(ObjectKind::Body, "world"), Some(0));
        assert_eq!(model.name_to_id(ObjectKind::Body, "base"), Some(1));
        assert_eq!(model.name_to_id(ObjectKind::Actuator, "lift_vel"), Some(1));
        assert_eq!(model.name_to_id(ObjectKind::Body, "missing"), None);
        // Categories are separate namespaces.
        assert_eq!(model.name_to_id(ObjectKind::Joint, "base"), None);
        assert_eq!(model.id_to_name(ObjectKind::Geom, 0), Some("floor"));

        let shared = Model::from_xml_str(
            r#"<mujoco><worldbody>
                <body name="wheel"><joint name="wheel" type="hinge"/><geom name="wheel" size="0.1"/></body>
            </worldbody></mujoco>"#,
        )
        .unwrap();
        assert_eq!(shared.name_to_id(ObjectKind::Body, "wheel"), Some(1));
        assert_eq!(shared.name_to_id(ObjectKind::Joint, "wheel"), Some(0));
        assert_eq!(shared.name_to_id(ObjectKind::Geom, "wheel"), Some(0));
    }

    #[test]
    fn test_welded_bodies_share_group() {
        let model = Model::from_xml_str(ROBOT).unwrap();
        let arm = model.name_to_id(ObjectKind::Body, "arm").unwrap();
        let tool = model.name_to_id(ObjectKind::Body, "tool").unwrap();
        assert_eq!(model.bodies()[tool].group, arm);
        assert_eq!(model.bodies()[arm].group, arm);
        assert_eq!(model.bodies()[0].group, 0);
    }

    #[test]
    fn test_mass_override_and_density() {
        let model = Model::from_xml_str(ROBOT).unwrap();
        let base = &model.bodies()[1];
        assert_relative_eq!(base.mass, 2.0, epsilon = 1e-5);

        let tool = &model.bodies()[model.name_to_id(ObjectKind::Body, "tool").unwrap()];
        let expected = DEFAULT_DENSITY * 4.0 / 3.0 * std::f64::consts::PI * 0.03f64.powi(3);
        assert_relative_eq!(tool.mass, expected, max_relative = 1e-4);
    }

    #[test]
    fn test_actuator_settings() {
        let model = Model::from_xml_str(ROBOT).unwrap();
        let motor = &model.actuators()[0];
        assert_eq!(motor.kind, ActuatorKind::Motor);
        assert_relative_eq!(motor.gear, 2.0);
        assert_eq!(motor.ctrlrange, Some((-1.0, 1.0)));
        assert_relative_eq!(motor.clamp_ctrl(3.0), 1.0);

        let vel = &model.actuators()[1];
        assert_eq!(vel.kind, ActuatorKind::Velocity { kv: 5.0 });
        assert_eq!(vel.ctrlrange, None);
        assert_relative_eq!(vel.clamp_ctrl(3.0), 3.0);
    }

    #[test]
    fn test_defaults_without_option() {
        let model = Model::from_xml_str("<mujoco><worldbody/></mujoco>").unwrap();
        assert_eq!(*model.options(), Options::default());
        assert_eq!(model.nbody(), 1);
        assert_eq!(model.name(), "model");
    }

    #[test]
    fn test_rejects_bad_models() {
        for timestep in ["0", "-0.01", "nan", "inf", "-inf"] {
            let xml = format!(
                r#"<mujoco><option timestep="{timestep}"/></mujoco>"#
            );
            assert!(
                matches!(
                    Model::from_xml_str(&xml),
                    Err(ModelError::InvalidAttribute { attribute: "timestep", .. })
                ),
                "timestep {timestep}"
            );
        }
        assert!(matches!(
            Model::from_xml_str(r#"<mujoco><option gravity="0 0 nan"/></mujoco>"#),
            Err(ModelError::InvalidAttribute { attribute: "gravity", .. })
        ));

        let duplicate = r#"<mujoco><worldbody>
            <body name="a"><freejoint/><geom size="0.1"/></body>
            <body name="a"><freejoint/><geom size="0.1"/></body>
        </worldbody></mujoco>"#;
        assert!(matches!(
            Model::from_xml_str(duplicate),
            Err(ModelError::DuplicateName { .. })
        ));

        let massless = r#"<mujoco><worldbody>
            <body name="ghost"><joint type="hinge"/></body>
        </worldbody></mujoco>"#;
        assert!(matches!(
            Model::from_xml_str(massless),
            Err(ModelError::MasslessBody(name)) if name == "ghost"
        ));

        let two_joints = r#"<mujoco><worldbody>
            <body name="b"><joint type="hinge"/><joint type="slide"/><geom size="0.1"/></body>
        </worldbody></mujoco>"#;
        assert!(matches!(
            Model::from_xml_str(two_joints),
            Err(ModelError::MultipleJoints(_))
        ));

        let moving_plane = r#"<mujoco><worldbody>
            <body name="b"><freejoint/><geom size="0.1"/><geom name="p" type="plane" size="1 1 1"/></body>
        </worldbody></mujoco>"#;
        assert!(matches!(
            Model::from_xml_str(moving_plane),
            Err(ModelError::MovingPlane(_))
        ));

        let bad_target = r#"<mujoco><worldbody>
            <body name="b"><freejoint name="f"/><geom size="0.1"/></body>
        </worldbody><actuator><motor joint="f"/></actuator></mujoco>"#;
        assert!(matches!(
            Model::from_xml_str(bad_target),
            Err(ModelError::ActuatorTarget { .. })
        ));

        assert!(matches!(
            Model::from_xml_str("<mujoco><worldbody><geom type=\"ellipsoid\" size=\"1 1 1\"/></worldbody></mujoco>"),
            Err(ModelError::Unsupported { .. })
        ));
        assert!(matches!(Model::from_xml_str("<mujoco><worldbody>"), Err(ModelError::Xml(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = Model::from_xml_path("does/not/exist.xml").unwrap_err();
        assert!(matches!(err, ModelError::Io { .. }));
        assert!(err.to_string().contains("does/not/exist.xml"));
    }

    #[test]
    fn test_reference_poses_compose() {
        let model = Model::from_xml_str(ROBOT).unwrap();
        let poses = model.reference_poses();
        let tool = model.name_to_id(ObjectKind::Body, "tool").unwrap();
        assert_relative_eq!(poses[tool].translation.vector, Vector3::new(0.5, 0.0, 0.5), epsilon = 1e-12);
    }
}
