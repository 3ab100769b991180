//! Raw document layout for the MJCF subset understood by the loader.
//!
//! These types mirror the XML one-to-one and keep every attribute as text;
//! [`crate::model`] turns them into a compiled [`crate::Model`] and reports
//! malformed values with the element and attribute they came from.

use nalgebra::{UnitQuaternion, Vector3};
use serde::Deserialize;

use crate::error::ModelError;

/// `<mujoco>` root element.
#[derive(Debug, Deserialize)]
pub(crate) struct MjcfDocument {
    #[serde(rename = "@model", default)]
    pub model: Option<String>,
    #[serde(default)]
    pub compiler: Option<CompilerXml>,
    #[serde(default)]
    pub option: Option<OptionXml>,
    #[serde(default)]
    pub worldbody: Option<WorldBodyXml>,
    #[serde(default)]
    pub actuator: Option<ActuatorSectionXml>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompilerXml {
    #[serde(rename = "@angle", default)]
    pub angle: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OptionXml {
    #[serde(rename = "@timestep", default)]
    pub timestep: Option<String>,
    #[serde(rename = "@gravity", default)]
    pub gravity: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WorldBodyXml {
    #[serde(rename = "geom", default)]
    pub geoms: Vec<GeomXml>,
    #[serde(rename = "body", default)]
    pub bodies: Vec<BodyXml>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BodyXml {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@pos", default)]
    pub pos: Option<String>,
    #[serde(rename = "@quat", default)]
    pub quat: Option<String>,
    #[serde(rename = "@euler", default)]
    pub euler: Option<String>,
    #[serde(rename = "joint", default)]
    pub joints: Vec<JointXml>,
    #[serde(rename = "freejoint", default)]
    pub freejoints: Vec<FreeJointXml>,
    #[serde(rename = "geom", default)]
    pub geoms: Vec<GeomXml>,
    #[serde(rename = "body", default)]
    pub bodies: Vec<BodyXml>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JointXml {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@type", default)]
    pub kind: Option<String>,
    #[serde(rename = "@pos", default)]
    pub pos: Option<String>,
    #[serde(rename = "@axis", default)]
    pub axis: Option<String>,
    #[serde(rename = "@range", default)]
    pub range: Option<String>,
    #[serde(rename = "@limited", default)]
    pub limited: Option<String>,
    #[serde(rename = "@damping", default)]
    pub damping: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FreeJointXml {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeomXml {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@type", default)]
    pub kind: Option<String>,
    #[serde(rename = "@size", default)]
    pub size: Option<String>,
    #[serde(rename = "@fromto", default)]
    pub fromto: Option<String>,
    #[serde(rename = "@pos", default)]
    pub pos: Option<String>,
    #[serde(rename = "@quat", default)]
    pub quat: Option<String>,
    #[serde(rename = "@euler", default)]
    pub euler: Option<String>,
    #[serde(rename = "@rgba", default)]
    pub rgba: Option<String>,
    #[serde(rename = "@mass", default)]
    pub mass: Option<String>,
    #[serde(rename = "@density", default)]
    pub density: Option<String>,
    #[serde(rename = "@friction", default)]
    pub friction: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ActuatorSectionXml {
    #[serde(rename = "$value", default)]
    pub items: Vec<ActuatorXml>,
}

/// Actuator elements, kept in document order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ActuatorXml {
    Motor(ActuatorAttrs),
    Position(ActuatorAttrs),
    Velocity(ActuatorAttrs),
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActuatorAttrs {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@joint", default)]
    pub joint: Option<String>,
    #[serde(rename = "@gear", default)]
    pub gear: Option<String>,
    #[serde(rename = "@ctrlrange", default)]
    pub ctrlrange: Option<String>,
    #[serde(rename = "@ctrllimited", default)]
    pub ctrllimited: Option<String>,
    #[serde(rename = "@kp", default)]
    pub kp: Option<String>,
    #[serde(rename = "@kv", default)]
    pub kv: Option<String>,
}

/// Unit used for `euler` and hinge `range` attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AngleUnit {
    Degree,
    Radian,
}

impl AngleUnit {
    pub fn from_compiler(compiler: Option<&CompilerXml>) -> Result<Self, ModelError> {
        match compiler.and_then(|c| c.angle.as_deref()) {
            None | Some("degree") => Ok(AngleUnit::Degree),
            Some("radian") => Ok(AngleUnit::Radian),
            Some(other) => Err(ModelError::InvalidAttribute {
                element: "compiler",
                attribute: "angle",
                value: other.to_string(),
            }),
        }
    }

    pub fn to_radians(self, value: f64) -> f64 {
        match self {
            AngleUnit::Degree => value.to_radians(),
            AngleUnit::Radian => value,
        }
    }
}

/// Parse a whitespace separated list of reals.
pub(crate) fn parse_reals(
    element: &'static str,
    attribute: &'static str,
    value: &str,
) -> Result<Vec<f64>, ModelError> {
    value
        .split_whitespace()
        .map(|token| token.parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ModelError::InvalidAttribute {
            element,
            attribute,
            value: value.to_string(),
        })
}

/// Parse exactly `N` reals, falling back to `default` when the attribute is absent.
pub(crate) fn parse_array<const N: usize>(
    element: &'static str,
    attribute: &'static str,
    value: Option<&str>,
    default: [f64; N],
) -> Result<[f64; N], ModelError> {
    let Some(value) = value else {
        return Ok(default);
    };
    let reals = parse_reals(element, attribute, value)?;
    reals.try_into().map_err(|_| ModelError::InvalidAttribute {
        element,
        attribute,
        value: value.to_string(),
    })
}

/// Parse a single real.
pub(crate) fn parse_real(
    element: &'static str,
    attribute: &'static str,
    value: Option<&str>,
    default: f64,
) -> Result<f64, ModelError> {
    parse_array::<1>(element, attribute, value, [default]).map(|[v]| v)
}

/// Parse `"lo hi"` into an ordered pair.
pub(crate) fn parse_range(
    element: &'static str,
    attribute: &'static str,
    value: Option<&str>,
) -> Result<Option<(f64, f64)>, ModelError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let [lo, hi] = parse_array::<2>(element, attribute, Some(raw), [0.0, 0.0])?;
    if lo > hi {
        return Err(ModelError::InvalidAttribute {
            element,
            attribute,
            value: raw.to_string(),
        });
    }
    Ok(Some((lo, hi)))
}

/// Resolve a `limited` style flag: `true`, `false`, or `auto` (limited when a range exists).
pub(crate) fn parse_limited(
    element: &'static str,
    attribute: &'static str,
    value: Option<&str>,
    has_range: bool,
) -> Result<bool, ModelError> {
    match value {
        None | Some("auto") => Ok(has_range),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(ModelError::InvalidAttribute {
            element,
            attribute,
            value: other.to_string(),
        }),
    }
}

/// Local frame given by `pos` plus one of `quat` (w x y z) or `euler` (intrinsic x-y-z).
pub(crate) fn parse_pose(
    element: &'static str,
    pos: Option<&str>,
    quat: Option<&str>,
    euler: Option<&str>,
    angle: AngleUnit,
) -> Result<(Vector3<f64>, UnitQuaternion<f64>), ModelError> {
    let [x, y, z] = parse_array(element, "pos", pos, [0.0; 3])?;
    let rotation = match (quat, euler) {
        (Some(q), _) => {
            let [w, i, j, k] = parse_array(element, "quat", Some(q), [1.0, 0.0, 0.0, 0.0])?;
            let raw = nalgebra::Quaternion::new(w, i, j, k);
            if raw.norm() == 0.0 {
                return Err(ModelError::InvalidAttribute {
                    element,
                    attribute: "quat",
                    value: q.to_string(),
                });
            }
            UnitQuaternion::from_quaternion(raw)
        }
        (None, Some(e)) => {
            let [a, b, c] = parse_array(element, "euler", Some(e), [0.0; 3])?;
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angle.to_radians(a))
                * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle.to_radians(b))
                * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle.to_radians(c))
        }
        (None, None) => UnitQuaternion::identity(),
    };
    Ok((Vector3::new(x, y, z), rotation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_array_defaults_and_errors() {
        assert_eq!(parse_array("geom", "pos", None, [1.0, 2.0, 3.0]).unwrap(), [1.0, 2.0, 3.0]);
        assert_eq!(parse_array("geom", "pos", Some(" 4 5  6 "), [0.0; 3]).unwrap(), [4.0, 5.0, 6.0]);
        assert!(parse_array::<3>("geom", "pos", Some("1 2"), [0.0; 3]).is_err());
        assert!(parse_array::<3>("geom", "pos", Some("1 two 3"), [0.0; 3]).is_err());
    }

    #[test]
    fn test_parse_range_rejects_inverted() {
        assert_eq!(parse_range("joint", "range", Some("-1 1")).unwrap(), Some((-1.0, 1.0)));
        assert_eq!(parse_range("joint", "range", None).unwrap(), None);
        assert!(parse_range("joint", "range", Some("2 1")).is_err());
    }

    #[test]
    fn test_parse_limited_auto() {
        assert!(parse_limited("joint", "limited", None, true).unwrap());
        assert!(!parse_limited("joint", "limited", Some("auto"), false).unwrap());
        assert!(!parse_limited("joint", "limited", Some("false"), true).unwrap());
        assert!(parse_limited("joint", "limited", Some("yes"), true).is_err());
    }

    #[test]
    fn test_euler_degrees_matches_axis_angle() {
        let (_, q) = parse_pose("body", None, None, Some("0 0 90"), AngleUnit::Degree).unwrap();
        let rotated = q * Vector3::x();
        assert_relative_eq!(rotated, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_quat_is_normalized() {
        let (_, q) = parse_pose("body", Some("1 2 3"), Some("2 0 0 0"), None, AngleUnit::Degree).unwrap();
        assert_relative_eq!(q.angle(), 0.0);
        assert!(parse_pose("body", None, Some("0 0 0 0"), None, AngleUnit::Degree).is_err());
    }
}
