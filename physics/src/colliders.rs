//! Geom to collider and mass conversion.

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use rapier3d::dynamics::MassProperties;
use rapier3d::geometry::{Collider, ColliderBuilder};

use crate::model::{Geom, GeomType};

/// Rapier cylinders run along +Y; model cylinders run along +Z.
fn y_to_z() -> UnitQuaternion<f32> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f32::consts::FRAC_PI_2)
}

/// Geom pose in its body frame, in engine precision.
pub(crate) fn geom_isometry(geom: &Geom) -> Isometry3<f32> {
    geom.local_isometry().cast::<f32>()
}

/// Mass properties of a geom at the given density, expressed in the geom frame.
fn shape_mass_properties(geom: &Geom, density: f32) -> Option<MassProperties> {
    let [a, b, c] = geom.size.map(|s| s as f32);
    match geom.kind {
        GeomType::Plane => None,
        GeomType::Sphere => Some(MassProperties::from_ball(density, a)),
        GeomType::Box => Some(MassProperties::from_cuboid(density, Vector3::new(a, b, c))),
        GeomType::Capsule => Some(MassProperties::from_capsule(
            density,
            Point3::new(0.0, 0.0, -b),
            Point3::new(0.0, 0.0, b),
            a,
        )),
        GeomType::Cylinder => Some(
            MassProperties::from_cylinder(density, b, a)
                .transform_by(&Isometry3::from_parts(Translation3::identity(), y_to_z())),
        ),
    }
}

/// Mass properties of a geom, expressed in its body frame.
///
/// An explicit `mass` wins over `density`.
pub(crate) fn geom_mass_properties(geom: &Geom) -> Option<MassProperties> {
    let density = match geom.mass {
        Some(mass) => {
            let unit = shape_mass_properties(geom, 1.0)?;
            if unit.mass() <= 0.0 {
                return None;
            }
            mass as f32 / unit.mass()
        }
        None => geom.density as f32,
    };
    shape_mass_properties(geom, density).map(|mp| mp.transform_by(&geom_isometry(geom)))
}

/// Build a massless collider for a geom.
///
/// `offset` is the pose of the geom's body inside the rigid body it is attached to.
/// Mass comes from [`geom_mass_properties`] on the rigid body itself, so colliders
/// carry zero density.
pub(crate) fn geom_collider(geom: &Geom, offset: &Isometry3<f32>) -> Collider {
    let [a, b, c] = geom.size.map(|s| s as f32);
    let pose = offset * geom_isometry(geom);
    let builder = match geom.kind {
        GeomType::Plane => ColliderBuilder::halfspace(Vector3::z_axis()).position(pose),
        GeomType::Sphere => ColliderBuilder::ball(a).position(pose),
        GeomType::Box => ColliderBuilder::cuboid(a, b, c).position(pose),
        GeomType::Capsule => ColliderBuilder::capsule_z(b, a).position(pose),
        GeomType::Cylinder => {
            let mut aligned = pose;
            aligned.rotation *= y_to_z();
            ColliderBuilder::cylinder(b, a).position(aligned)
        }
    };
    builder
        .density(0.0)
        .friction(geom.friction as f32)
        .restitution(0.0)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DEFAULT_DENSITY;
    use approx::assert_relative_eq;

    fn geom(kind: GeomType, size: [f64; 3]) -> Geom {
        Geom {
            name: None,
            kind,
            body: 1,
            size,
            pos: nalgebra::Vector3::new(0.0, 0.0, 1.0),
            quat: nalgebra::UnitQuaternion::identity(),
            rgba: [1.0; 4],
            friction: 1.0,
            mass: None,
            density: DEFAULT_DENSITY,
        }
    }

    #[test]
    fn test_box_mass_from_density() {
        let mp = geom_mass_properties(&geom(GeomType::Box, [0.5, 0.5, 0.5])).unwrap();
        assert_relative_eq!(mp.mass(), 1000.0, max_relative = 1e-5);
        // Mass is reported in the body frame, so the center follows the geom offset.
        assert_relative_eq!(mp.local_com.z, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_explicit_mass_overrides_density() {
        let mut g = geom(GeomType::Capsule, [0.1, 0.3, 0.0]);
        g.mass = Some(0.25);
        let mp = geom_mass_properties(&g).unwrap();
        assert_relative_eq!(mp.mass(), 0.25, max_relative = 1e-5);
    }

    #[test]
    fn test_cylinder_axis_is_z() {
        let mp = geom_mass_properties(&geom(GeomType::Cylinder, [0.05, 1.0, 0.0])).unwrap();
        // A long thin rod along Z has its smallest moment about Z.
        let inertia = mp.reconstruct_inertia_matrix();
        assert!(inertia[(2, 2)] < inertia[(0, 0)]);
        assert!(inertia[(2, 2)] < inertia[(1, 1)]);
    }

    #[test]
    fn test_plane_has_no_mass() {
        assert!(geom_mass_properties(&geom(GeomType::Plane, [1.0, 1.0, 0.1])).is_none());
    }
}
