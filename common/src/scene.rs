//! Render snapshot of a simulation state.
//!
//! A [`Scene`] is plain data built from a copied [`State`], so the viewer
//! holds the data lock only for the copy and does the rest unlocked.

use glam::{Mat4, Quat, Vec3};
use physics::{GeomType, Model, ObjectKind, State};

/// Half extent used for planes declared with zero size (infinite in the model).
const INFINITE_PLANE_EXTENT: f32 = 20.0;

/// Unit primitive meshes the renderer knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeshKind {
    /// Unit sphere.
    Sphere,
    /// Cube spanning `[-1, 1]` on every axis.
    Cube,
    /// Cylinder of radius 1 spanning `z ∈ [-1, 1]`.
    Cylinder,
    /// Quad spanning `[-1, 1]` in the XY plane.
    Plane,
}

impl MeshKind {
    pub const ALL: [MeshKind; 4] = [MeshKind::Sphere, MeshKind::Cube, MeshKind::Cylinder, MeshKind::Plane];
}

/// One primitive to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeomInstance {
    pub mesh: MeshKind,
    /// Rigid placement in world coordinates.
    pub transform: Mat4,
    /// Per-axis scale applied to the unit mesh before `transform`.
    pub scale: Vec3,
    pub color: [f32; 4],
}

/// Everything the viewer draws for one frame.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub model_name: String,
    pub time: f64,
    /// Actuator controls as `(name, value)`; unnamed actuators use their index.
    pub controls: Vec<(String, f64)>,
    pub instances: Vec<GeomInstance>,
}

impl Scene {
    /// Build the scene for `state`.
    pub fn from_state(model: &Model, state: &State) -> Self {
        let mut instances = Vec::with_capacity(model.geoms().len());
        for geom in model.geoms() {
            let [px, py, pz] = state.xpos(geom.body);
            let [qw, qx, qy, qz] = state.xquat(geom.body);
            let body = Mat4::from_rotation_translation(
                Quat::from_xyzw(qx as f32, qy as f32, qz as f32, qw as f32),
                Vec3::new(px as f32, py as f32, pz as f32),
            );
            let local = Mat4::from_rotation_translation(
                Quat::from_xyzw(
                    geom.quat.i as f32,
                    geom.quat.j as f32,
                    geom.quat.k as f32,
                    geom.quat.w as f32,
                ),
                Vec3::new(geom.pos.x as f32, geom.pos.y as f32, geom.pos.z as f32),
            );
            let transform = body * local;
            let [a, b, c] = geom.size.map(|s| s as f32);
            let color = geom.rgba;

            match geom.kind {
                GeomType::Sphere => instances.push(GeomInstance {
                    mesh: MeshKind::Sphere,
                    transform,
                    scale: Vec3::splat(a),
                    color,
                }),
                GeomType::Box => instances.push(GeomInstance {
                    mesh: MeshKind::Cube,
                    transform,
                    scale: Vec3::new(a, b, c),
                    color,
                }),
                GeomType::Cylinder => instances.push(GeomInstance {
                    mesh: MeshKind::Cylinder,
                    transform,
                    scale: Vec3::new(a, a, b),
                    color,
                }),
                GeomType::Capsule => {
                    instances.push(GeomInstance {
                        mesh: MeshKind::Cylinder,
                        transform,
                        scale: Vec3::new(a, a, b),
                        color,
                    });
                    for end in [-b, b] {
                        instances.push(GeomInstance {
                            mesh: MeshKind::Sphere,
                            transform: transform * Mat4::from_translation(Vec3::new(0.0, 0.0, end)),
                            scale: Vec3::splat(a),
                            color,
                        });
                    }
                }
                GeomType::Plane => {
                    let half = |s: f32| if s > 0.0 { s } else { INFINITE_PLANE_EXTENT };
                    instances.push(GeomInstance {
                        mesh: MeshKind::Plane,
                        transform,
                        scale: Vec3::new(half(a), half(b), 1.0),
                        color,
                    });
                }
            }
        }

        let controls = (0..model.nu())
            .map(|id| {
                let name = model
                    .id_to_name(ObjectKind::Actuator, id)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("#{id}"));
                (name, state.ctrl()[id])
            })
            .collect();

        Self {
            model_name: model.name().to_string(),
            time: state.time(),
            controls,
            instances,
        }
    }

    /// Bounding sphere `(center, radius)` of everything except planes.
    pub fn extent(&self) -> Option<(Vec3, f32)> {
        let points: Vec<(Vec3, f32)> = self
            .instances
            .iter()
            .filter(|i| i.mesh != MeshKind::Plane)
            .map(|i| (i.transform.w_axis.truncate(), i.scale.max_element()))
            .collect();
        if points.is_empty() {
            return None;
        }
        let (min, max) = points.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), (p, r)| (min.min(*p - Vec3::splat(*r)), max.max(*p + Vec3::splat(*r))),
        );
        let center = (min + max) * 0.5;
        Some((center, (max - min).length() * 0.5))
    }

    /// Instances grouped by mesh, in [`MeshKind::ALL`] order.
    pub fn sorted_instances(&self) -> Vec<GeomInstance> {
        let mut sorted = self.instances.clone();
        sorted.sort_by_key(|i| i.mesh);
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ROBOT: &str = r#"
<mujoco model="scene">
  <worldbody>
    <geom name="floor" type="plane" size="0 0 0.1"/>
    <body name="base" pos="1 2 3">
      <freejoint/>
      <geom type="box" size="0.1 0.2 0.3"/>
      <geom type="capsule" size="0.05 0.2" pos="0 0 0.5"/>
    </body>
  </worldbody>
</mujoco>"#;

    #[test]
    fn test_geoms_become_instances() {
        let model = Model::from_xml_str(ROBOT).unwrap();
        let scene = Scene::from_state(&model, &model.make_data().snapshot());
        assert_eq!(scene.model_name, "scene");
        // plane + box + capsule (cylinder and two caps)
        assert_eq!(scene.instances.len(), 5);

        let plane = &scene.instances[0];
        assert_eq!(plane.mesh, MeshKind::Plane);
        assert_eq!(plane.scale, Vec3::new(INFINITE_PLANE_EXTENT, INFINITE_PLANE_EXTENT, 1.0));

        let cube = &scene.instances[1];
        assert_eq!(cube.mesh, MeshKind::Cube);
        assert_relative_eq!(cube.scale.y, 0.2);
        let origin = cube.transform.w_axis.truncate();
        assert!((origin - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);

        let top_cap = &scene.instances[4];
        assert_eq!(top_cap.mesh, MeshKind::Sphere);
        assert_relative_eq!(top_cap.transform.w_axis.z, 3.7, epsilon = 1e-5);
    }

    #[test]
    fn test_extent_ignores_planes() {
        let model = Model::from_xml_str(ROBOT).unwrap();
        let scene = Scene::from_state(&model, &model.make_data().snapshot());
        let (center, radius) = scene.extent().unwrap();
        assert_relative_eq!(center.x, 1.0, epsilon = 1e-4);
        assert!(radius > 0.3 && radius < 2.0);

        let empty = Scene::default();
        assert!(empty.extent().is_none());
    }

    #[test]
    fn test_sorted_instances_group_meshes() {
        let model = Model::from_xml_str(ROBOT).unwrap();
        let scene = Scene::from_state(&model, &model.make_data().snapshot());
        let kinds: Vec<MeshKind> = scene.sorted_instances().iter().map(|i| i.mesh).collect();
        assert_eq!(
            kinds,
            vec![MeshKind::Sphere, MeshKind::Sphere, MeshKind::Cube, MeshKind::Cylinder, MeshKind::Plane]
        );
    }
}
