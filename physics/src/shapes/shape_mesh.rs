use super::{
    convex_hull::{build_convex_hull, mass_properties},
    ShapeTrait,
};
use crate::{bounds::Bounds, error::PhysicsError};
use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// Convex point cloud in the collider's frame. Mass properties come from its convex hull.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ShapeMesh {
    vertices: Vec<Vec3>,
    #[serde(skip)]
    bounds: Bounds,
    #[serde(skip)]
    centre_of_mass: Vec3,
    /// Inertia of unit mass about `centre_of_mass`.
    #[serde(skip)]
    inertia: Mat3,
}

impl ShapeMesh {
    /// Builds a mesh from `points`, dropping duplicates closer than `f32::EPSILON`.
    pub fn new(points: &[Vec3]) -> Self {
        let mut vertices: Vec<Vec3> = Vec::with_capacity(points.len());
        for &p in points {
            if !vertices.iter().any(|v| v.abs_diff_eq(p, f32::EPSILON)) {
                vertices.push(p);
            }
        }
        let bounds = Bounds::from_points(&vertices);

        let hull = build_convex_hull(&vertices);
        let (centre_of_mass, inertia) = match mass_properties(&vertices, &hull) {
            Some((volume, centre, inertia)) => (centre, inertia * volume.recip()),
            None => {
                // flat or degenerate, treat it as its bounding box
                let d = bounds.width();
                let dd = d * d;
                let tensor = Mat3::from_diagonal(Vec3::new(dd.y + dd.z, dd.x + dd.z, dd.x + dd.y));
                (
                    bounds.centre(),
                    Mat3::from_cols(tensor.x_axis / 12.0, tensor.y_axis / 12.0, tensor.z_axis / 12.0),
                )
            }
        };

        Self {
            vertices,
            bounds,
            centre_of_mass,
            inertia,
        }
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PhysicsError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mesh: ShapeMesh = serde_json::from_reader(reader)?;
        Ok(ShapeMesh::new(&mesh.vertices))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PhysicsError> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl ShapeTrait for ShapeMesh {
    fn centre_of_mass(&self) -> Vec3 {
        self.centre_of_mass
    }

    fn inertia_tensor(&self, mass: f32) -> Mat3 {
        self.inertia * mass
    }

    fn local_bounds(&self) -> Bounds {
        self.bounds
    }

    fn support(&self, dir: Vec3) -> Vec3 {
        let mut best = Vec3::ZERO;
        let mut max_dist = f32::NEG_INFINITY;
        for &v in &self.vertices {
            let dist = dir.dot(v);
            if dist > max_dist {
                max_dist = dist;
                best = v;
            }
        }
        best
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shapes::Shape;

    #[test]
    fn test_dedup_and_support() {
        let mesh = ShapeMesh::new(&[
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 2.0, 0.0),
        ]);
        assert_eq!(mesh.vertices().len(), 3);
        assert_eq!(mesh.support(Vec3::Y), Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(mesh.support(-Vec3::X), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_cube_matches_box() {
        let mut corners = Vec::new();
        for x in [-0.5, 0.5] {
            for y in [-1.0, 1.0] {
                for z in [-2.0, 2.0] {
                    corners.push(Vec3::new(x, y, z));
                }
            }
        }
        let mesh = ShapeMesh::new(&corners);
        let cube = Shape::make_box(Vec3::new(0.5, 1.0, 2.0));
        assert!(mesh.centre_of_mass().abs_diff_eq(Vec3::ZERO, 1e-5));
        assert!(mesh
            .inertia_tensor(3.0)
            .abs_diff_eq(cube.inertia_tensor(3.0), 1e-3));
    }

    #[test]
    fn test_tetrahedron_mass_properties() {
        let mesh = ShapeMesh::new(&[Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z]);
        assert!(mesh
            .centre_of_mass()
            .abs_diff_eq(Vec3::splat(0.25), 1e-5));

        // right-angle corner tetrahedron about its centroid: 3/40 on the diagonal, 1/80 off it
        let m = 2.0;
        let (d, o) = (m * 3.0 / 40.0, m / 80.0);
        let expected = Mat3::from_cols(
            Vec3::new(d, o, o),
            Vec3::new(o, d, o),
            Vec3::new(o, o, d),
        );
        let tensor = mesh.inertia_tensor(m);
        assert!(tensor.abs_diff_eq(expected, 1e-4), "{tensor}");
    }

    #[test]
    fn test_save_load() {
        let mesh = ShapeMesh::new(&[Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z]);
        let path = std::env::temp_dir().join("physics_shape_mesh_test.json");
        mesh.save(&path).unwrap();
        let loaded = ShapeMesh::load(&path).unwrap();
        assert_eq!(loaded.vertices(), mesh.vertices());
        assert_eq!(loaded.local_bounds().maxs, Vec3::ONE);
        let _ = std::fs::remove_file(path);
    }
}
