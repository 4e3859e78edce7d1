// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use sketchmap_core::{ObjDocument, ObjFace};

/// 8-bit RGB color
pub type Rgb8 = [u8; 3];

/// Marker for a face index that could not be resolved at all
pub const INVALID_INDEX: u32 = u32::MAX;

/// Coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The two remaining axes, in ascending order, when `self` is vertical
    #[inline]
    pub fn horizontal(self) -> [Axis; 2] {
        match self {
            Axis::X => [Axis::Y, Axis::Z],
            Axis::Y => [Axis::X, Axis::Z],
            Axis::Z => [Axis::X, Axis::Y],
        }
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds3 {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Bounds3 {
    /// Extent along one axis
    #[inline]
    pub fn span(&self, axis: Axis) -> f64 {
        self.max[axis.index()] - self.min[axis.index()]
    }

    /// Smallest box containing both
    pub fn union(&self, other: &Bounds3) -> Bounds3 {
        Bounds3 {
            min: Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }
}

/// A named material carried over from the OBJ/MTL input
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialInfo {
    pub name: String,
    pub color: Option<Rgb8>,
}

/// Polygon face
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    /// Vertex indices; `INVALID_INDEX` or anything `>= vertex_count` is invalid
    pub indices: SmallVec<[u32; 4]>,
    /// Index into `Mesh::materials`
    pub material: Option<u32>,
    /// Index into `Mesh::groups`
    pub group: Option<u32>,
}

/// Polygon mesh as exported by the sketching tool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions
    pub positions: Vec<Point3<f64>>,
    /// Optional per-vertex color, parallel to `positions`
    pub vertex_colors: Vec<Option<Rgb8>>,
    /// Faces
    pub faces: Vec<Face>,
    pub materials: Vec<MaterialInfo>,
    pub groups: Vec<String>,
}

#[inline]
fn unit_to_rgb8(c: [f32; 3]) -> Rgb8 {
    c.map(|v| (v.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[inline]
fn rgb8_to_unit(c: Rgb8) -> [f32; 3] {
    c.map(|v| v as f32 / 255.0)
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh from a parsed OBJ document
    pub fn from_obj(doc: &ObjDocument) -> Self {
        let positions = doc
            .vertices
            .iter()
            .map(|v| Point3::new(v[0], v[1], v[2]))
            .collect();

        let vertex_colors = doc
            .vertex_colors
            .iter()
            .map(|c| c.map(unit_to_rgb8))
            .collect();

        let faces = doc
            .faces
            .iter()
            .map(|f| Face {
                indices: f
                    .indices
                    .iter()
                    .map(|&i| {
                        if i < 0 || i >= INVALID_INDEX as i64 {
                            INVALID_INDEX
                        } else {
                            i as u32
                        }
                    })
                    .collect(),
                material: f.material,
                group: f.group,
            })
            .collect();

        let materials = doc
            .materials
            .iter()
            .enumerate()
            .map(|(i, name)| MaterialInfo {
                name: name.clone(),
                color: doc.material_colors.get(i).copied().flatten().map(unit_to_rgb8),
            })
            .collect();

        Self {
            positions,
            vertex_colors,
            faces,
            materials,
            groups: doc.groups.clone(),
        }
    }

    /// Convert back to an OBJ document for writing
    pub fn to_obj(&self) -> ObjDocument {
        let mut doc = ObjDocument::default();
        for material in &self.materials {
            let idx = doc.intern_material(&material.name) as usize;
            doc.material_colors[idx] = material.color.map(rgb8_to_unit);
        }
        for group in &self.groups {
            doc.intern_group(group);
        }
        doc.vertices = self.positions.iter().map(|p| [p.x, p.y, p.z]).collect();
        doc.vertex_colors = (0..self.positions.len())
            .map(|i| self.vertex_colors.get(i).copied().flatten().map(rgb8_to_unit))
            .collect();
        doc.faces = self
            .faces
            .iter()
            .map(|f| ObjFace {
                indices: f
                    .indices
                    .iter()
                    .map(|&i| if i == INVALID_INDEX { -1 } else { i as i64 })
                    .collect(),
                material: f.material,
                group: f.group,
            })
            .collect();
        doc
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get face count
    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// A mesh without faces is empty, whatever its vertex list holds
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// True if every index of the face refers to an existing vertex
    #[inline]
    pub fn face_is_valid(&self, face: &Face) -> bool {
        face.indices
            .iter()
            .all(|&i| (i as usize) < self.positions.len())
    }

    /// Polygon area via the Newell normal. Returns 0 for invalid faces.
    pub fn face_area(&self, face: &Face) -> f64 {
        if face.indices.len() < 3 || !self.face_is_valid(face) {
            return 0.0;
        }
        let mut normal = Vector3::<f64>::zeros();
        let n = face.indices.len();
        for k in 0..n {
            let a = &self.positions[face.indices[k] as usize];
            let b = &self.positions[face.indices[(k + 1) % n] as usize];
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
        }
        normal.norm() * 0.5
    }

    /// Resolved face color: material diffuse first, then mean vertex color
    pub fn face_color(&self, face: &Face) -> Option<Rgb8> {
        if let Some(color) = face
            .material
            .and_then(|m| self.materials.get(m as usize))
            .and_then(|m| m.color)
        {
            return Some(color);
        }

        let mut sum = [0u32; 3];
        let mut count = 0u32;
        for &i in &face.indices {
            if let Some(Some(c)) = self.vertex_colors.get(i as usize) {
                sum[0] += c[0] as u32;
                sum[1] += c[1] as u32;
                sum[2] += c[2] as u32;
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        Some(sum.map(|s| ((s + count / 2) / count) as u8))
    }

    /// Bounds of all finite vertex positions
    pub fn bounds(&self) -> Option<Bounds3> {
        let mut iter = self
            .positions
            .iter()
            .filter(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite());
        let first = iter.next()?;
        let mut min = *first;
        let mut max = *first;
        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }
        Some(Bounds3 { min, max })
    }

    /// Bounds of the vertices actually referenced by faces
    pub fn referenced_bounds(&self) -> Option<Bounds3> {
        let mut bounds: Option<Bounds3> = None;
        for face in &self.faces {
            for &i in &face.indices {
                let Some(p) = self.positions.get(i as usize) else {
                    continue;
                };
                let b = Bounds3 { min: *p, max: *p };
                bounds = Some(match bounds {
                    Some(acc) => acc.union(&b),
                    None => b,
                });
            }
        }
        bounds
    }

    /// New mesh holding only the listed faces (in the given order).
    ///
    /// With `compact`, vertices not referenced by any kept face are dropped
    /// and the survivors keep their relative order. Faces must be valid.
    pub fn subset(&self, face_indices: &[usize], compact: bool) -> Mesh {
        let faces: Vec<Face> = face_indices.iter().map(|&i| self.faces[i].clone()).collect();

        if !compact {
            return Mesh {
                positions: self.positions.clone(),
                vertex_colors: self.vertex_colors.clone(),
                faces,
                materials: self.materials.clone(),
                groups: self.groups.clone(),
            };
        }

        let mut used = vec![false; self.positions.len()];
        for face in &faces {
            for &i in &face.indices {
                used[i as usize] = true;
            }
        }

        let mut remap = vec![INVALID_INDEX; self.positions.len()];
        let mut positions = Vec::new();
        let mut vertex_colors = Vec::new();
        for (old, &keep) in used.iter().enumerate() {
            if keep {
                remap[old] = positions.len() as u32;
                positions.push(self.positions[old]);
                vertex_colors.push(self.vertex_colors.get(old).copied().flatten());
            }
        }

        let faces = faces
            .into_iter()
            .map(|mut f| {
                for i in f.indices.iter_mut() {
                    *i = remap[*i as usize];
                }
                f
            })
            .collect();

        Mesh {
            positions,
            vertex_colors,
            faces,
            materials: self.materials.clone(),
            groups: self.groups.clone(),
        }
    }

    /// Coordinate of a vertex along an axis
    #[inline]
    pub fn coordinate(&self, vertex: usize, axis: Axis) -> f64 {
        self.positions[vertex][axis.index()]
    }
}
