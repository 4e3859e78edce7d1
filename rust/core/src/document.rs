// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory representation of an OBJ file

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::mtl::MaterialLibrary;

/// A polygon face
#[derive(Debug, Clone, PartialEq)]
pub struct ObjFace {
    /// Resolved 0-based vertex indices (may be out of range in raw input)
    pub indices: SmallVec<[i64; 4]>,
    /// Index into `ObjDocument::materials`
    pub material: Option<u32>,
    /// Index into `ObjDocument::groups`
    pub group: Option<u32>,
}

/// Parsed OBJ content
#[derive(Debug, Clone, Default)]
pub struct ObjDocument {
    /// Vertex positions, in file order
    pub vertices: Vec<[f64; 3]>,
    /// Optional per-vertex color in [0, 1], parallel to `vertices`
    pub vertex_colors: Vec<Option<[f32; 3]>>,
    /// Faces, in file order
    pub faces: Vec<ObjFace>,
    /// Material names in order of first `usemtl`
    pub materials: Vec<String>,
    /// Diffuse colors resolved from MTL files, parallel to `materials`
    pub material_colors: Vec<Option<[f32; 3]>>,
    /// Group/object names in order of first appearance
    pub groups: Vec<String>,
    /// `mtllib` references
    pub material_libraries: Vec<String>,
    material_lookup: FxHashMap<String, u32>,
    group_lookup: FxHashMap<String, u32>,
}

impl ObjDocument {
    /// Get (or register) the index of a material name
    pub fn intern_material(&mut self, name: &str) -> u32 {
        if let Some(&idx) = self.material_lookup.get(name) {
            return idx;
        }
        let idx = self.materials.len() as u32;
        self.materials.push(name.to_string());
        self.material_colors.push(None);
        self.material_lookup.insert(name.to_string(), idx);
        idx
    }

    /// Get (or register) the index of a group name
    pub fn intern_group(&mut self, name: &str) -> u32 {
        if let Some(&idx) = self.group_lookup.get(name) {
            return idx;
        }
        let idx = self.groups.len() as u32;
        self.groups.push(name.to_string());
        self.group_lookup.insert(name.to_string(), idx);
        idx
    }

    /// Resolve material diffuse colors from a parsed MTL library.
    ///
    /// Returns the number of materials that received a color.
    pub fn apply_materials(&mut self, library: &MaterialLibrary) -> usize {
        let mut resolved = 0;
        for (name, color) in self.materials.iter().zip(self.material_colors.iter_mut()) {
            if let Some(diffuse) = library.diffuse(name) {
                *color = Some(diffuse);
                resolved += 1;
            }
        }
        resolved
    }

    /// True if any vertex carries a color
    pub fn has_vertex_colors(&self) -> bool {
        self.vertex_colors.iter().any(Option::is_some)
    }
}
