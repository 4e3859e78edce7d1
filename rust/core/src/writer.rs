// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! OBJ serialization for intermediate mesh artifacts

use std::fmt::Write;

use crate::document::ObjDocument;

/// Serialize a document back to OBJ text.
///
/// Coordinates use Rust's shortest round-trip float formatting, so
/// `parse_obj(write_obj(doc))` reproduces the same positions bit for bit.
/// Out-of-range face indices are written as-is (1-based).
pub fn write_obj(doc: &ObjDocument) -> String {
    let mut out = String::with_capacity(doc.vertices.len() * 32 + doc.faces.len() * 16);
    out.push_str("# sketchmap\n");

    for lib in &doc.material_libraries {
        let _ = writeln!(out, "mtllib {}", lib);
    }

    for (i, v) in doc.vertices.iter().enumerate() {
        match doc.vertex_colors.get(i).copied().flatten() {
            Some(c) => {
                let _ = writeln!(out, "v {} {} {} {} {} {}", v[0], v[1], v[2], c[0], c[1], c[2]);
            }
            None => {
                let _ = writeln!(out, "v {} {} {}", v[0], v[1], v[2]);
            }
        }
    }

    let mut current_group: Option<u32> = None;
    let mut current_material: Option<u32> = None;

    for face in &doc.faces {
        if face.group != current_group {
            if let Some(name) = face.group.and_then(|g| doc.groups.get(g as usize)) {
                let _ = writeln!(out, "g {}", name);
            }
            current_group = face.group;
        }
        if face.material != current_material {
            if let Some(name) = face.material.and_then(|m| doc.materials.get(m as usize)) {
                let _ = writeln!(out, "usemtl {}", name);
            }
            current_material = face.material;
        }

        out.push('f');
        for &idx in &face.indices {
            // 0-based back to 1-based; invalid (-1) becomes 0, which re-parses as invalid
            let _ = write!(out, " {}", idx + 1);
        }
        out.push('\n');
    }

    out
}

/// Serialize the document's material colors as an MTL library.
///
/// Materials without a color get a bare `newmtl` entry.
pub fn write_mtl(doc: &ObjDocument) -> String {
    let mut out = String::with_capacity(doc.materials.len() * 48);
    out.push_str("# sketchmap\n");
    for (i, name) in doc.materials.iter().enumerate() {
        let _ = writeln!(out, "newmtl {}", name);
        if let Some(kd) = doc.material_colors.get(i).copied().flatten() {
            let _ = writeln!(out, "Kd {} {} {}", kd[0], kd[1], kd[2]);
        }
    }
    out
}
