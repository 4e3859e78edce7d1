// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Minimal MTL reader: material names and diffuse colors

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::parser::LineScanner;

/// A material definition
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    /// `Kd` diffuse color in [0, 1]
    pub diffuse: Option<[f32; 3]>,
}

/// Materials from one or more MTL files
#[derive(Debug, Clone, Default)]
pub struct MaterialLibrary {
    pub materials: Vec<Material>,
    lookup: FxHashMap<String, usize>,
}

impl MaterialLibrary {
    /// Diffuse color of a material by name
    pub fn diffuse(&self, name: &str) -> Option<[f32; 3]> {
        self.lookup
            .get(name)
            .and_then(|&idx| self.materials[idx].diffuse)
    }

    /// Merge another library into this one; later definitions win
    pub fn extend(&mut self, other: MaterialLibrary) {
        for material in other.materials {
            self.insert(material);
        }
    }

    fn insert(&mut self, material: Material) {
        match self.lookup.get(&material.name) {
            Some(&idx) => self.materials[idx] = material,
            None => {
                self.lookup.insert(material.name.clone(), self.materials.len());
                self.materials.push(material);
            }
        }
    }
}

fn parse_rgb(args: &str, line: usize) -> Result<[f32; 3]> {
    let mut values = [0.0f32; 3];
    let mut count = 0;
    for token in args.split_whitespace() {
        if count == 3 {
            break;
        }
        values[count] = fast_float::parse::<f32, _>(token)
            .map_err(|_| Error::InvalidNumber(token.to_string()))?;
        count += 1;
    }
    if count != 3 {
        return Err(Error::parse(line, "Kd needs three components"));
    }
    Ok(values.map(|c| c.clamp(0.0, 1.0)))
}

/// Parse MTL content
pub fn parse_mtl(content: &str) -> Result<MaterialLibrary> {
    let mut library = MaterialLibrary::default();
    let mut current: Option<Material> = None;

    for (line_number, line) in LineScanner::new(content) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (keyword, args) = match line.split_once(char::is_whitespace) {
            Some((k, a)) => (k, a.trim()),
            None => (line, ""),
        };

        match keyword {
            "newmtl" => {
                if args.is_empty() {
                    return Err(Error::MissingArgument {
                        keyword: keyword.to_string(),
                        line: line_number,
                    });
                }
                if let Some(done) = current.take() {
                    library.insert(done);
                }
                current = Some(Material {
                    name: args.to_string(),
                    diffuse: None,
                });
            }
            "Kd" => {
                let rgb = parse_rgb(args, line_number)?;
                match current.as_mut() {
                    Some(material) => material.diffuse = Some(rgb),
                    None => return Err(Error::parse(line_number, "Kd before newmtl")),
                }
            }
            _ => {}
        }
    }

    if let Some(done) = current.take() {
        library.insert(done);
    }
    Ok(library)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mtl() {
        let content = "# exported\nnewmtl Ink\nKa 0 0 0\nKd 0.8 0.1 0.1\n\nnewmtl Paper\nKd 1 1 1\n";
        let lib = parse_mtl(content).unwrap();
        assert_eq!(lib.materials.len(), 2);
        assert_eq!(lib.diffuse("Ink"), Some([0.8, 0.1, 0.1]));
        assert_eq!(lib.diffuse("Paper"), Some([1.0, 1.0, 1.0]));
        assert_eq!(lib.diffuse("Nope"), None);
    }

    #[test]
    fn test_kd_without_material_is_error() {
        assert!(parse_mtl("Kd 1 0 0\n").is_err());
    }

    #[test]
    fn test_extend_overrides() {
        let mut a = parse_mtl("newmtl X\nKd 0 0 0\n").unwrap();
        let b = parse_mtl("newmtl X\nKd 0 1 0\n").unwrap();
        a.extend(b);
        assert_eq!(a.diffuse("X"), Some([0.0, 1.0, 0.0]));
        assert_eq!(a.materials.len(), 1);
    }
}
