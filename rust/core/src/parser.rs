// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wavefront OBJ parser using nom
//!
//! Line-oriented: each statement is tokenized with nom combinators and
//! numeric fields go through fast-float / lexical-core.

use nom::{
    bytes::complete::take_while1,
    character::complete::{char, digit1, one_of, space0, space1},
    combinator::{all_consuming, map_res, opt, recognize},
    multi::separated_list1,
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};
use smallvec::SmallVec;

use crate::document::{ObjDocument, ObjFace};
use crate::error::{Error, Result};

/// One parsed OBJ statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'a> {
    /// `v x y z [r g b]`
    Vertex([f64; 3], Option<[f32; 3]>),
    /// `f a b c ...` with raw (1-based or negative) vertex indices
    Face(SmallVec<[i64; 4]>),
    /// `usemtl name`
    UseMaterial(&'a str),
    /// `g name` / `o name`
    Group(&'a str),
    /// `mtllib file.mtl`
    MaterialLibrary(&'a str),
    /// Anything we do not need (vt, vn, s, l, comments, ...)
    Ignored,
}

/// Parse a single whitespace-delimited token
fn word(input: &str) -> IResult<&str, &str> {
    preceded(space0, take_while1(|c: char| !c.is_whitespace()))(input)
}

/// Parse a float token: 1, -1.5, 2e-3, .5
fn float(input: &str) -> IResult<&str, f64> {
    map_res(word, |s: &str| fast_float::parse::<f64, _>(s))(input)
}

/// Parse integer: 42, -42, +7
fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        lexical_core::parse::<i64>(s.trim_start_matches('+').as_bytes())
    })(input)
}

/// Parse a face vertex reference: `v`, `v/vt`, `v//vn`, `v/vt/vn`
///
/// Only the position index is kept.
fn face_vertex(input: &str) -> IResult<&str, i64> {
    let (rest, (v, _, _)) = tuple((
        integer,
        opt(preceded(char('/'), opt(integer))),
        opt(preceded(char('/'), opt(integer))),
    ))(input)?;
    Ok((rest, v))
}

/// Parse the payload of an `f` statement
fn face_payload(input: &str) -> IResult<&str, Vec<i64>> {
    all_consuming(terminated(
        preceded(space0, separated_list1(space1, face_vertex)),
        space0,
    ))(input)
}

/// Parse the payload of a `v` statement into its numeric fields
fn vertex_payload(input: &str) -> IResult<&str, Vec<f64>> {
    all_consuming(terminated(
        nom::multi::many1(float),
        space0,
    ))(input)
}

/// Colors written as bytes (0..255) are normalized to [0, 1]
fn normalize_color(rgb: [f64; 3]) -> [f32; 3] {
    let scale = if rgb.iter().any(|&c| c > 1.0) { 255.0 } else { 1.0 };
    [
        (rgb[0] / scale).clamp(0.0, 1.0) as f32,
        (rgb[1] / scale).clamp(0.0, 1.0) as f32,
        (rgb[2] / scale).clamp(0.0, 1.0) as f32,
    ]
}

/// Parse one line of OBJ content
pub fn parse_statement(line: &str, line_number: usize) -> Result<Statement<'_>> {
    let line = match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let line = line.trim();
    if line.is_empty() {
        return Ok(Statement::Ignored);
    }

    let (rest, keyword) =
        word(line).map_err(|e| Error::parse(line_number, format!("{}", e)))?;
    let rest = rest.trim();

    match keyword {
        "v" => {
            let (_, values) = vertex_payload(rest)
                .map_err(|e| Error::parse(line_number, format!("bad vertex: {}", e)))?;
            match values.len() {
                3 | 4 => Ok(Statement::Vertex([values[0], values[1], values[2]], None)),
                6 | 7 => Ok(Statement::Vertex(
                    [values[0], values[1], values[2]],
                    Some(normalize_color([values[3], values[4], values[5]])),
                )),
                n => Err(Error::parse(
                    line_number,
                    format!("vertex has {} components, expected 3, 4 or 6", n),
                )),
            }
        }
        "f" => {
            let (_, indices) = face_payload(rest)
                .map_err(|e| Error::parse(line_number, format!("bad face: {}", e)))?;
            Ok(Statement::Face(indices.into_iter().collect()))
        }
        "usemtl" | "g" | "o" | "mtllib" => {
            if rest.is_empty() {
                return Err(Error::MissingArgument {
                    keyword: keyword.to_string(),
                    line: line_number,
                });
            }
            Ok(match keyword {
                "usemtl" => Statement::UseMaterial(rest),
                "mtllib" => Statement::MaterialLibrary(rest),
                _ => Statement::Group(rest),
            })
        }
        _ => Ok(Statement::Ignored),
    }
}

/// Line scanner over raw content, using memchr to find line breaks
pub struct LineScanner<'a> {
    content: &'a str,
    position: usize,
    line: usize,
}

impl<'a> LineScanner<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            position: 0,
            line: 0,
        }
    }
}

impl<'a> Iterator for LineScanner<'a> {
    /// (1-based line number, line without terminator)
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.content.len() {
            return None;
        }
        let remaining = &self.content[self.position..];
        let end = memchr::memchr(b'\n', remaining.as_bytes()).unwrap_or(remaining.len());
        let line = remaining[..end].trim_end_matches('\r');
        self.position += end + 1;
        self.line += 1;
        Some((self.line, line))
    }
}

/// Resolve a raw OBJ index against the number of vertices seen so far.
///
/// Positive indices are 1-based, negative ones count back from the last
/// vertex. Zero and underflowing indices resolve to -1 (invalid).
#[inline]
fn resolve_index(raw: i64, vertices_seen: usize) -> i64 {
    if raw > 0 {
        raw - 1
    } else if raw < 0 {
        let resolved = vertices_seen as i64 + raw;
        if resolved < 0 {
            -1
        } else {
            resolved
        }
    } else {
        -1
    }
}

/// Parse OBJ content into a document.
///
/// Face indices are resolved to 0-based positions but not range-checked:
/// invalid references are kept so the sanitizer can report them.
pub fn parse_obj(content: &str) -> Result<ObjDocument> {
    let mut doc = ObjDocument::default();
    let mut current_material: Option<u32> = None;
    let mut current_group: Option<u32> = None;

    for (line_number, line) in LineScanner::new(content) {
        match parse_statement(line, line_number)? {
            Statement::Vertex(position, color) => {
                doc.vertices.push(position);
                doc.vertex_colors.push(color);
            }
            Statement::Face(raw) => {
                let seen = doc.vertices.len();
                let indices = raw.iter().map(|&i| resolve_index(i, seen)).collect();
                doc.faces.push(ObjFace {
                    indices,
                    material: current_material,
                    group: current_group,
                });
            }
            Statement::UseMaterial(name) => {
                current_material = Some(doc.intern_material(name));
            }
            Statement::Group(name) => {
                current_group = Some(doc.intern_group(name));
            }
            Statement::MaterialLibrary(name) => {
                doc.material_libraries.push(name.to_string());
            }
            Statement::Ignored => {}
        }
    }

    Ok(doc)
}
