// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Planar projector: renders each floor top-down into a fixed-size raster

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use sketchmap_geometry::{Level, LevelMesh, Mesh, Segmentation};

use crate::error::{Error, Result};
use crate::transform::PlanTransform;
use crate::types::{Point2D, RasterConfig};

/// One floor rendered top-down
#[derive(Debug, Clone)]
pub struct FloorPlanRaster {
    pub level: Level,
    pub image: RgbImage,
    pub transform: PlanTransform,
}

impl FloorPlanRaster {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// All three floors of a session under one transform
#[derive(Debug, Clone)]
pub struct SessionRasters {
    pub transform: PlanTransform,
    /// Ground, mid, top
    pub rasters: [FloorPlanRaster; 3],
}

impl SessionRasters {
    #[inline]
    pub fn level(&self, level: Level) -> &FloorPlanRaster {
        &self.rasters[level.index()]
    }
}

/// Fill a polygon at pixel centers with the even-odd rule
fn fill_polygon(image: &mut RgbImage, points: &[Point2D], color: Rgb<u8>) {
    if points.len() < 3 {
        return;
    }
    let (w, h) = (image.width() as i64, image.height() as i64);
    let y_min = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
    let y_max = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
    let row_start = ((y_min - 0.5).ceil() as i64).max(0);
    let row_end = ((y_max - 0.5).ceil() as i64).min(h);

    let mut crossings: Vec<f64> = Vec::with_capacity(points.len());
    for row in row_start..row_end {
        let yc = row as f64 + 0.5;
        crossings.clear();
        for k in 0..points.len() {
            let a = points[k];
            let b = points[(k + 1) % points.len()];
            if (a.y <= yc && yc < b.y) || (b.y <= yc && yc < a.y) {
                crossings.push(a.x + (yc - a.y) * (b.x - a.x) / (b.y - a.y));
            }
        }
        crossings.sort_by(f64::total_cmp);

        for pair in crossings.chunks_exact(2) {
            let x_start = ((pair[0] - 0.5).ceil() as i64).max(0);
            let x_end = ((pair[1] - 0.5).ceil() as i64).min(w);
            for x in x_start..x_end {
                image.put_pixel(x as u32, row as u32, color);
            }
        }
    }
}

fn stroke_polygon(image: &mut RgbImage, points: &[Point2D], color: Rgb<u8>) {
    for k in 0..points.len() {
        let a = points[k];
        let b = points[(k + 1) % points.len()];
        draw_line_segment_mut(
            image,
            (a.x as f32 - 0.5, a.y as f32 - 0.5),
            (b.x as f32 - 0.5, b.y as f32 - 0.5),
            color,
        );
    }
}

/// Face order for painting: lowest first, so higher geometry stays visible
fn paint_order(mesh: &Mesh, transform: &PlanTransform) -> Vec<usize> {
    let axis = transform.vertical_axis;
    let mut order: Vec<(usize, f64)> = mesh
        .faces
        .iter()
        .enumerate()
        .map(|(i, face)| {
            let top = face
                .indices
                .iter()
                .map(|&v| mesh.coordinate(v as usize, axis))
                .fold(f64::NEG_INFINITY, f64::max);
            (i, top)
        })
        .collect();
    order.sort_by(|a, b| a.1.total_cmp(&b.1));
    order.into_iter().map(|(i, _)| i).collect()
}

/// Render one floor with a given transform.
///
/// Output depends only on the mesh, the transform and the config.
pub fn project_level(
    level: &LevelMesh,
    transform: &PlanTransform,
    config: &RasterConfig,
) -> Result<FloorPlanRaster> {
    if (transform.width, transform.height) != (config.width, config.height) {
        return Err(Error::SizeMismatch {
            left: (transform.width, transform.height),
            right: (config.width, config.height),
        });
    }

    let mesh = &level.mesh;
    let mut image = RgbImage::from_pixel(config.width, config.height, Rgb(config.background));
    let mut polygon = Vec::new();

    for f in paint_order(mesh, transform) {
        let face = &mesh.faces[f];
        if !mesh.face_is_valid(face) {
            continue;
        }
        polygon.clear();
        polygon.extend(
            face.indices
                .iter()
                .map(|&v| transform.world_to_pixel(&mesh.positions[v as usize])),
        );
        let color = Rgb(mesh.face_color(face).unwrap_or(config.default_face_color));
        fill_polygon(&mut image, &polygon, color);
        if config.draw_edges {
            stroke_polygon(&mut image, &polygon, color);
        }
    }

    Ok(FloorPlanRaster {
        level: level.level,
        image,
        transform: *transform,
    })
}

/// Render all three floors.
///
/// Without an explicit transform, one is fitted to the union of every
/// floor's footprint so pixel positions are comparable across floors.
pub fn project_session(
    segmentation: &Segmentation,
    config: &RasterConfig,
    transform: Option<PlanTransform>,
) -> Result<SessionRasters> {
    let transform = match transform {
        Some(t) => t,
        None => {
            let meshes: Vec<&Mesh> = segmentation.levels.iter().map(|l| &l.mesh).collect();
            PlanTransform::fit(
                &meshes,
                segmentation.axis,
                config.width,
                config.height,
                config.padding,
            )?
        }
    };

    let [ground, mid, top] = &segmentation.levels;
    Ok(SessionRasters {
        transform,
        rasters: [
            project_level(ground, &transform, config)?,
            project_level(mid, &transform, config)?,
            project_level(top, &transform, config)?,
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketchmap_core::parse_obj;
    use sketchmap_geometry::{segment_levels, SegmentationConfig};

    fn slab_session() -> Segmentation {
        let mut obj = String::new();
        // Ground 10x10, mid and top shifted footprints
        for (h, x0) in [(0.0, 0.0), (15.0, 5.0), (30.0, 10.0)] {
            for (dx, z) in [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)] {
                obj.push_str(&format!("v {} {} {}\n", x0 + dx, h, z));
            }
        }
        obj.push_str("f 1 2 3 4\nf 5 6 7 8\nf 9 10 11 12\n");
        let mesh = Mesh::from_obj(&parse_obj(&obj).unwrap());
        segment_levels(&mesh, &SegmentationConfig::default()).unwrap()
    }

    fn small_config() -> RasterConfig {
        RasterConfig {
            width: 200,
            height: 100,
            padding: 0,
            draw_edges: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_fill_square() {
        let mut img = RgbImage::from_pixel(10, 10, Rgb([255, 255, 255]));
        let square = [
            Point2D::new(2.0, 2.0),
            Point2D::new(6.0, 2.0),
            Point2D::new(6.0, 6.0),
            Point2D::new(2.0, 6.0),
        ];
        fill_polygon(&mut img, &square, Rgb([0, 0, 0]));
        let filled = img.pixels().filter(|p| p.0 == [0, 0, 0]).count();
        assert_eq!(filled, 16);
        assert_eq!(img.get_pixel(2, 2).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(6, 6).0, [255, 255, 255]);
    }

    #[test]
    fn test_shared_transform_across_floors() {
        let seg = slab_session();
        let rasters = project_session(&seg, &small_config(), None).unwrap();

        // Union footprint is 20 x 10 world units -> 200 x 100 px, scale 10
        assert!((rasters.transform.scale - 10.0).abs() < 1e-9);
        for r in &rasters.rasters {
            assert_eq!(r.transform, rasters.transform);
            assert_eq!((r.width(), r.height()), (200, 100));
        }

        let ink = [40, 40, 40];
        // Ground covers x in [0, 100), top covers [100, 200)
        assert_eq!(rasters.level(Level::Ground).image.get_pixel(50, 50).0, ink);
        assert_eq!(rasters.level(Level::Ground).image.get_pixel(150, 50).0, [255, 255, 255]);
        assert_eq!(rasters.level(Level::Top).image.get_pixel(150, 50).0, ink);
        assert_eq!(rasters.level(Level::Mid).image.get_pixel(99, 50).0, ink);
    }

    #[test]
    fn test_projection_is_deterministic() {
        let seg = slab_session();
        let a = project_session(&seg, &small_config(), None).unwrap();
        let b = project_session(&seg, &small_config(), Some(a.transform)).unwrap();
        for level in Level::ALL {
            assert_eq!(a.level(level).image.as_raw(), b.level(level).image.as_raw());
        }
    }

    #[test]
    fn test_size_mismatch() {
        let seg = slab_session();
        let rasters = project_session(&seg, &small_config(), None).unwrap();
        let other = RasterConfig {
            width: 300,
            ..small_config()
        };
        assert!(matches!(
            project_level(seg.level(Level::Mid), &rasters.transform, &other),
            Err(Error::SizeMismatch { .. })
        ));
    }
}
