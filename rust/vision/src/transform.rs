// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! World-to-pixel transform shared by all floors of a session

use serde::{Deserialize, Serialize};
use sketchmap_geometry::{Axis, Bounds3, Mesh, Point3};

use crate::error::{Error, Result};
use crate::types::Point2D;

/// Orthographic top-down mapping from world coordinates to raster pixels.
///
/// The vertical axis is dropped. The remaining axes map to pixel x and y
/// with one uniform scale, so the footprint keeps its aspect ratio and is
/// centered inside the padded raster. The second horizontal axis is
/// flipped when needed so the plan reads as seen from above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanTransform {
    pub vertical_axis: Axis,
    /// World axes for pixel x and pixel y
    pub horizontal_axes: [Axis; 2],
    pub flip_v: bool,
    /// Pixels per world unit
    pub scale: f64,
    /// World-space minimum of the fitted footprint
    pub world_min: [f64; 2],
    /// World-space maximum of the fitted footprint
    pub world_max: [f64; 2],
    /// Pixel position of the footprint's top-left
    pub offset: [f64; 2],
    pub width: u32,
    pub height: u32,
}

impl PlanTransform {
    /// Fit the union of the meshes' horizontal bounds into a `width` x
    /// `height` raster with `padding` pixels on every side.
    pub fn fit(
        meshes: &[&Mesh],
        vertical_axis: Axis,
        width: u32,
        height: u32,
        padding: u32,
    ) -> Result<Self> {
        let bounds = meshes
            .iter()
            .filter_map(|m| m.bounds())
            .reduce(|a, b| a.union(&b))
            .ok_or_else(|| Error::InvalidRaster("no geometry to fit".to_string()))?;
        Self::fit_bounds(&bounds, vertical_axis, width, height, padding)
    }

    /// Fit explicit world bounds
    pub fn fit_bounds(
        bounds: &Bounds3,
        vertical_axis: Axis,
        width: u32,
        height: u32,
        padding: u32,
    ) -> Result<Self> {
        let usable_w = width as f64 - 2.0 * padding as f64;
        let usable_h = height as f64 - 2.0 * padding as f64;
        if usable_w <= 0.0 || usable_h <= 0.0 {
            return Err(Error::InvalidRaster(format!(
                "padding {} leaves no room in {}x{}",
                padding, width, height
            )));
        }

        let horizontal_axes = vertical_axis.horizontal();
        let [u, v] = horizontal_axes;
        let world_min = [bounds.min[u.index()], bounds.min[v.index()]];
        let world_max = [bounds.max[u.index()], bounds.max[v.index()]];
        let du = world_max[0] - world_min[0];
        let dv = world_max[1] - world_min[1];

        let scale_u = if du > 0.0 { usable_w / du } else { f64::INFINITY };
        let scale_v = if dv > 0.0 { usable_h / dv } else { f64::INFINITY };
        let scale = scale_u.min(scale_v);
        let scale = if scale.is_finite() { scale } else { 1.0 };

        let offset = [
            (width as f64 - scale * du) * 0.5,
            (height as f64 - scale * dv) * 0.5,
        ];

        Ok(Self {
            vertical_axis,
            horizontal_axes,
            // Viewed from above, (u, v, up) must be left-handed in pixel space
            flip_v: vertical_axis != Axis::Y,
            scale,
            world_min,
            world_max,
            offset,
            width,
            height,
        })
    }

    /// Continuous pixel coordinates of a world point
    #[inline]
    pub fn world_to_pixel(&self, p: &Point3<f64>) -> Point2D {
        let [u, v] = self.horizontal_axes;
        let x = self.offset[0] + self.scale * (p[u.index()] - self.world_min[0]);
        let y = if self.flip_v {
            self.offset[1] + self.scale * (self.world_max[1] - p[v.index()])
        } else {
            self.offset[1] + self.scale * (p[v.index()] - self.world_min[1])
        };
        Point2D::new(x, y)
    }

    /// Pixel footprint corners in the same order as `CornerSet`:
    /// top-right, bottom-right, bottom-left, top-left
    pub fn footprint_corners(&self) -> [Point2D; 4] {
        let x0 = self.offset[0];
        let y0 = self.offset[1];
        let x1 = x0 + self.scale * (self.world_max[0] - self.world_min[0]);
        let y1 = y0 + self.scale * (self.world_max[1] - self.world_min[1]);
        [
            Point2D::new(x1, y0),
            Point2D::new(x1, y1),
            Point2D::new(x0, y1),
            Point2D::new(x0, y0),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bounds(min: [f64; 3], max: [f64; 3]) -> Bounds3 {
        Bounds3 {
            min: Point3::new(min[0], min[1], min[2]),
            max: Point3::new(max[0], max[1], max[2]),
        }
    }

    #[test]
    fn test_fit_keeps_aspect_and_centers() {
        // 20 x 10 footprint on X/Z into 220 x 220 with 10 px padding
        let b = bounds([0.0, 0.0, 0.0], [20.0, 5.0, 10.0]);
        let t = PlanTransform::fit_bounds(&b, Axis::Y, 220, 220, 10).unwrap();
        assert_relative_eq!(t.scale, 10.0);
        assert_relative_eq!(t.offset[0], 10.0);
        assert_relative_eq!(t.offset[1], 60.0);

        let p = t.world_to_pixel(&Point3::new(20.0, 3.0, 10.0));
        assert_relative_eq!(p.x, 210.0);
        assert_relative_eq!(p.y, 160.0);
    }

    #[test]
    fn test_z_up_is_flipped() {
        let b = bounds([0.0, 0.0, 0.0], [10.0, 10.0, 30.0]);
        let t = PlanTransform::fit_bounds(&b, Axis::Z, 100, 100, 0).unwrap();
        assert!(t.flip_v);
        // Larger world y is higher on screen
        let top = t.world_to_pixel(&Point3::new(0.0, 10.0, 0.0));
        let bottom = t.world_to_pixel(&Point3::new(0.0, 0.0, 0.0));
        assert!(top.y < bottom.y);
        assert_relative_eq!(top.y, 0.0);
    }

    #[test]
    fn test_height_is_ignored() {
        let b = bounds([0.0, 0.0, 0.0], [10.0, 40.0, 10.0]);
        let t = PlanTransform::fit_bounds(&b, Axis::Y, 100, 100, 5).unwrap();
        let a = t.world_to_pixel(&Point3::new(3.0, 0.0, 7.0));
        let b = t.world_to_pixel(&Point3::new(3.0, 40.0, 7.0));
        assert_eq!(a, b);
    }

    #[test]
    fn test_padding_too_large() {
        let b = bounds([0.0; 3], [1.0; 3]);
        assert!(PlanTransform::fit_bounds(&b, Axis::Y, 20, 100, 10).is_err());
    }

    #[test]
    fn test_footprint_corners() {
        let b = bounds([0.0, 0.0, 0.0], [10.0, 1.0, 10.0]);
        let t = PlanTransform::fit_bounds(&b, Axis::Y, 120, 120, 10).unwrap();
        let c = t.footprint_corners();
        assert_eq!(c[0], Point2D::new(110.0, 10.0));
        assert_eq!(c[2], Point2D::new(10.0, 110.0));
    }
}
