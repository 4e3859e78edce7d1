// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Annotation extractor
//!
//! Per color class: membership mask, optional cleanup, 8-connected
//! components, area filter, centroid, nearest canonical corner.

use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::color::ColorClass;
use crate::image_ops::clean_mask;
use crate::projector::FloorPlanRaster;
use crate::types::{Annotation, CornerSet, ExtractionConfig, Footprint, PixelBox, Point2D, Span};

/// Running statistics for one labelled component
struct ComponentStats {
    area: u64,
    sum_x: u64,
    sum_y: u64,
    bbox: PixelBox,
    spans: Vec<Span>,
}

impl ComponentStats {
    fn new(x: u32, y: u32) -> Self {
        Self {
            area: 0,
            sum_x: 0,
            sum_y: 0,
            bbox: PixelBox {
                x_min: x,
                y_min: y,
                x_max: x,
                y_max: y,
            },
            spans: Vec::new(),
        }
    }

    fn add_run(&mut self, y: u32, x_start: u32, x_end: u32) {
        let n = (x_end - x_start) as u64;
        self.area += n;
        // Sum of x over [x_start, x_end)
        self.sum_x += (x_start as u64 + x_end as u64 - 1) * n / 2;
        self.sum_y += y as u64 * n;
        self.bbox.x_min = self.bbox.x_min.min(x_start);
        self.bbox.x_max = self.bbox.x_max.max(x_end - 1);
        self.bbox.y_min = self.bbox.y_min.min(y);
        self.bbox.y_max = self.bbox.y_max.max(y);
        self.spans.push(Span { y, x_start, x_end });
    }
}

/// Connected components of a binary mask, indexed by label
fn mask_components(mask: &GrayImage) -> Vec<ComponentStats> {
    let labels = connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let mut stats: Vec<Option<ComponentStats>> = Vec::new();

    for y in 0..labels.height() {
        let mut x = 0;
        while x < labels.width() {
            let label = labels.get_pixel(x, y).0[0];
            if label == 0 {
                x += 1;
                continue;
            }
            let start = x;
            while x < labels.width() && labels.get_pixel(x, y).0[0] == label {
                x += 1;
            }
            let slot = label as usize - 1;
            if stats.len() <= slot {
                stats.resize_with(slot + 1, || None);
            }
            stats[slot]
                .get_or_insert_with(|| ComponentStats::new(start, y))
                .add_run(y, start, x);
        }
    }

    stats.into_iter().flatten().collect()
}

/// Annotations of one color class on one raster
pub fn extract_class(
    raster: &FloorPlanRaster,
    class: &ColorClass,
    config: &ExtractionConfig,
    corners: &CornerSet,
) -> Vec<Annotation> {
    let mask = clean_mask(&class.mask(&raster.image), config.open_radius, config.dilate_radius);

    let mut components = mask_components(&mask);
    // Labels follow first-pixel order already; make it explicit
    components.sort_by_key(|c| (c.spans[0].y, c.spans[0].x_start));

    components
        .into_iter()
        .filter(|c| c.area >= config.min_component_area)
        .map(|c| {
            let centroid = Point2D::new(
                c.sum_x as f64 / c.area as f64,
                c.sum_y as f64 / c.area as f64,
            );
            let (corner, corner_distance) = corners.nearest(&centroid);
            Annotation {
                class: class.name.clone(),
                level: raster.level,
                centroid,
                area: c.area,
                bbox: c.bbox,
                footprint: Footprint { spans: c.spans },
                corner,
                corner_distance,
            }
        })
        .collect()
}

/// All annotations on a raster, grouped by class in configuration order.
///
/// A class with an empty mask contributes nothing; that is a valid result.
pub fn extract_annotations(
    raster: &FloorPlanRaster,
    config: &ExtractionConfig,
    corners: &CornerSet,
) -> Vec<Annotation> {
    config
        .classes
        .iter()
        .flat_map(|class| extract_class(raster, class, config, corners))
        .collect()
}
