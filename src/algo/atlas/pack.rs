//! Chart packing.
//!
//! Charts are placed as axis-aligned rectangles with guillotine
//! best-short-side-fit, largest first, trying both orientations. A common
//! scale (texels per 3D unit) is maximized by bisection.

use log::debug;
use nalgebra::Point2;
use serde::Serialize;

use super::PackOptions;
use crate::algo::progress::ProgressTracker;
use crate::error::{AtlasError, Result};

/// Bisection steps on the packing scale.
const SCALE_ITERATIONS: usize = 30;
/// Smallest texel size of the longest chart side that still counts as placed.
const MIN_CHART_TEXELS: f64 = 1.0;

const EPS: f64 = 1e-9;

/// Packed location of one chart, in texels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartRect {
    /// Left edge of the chart content.
    pub x: f32,
    /// Bottom edge of the chart content.
    pub y: f32,
    /// Content width (excluding gutter).
    pub width: f32,
    /// Content height (excluding gutter).
    pub height: f32,
    /// Whether the chart was rotated by 90 degrees.
    pub rotated: bool,
}

impl ChartRect {
    /// Gap between two rectangles along the axis where they are separated,
    /// or a negative overlap depth when they intersect.
    pub fn gap(&self, other: &ChartRect) -> f32 {
        let dx = (other.x - (self.x + self.width)).max(self.x - (other.x + other.width));
        let dy = (other.y - (self.y + self.height)).max(self.y - (other.y + other.height));
        dx.max(dy)
    }
}

/// Transform from chart UV (3D units, box at the origin) to texels.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Placement {
    origin: Point2<f64>,
    scale: f64,
    rotated: bool,
    /// Chart extent along U before rotation.
    width: f64,
    pub rect: ChartRect,
}

impl Placement {
    #[inline]
    pub fn to_texels(&self, uv: Point2<f64>) -> Point2<f64> {
        let local = if self.rotated {
            Point2::new(uv.y, self.width - uv.x)
        } else {
            uv
        };
        self.origin + local.coords * self.scale
    }
}

#[derive(Debug, Clone, Copy)]
struct FreeRect {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

/// Place every chart at scale `scale`, or `None` if they do not fit.
fn try_pack(extents: &[(f64, f64)], order: &[usize], scale: f64, options: &PackOptions) -> Option<Vec<Placement>> {
    let g = options.gutter as f64;
    let (width, height) = (options.width as f64, options.height as f64);
    if width - g <= 0.0 || height - g <= 0.0 {
        return None;
    }

    let mut free = vec![FreeRect {
        x: g,
        y: g,
        w: width - g,
        h: height - g,
    }];
    let mut placements: Vec<Option<Placement>> = vec![None; extents.len()];

    for &i in order {
        let (cw, ch) = (extents[i].0 * scale, extents[i].1 * scale);
        let (rw, rh) = (cw + g, ch + g);

        let mut best: Option<(f64, f64, usize, bool)> = None;
        for (j, r) in free.iter().enumerate() {
            for rotated in [false, true] {
                let (pw, ph) = if rotated { (rh, rw) } else { (rw, rh) };
                if pw > r.w + EPS || ph > r.h + EPS {
                    continue;
                }
                let short = (r.w - pw).min(r.h - ph);
                let long = (r.w - pw).max(r.h - ph);
                if best.map_or(true, |(s, l, _, _)| short < s || (short == s && long < l)) {
                    best = Some((short, long, j, rotated));
                }
            }
        }

        let (_, _, j, rotated) = best?;
        let r = free.swap_remove(j);
        let (pw, ph) = if rotated { (rh, rw) } else { (rw, rh) };

        let right = FreeRect {
            x: r.x + pw,
            y: r.y,
            w: r.w - pw,
            h: ph,
        };
        let top = FreeRect {
            x: r.x,
            y: r.y + ph,
            w: r.w,
            h: r.h - ph,
        };
        for split in [right, top] {
            if split.w > EPS && split.h > EPS {
                free.push(split);
            }
        }

        let (content_w, content_h) = if rotated { (ch, cw) } else { (cw, ch) };
        placements[i] = Some(Placement {
            origin: Point2::new(r.x, r.y),
            scale,
            rotated,
            width: extents[i].0,
            rect: ChartRect {
                x: r.x as f32,
                y: r.y as f32,
                width: content_w as f32,
                height: content_h as f32,
                rotated,
            },
        });
    }

    placements.into_iter().collect()
}

/// Pack charts of the given UV extents, maximizing the common scale.
///
/// Fails with [`AtlasError::PackingOverflow`] when the gutters alone do not
/// fit, or when no positive scale gives the largest chart at least one texel.
pub(crate) fn pack_charts(
    extents: &[(f64, f64)],
    options: &PackOptions,
    mut tracker: Option<&mut ProgressTracker<'_>>,
) -> Result<Vec<Placement>> {
    let overflow = || AtlasError::PackingOverflow {
        charts: extents.len(),
        width: options.width,
        height: options.height,
        gutter: options.gutter,
    };

    let mut order: Vec<usize> = (0..extents.len()).collect();
    order.sort_by(|&a, &b| {
        let area = |i: usize| extents[i].0 * extents[i].1;
        area(b).total_cmp(&area(a)).then(a.cmp(&b))
    });

    let mut best = try_pack(extents, &order, 0.0, options).ok_or_else(overflow)?;

    let g = options.gutter as f64;
    let (avail_w, avail_h) = (options.width as f64 - g, options.height as f64 - g);
    let total_area: f64 = extents.iter().map(|(w, h)| w * h).sum();
    let longest = extents.iter().map(|(w, h)| w.max(*h)).fold(0.0, f64::max);
    let by_area = if total_area > 0.0 {
        (avail_w * avail_h / total_area).sqrt()
    } else {
        f64::INFINITY
    };
    let by_side = if longest > 0.0 {
        avail_w.max(avail_h) / longest
    } else {
        f64::INFINITY
    };
    let mut hi = by_area.min(by_side);
    if !hi.is_finite() {
        hi = 1.0;
    }

    let mut lo = 0.0;
    if let Some(placements) = try_pack(extents, &order, hi, options) {
        lo = hi;
        best = placements;
    } else {
        for step in 0..SCALE_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            match try_pack(extents, &order, mid, options) {
                Some(placements) => {
                    lo = mid;
                    best = placements;
                }
                None => hi = mid,
            }
            if let Some(t) = tracker.as_deref_mut() {
                t.update_stage(0.8, 0.95, step + 1, SCALE_ITERATIONS)?;
            }
        }
    }

    if lo <= 0.0 || (longest > 0.0 && longest * lo < MIN_CHART_TEXELS) {
        return Err(overflow());
    }

    debug!("pack: {} charts at {:.4} texels per unit", extents.len(), lo);
    Ok(best)
}
