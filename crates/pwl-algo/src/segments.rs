//! Breakpoint validation and segment tables
//!
//! Turns a raw breakpoint sequence into ordered blocks of segments.
//!
//! ```text
//!   x: 0   1   1.5  |gap|  2   3   3   4
//!   y: 2   1   1    |gap|  1   1   2   3
//!
//!   block 0: (0,2)-(1,1)  (1,1)-(1.5,1)
//!   block 1: (2,1)-(3,1)  (3,1)-(3,2) jump  (3,2)-(4,3)
//! ```
//!
//! Points are flattened (gaps removed) and every segment refers to its two
//! endpoints by flattened index, so encoders can address breakpoint weights
//! and segment indicators with the same table.

use pwl_core::{PwlError, PwlResult};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::debug;

/// One element of the input sequence: a breakpoint or an excluded-range marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Point { x: f64, y: f64 },
    Gap,
}

impl Breakpoint {
    pub fn point(x: f64, y: f64) -> Self {
        Breakpoint::Point { x, y }
    }

    pub fn is_gap(&self) -> bool {
        matches!(self, Breakpoint::Gap)
    }
}

/// Zip aligned x/y sequences where `None` marks a gap.
///
/// Both sequences must have the same length and carry `None` at the same
/// positions.
pub fn breakpoints_from_options(
    x_points: &[Option<f64>],
    y_points: &[Option<f64>],
) -> PwlResult<Vec<Breakpoint>> {
    if x_points.len() != y_points.len() {
        return Err(PwlError::InputShape(format!(
            "x_points and y_points have different lengths ({} vs {})",
            x_points.len(),
            y_points.len()
        )));
    }

    x_points
        .iter()
        .zip(y_points)
        .enumerate()
        .map(|(i, pair)| match pair {
            (Some(x), Some(y)) => Ok(Breakpoint::point(*x, *y)),
            (None, None) => Ok(Breakpoint::Gap),
            _ => Err(PwlError::InputShape(format!(
                "gap markers are misaligned at position {}: x and y must both be gaps or both be values",
                i
            ))),
        })
        .collect()
}

/// Zip gap-free x/y sequences.
pub fn breakpoints_from_xy(x_points: &[f64], y_points: &[f64]) -> PwlResult<Vec<Breakpoint>> {
    if x_points.len() != y_points.len() {
        return Err(PwlError::InputShape(format!(
            "x_points and y_points have different lengths ({} vs {})",
            x_points.len(),
            y_points.len()
        )));
    }
    Ok(x_points
        .iter()
        .zip(y_points)
        .map(|(x, y)| Breakpoint::point(*x, *y))
        .collect())
}

/// Maximal run of breakpoints without an intervening gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: usize,
    /// Flattened point indices
    pub points: Range<usize>,
    /// Segment indices
    pub segments: Range<usize>,
}

/// Linear piece joining two consecutive breakpoints of a block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub block: usize,
    /// Flattened index of the left endpoint; the right endpoint is `lo + 1`
    pub lo: usize,
    pub x_lo: f64,
    pub x_hi: f64,
    pub y_lo: f64,
    pub y_hi: f64,
    /// Vertical break (`x_lo == x_hi`)
    pub is_jump: bool,
    /// Last segment of its block
    pub closes_block: bool,
}

impl Segment {
    pub fn hi(&self) -> usize {
        self.lo + 1
    }

    pub fn width(&self) -> f64 {
        self.x_hi - self.x_lo
    }

    /// Slope of the piece; a jump has none and reports 0.
    pub fn slope(&self) -> f64 {
        if self.is_jump {
            0.0
        } else {
            (self.y_hi - self.y_lo) / (self.x_hi - self.x_lo)
        }
    }

    /// Endpoint a jump selects when only endpoint values are admitted.
    ///
    /// The other endpoint is always covered by the neighbouring non-jump
    /// segment: a jump closing its block selects its upper point, any other
    /// jump its lower one.
    pub fn anchor(&self) -> usize {
        if self.closes_block {
            self.hi()
        } else {
            self.lo
        }
    }

    pub fn anchor_y(&self) -> f64 {
        if self.closes_block {
            self.y_hi
        } else {
            self.y_lo
        }
    }

    /// Linear interpolation inside the segment (no range check).
    pub fn interpolate(&self, x: f64) -> f64 {
        if self.is_jump {
            self.y_lo
        } else {
            self.y_lo + (x - self.x_lo) / self.width() * (self.y_hi - self.y_lo)
        }
    }
}

/// How two consecutive flattened points relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Ordinary piece with positive width
    Piece(usize),
    /// Vertical piece
    Jump(usize),
    /// The points sit on either side of an excluded range
    Gap,
}

/// Validated blocks and segments of a piecewise-linear function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentTable {
    points: Vec<(f64, f64)>,
    blocks: Vec<Block>,
    segments: Vec<Segment>,
}

impl SegmentTable {
    /// Validate the breakpoint sequence and partition it into blocks.
    ///
    /// # Errors
    ///
    /// - [`PwlError::InputShape`]: fewer than 2 elements, leading/trailing or
    ///   consecutive gaps, a block with a single point, non-finite values,
    ///   decreasing x inside a block, or a block not strictly right of the
    ///   previous one
    /// - [`PwlError::AmbiguousDiscontinuity`]: an x value occurring 3+ times
    /// - [`PwlError::DegenerateSegment`]: a block whose points share one x
    pub fn build(breakpoints: &[Breakpoint]) -> PwlResult<Self> {
        if breakpoints.len() < 2 {
            return Err(PwlError::InputShape(
                "piecewise linear functions require at least 2 points".into(),
            ));
        }
        if breakpoints[0].is_gap() || breakpoints[breakpoints.len() - 1].is_gap() {
            return Err(PwlError::InputShape(
                "breakpoints cannot start or end with a gap".into(),
            ));
        }

        let mut raw_blocks: Vec<Vec<(f64, f64)>> = vec![Vec::new()];
        for (i, bp) in breakpoints.iter().enumerate() {
            match *bp {
                Breakpoint::Point { x, y } => {
                    if !x.is_finite() || !y.is_finite() {
                        return Err(PwlError::InputShape(format!(
                            "breakpoint {} is not finite: ({}, {})",
                            i, x, y
                        )));
                    }
                    if let Some(block) = raw_blocks.last_mut() {
                        block.push((x, y));
                    }
                }
                Breakpoint::Gap => {
                    if breakpoints[i - 1].is_gap() {
                        return Err(PwlError::InputShape(format!(
                            "consecutive gaps at positions {} and {}",
                            i - 1,
                            i
                        )));
                    }
                    raw_blocks.push(Vec::new());
                }
            }
        }

        for (k, block) in raw_blocks.iter().enumerate() {
            if block.len() < 2 {
                return Err(PwlError::InputShape(format!(
                    "block {} has a single breakpoint; every block needs at least 2",
                    k
                )));
            }
            if let Some(w) = block.windows(2).find(|w| w[1].0 < w[0].0) {
                return Err(PwlError::InputShape(format!(
                    "x values must be non-decreasing within a block (block {}: {} after {})",
                    k, w[1].0, w[0].0
                )));
            }
            if k > 0 {
                let prev_last = raw_blocks[k - 1][raw_blocks[k - 1].len() - 1].0;
                if block[0].0 <= prev_last {
                    return Err(PwlError::InputShape(format!(
                        "a value following a gap must be strictly greater than the value preceding it ({} <= {})",
                        block[0].0, prev_last
                    )));
                }
            }
        }

        for block in &raw_blocks {
            let mut run = 1;
            for w in block.windows(2) {
                if w[1].0 == w[0].0 {
                    run += 1;
                    if run > 2 {
                        return Err(PwlError::AmbiguousDiscontinuity {
                            x: w[1].0,
                            occurrences: block.iter().filter(|p| p.0 == w[1].0).count(),
                        });
                    }
                } else {
                    run = 1;
                }
            }
        }

        for (k, block) in raw_blocks.iter().enumerate() {
            if block[0].0 == block[block.len() - 1].0 {
                return Err(PwlError::DegenerateSegment {
                    block: k,
                    x: block[0].0,
                });
            }
        }

        let mut points = Vec::new();
        let mut blocks = Vec::with_capacity(raw_blocks.len());
        let mut segments = Vec::new();
        for (k, raw) in raw_blocks.into_iter().enumerate() {
            let first_point = points.len();
            let first_segment = segments.len();
            let n = raw.len();
            for (i, w) in raw.windows(2).enumerate() {
                let ((x_lo, y_lo), (x_hi, y_hi)) = (w[0], w[1]);
                segments.push(Segment {
                    block: k,
                    lo: first_point + i,
                    x_lo,
                    x_hi,
                    y_lo,
                    y_hi,
                    is_jump: x_lo == x_hi,
                    closes_block: i + 2 == n,
                });
            }
            points.extend(raw);
            blocks.push(Block {
                index: k,
                points: first_point..points.len(),
                segments: first_segment..segments.len(),
            });
        }

        debug!(
            points = points.len(),
            blocks = blocks.len(),
            segments = segments.len(),
            jumps = segments.iter().filter(|s| s.is_jump).count(),
            "built segment table"
        );

        Ok(Self {
            points,
            blocks,
            segments,
        })
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn num_jumps(&self) -> usize {
        self.segments.iter().filter(|s| s.is_jump).count()
    }

    pub fn first_segment(&self) -> &Segment {
        &self.segments[0]
    }

    pub fn last_segment(&self) -> &Segment {
        &self.segments[self.segments.len() - 1]
    }

    /// Segments having point `p` as an endpoint (one or two).
    pub fn segments_at(&self, p: usize) -> impl Iterator<Item = usize> {
        let block = self
            .blocks
            .iter()
            .find(|b| b.points.contains(&p))
            .cloned();
        let (before, after) = match block {
            Some(b) => {
                let offset = p - b.points.start;
                let seg = b.segments.start + offset;
                (
                    (offset > 0).then(|| seg - 1),
                    (p + 1 < b.points.end).then_some(seg),
                )
            }
            None => (None, None),
        };
        before.into_iter().chain(after)
    }

    /// Relation of every pair of consecutive flattened points, in order.
    pub fn links(&self) -> Vec<Link> {
        let mut out = Vec::with_capacity(self.points.len().saturating_sub(1));
        for block in &self.blocks {
            if block.index > 0 {
                out.push(Link::Gap);
            }
            for s in block.segments.clone() {
                if self.segments[s].is_jump {
                    out.push(Link::Jump(s));
                } else {
                    out.push(Link::Piece(s));
                }
            }
        }
        out
    }

    /// Smallest and largest breakpoint y.
    pub fn y_range(&self) -> (f64, f64) {
        self.points
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| {
                (lo.min(y), hi.max(y))
            })
    }

    /// Values of the function at `x` (two at a jump, none outside the domain).
    pub fn evaluate(&self, x: f64) -> Vec<f64> {
        let mut out: Vec<f64> = Vec::new();
        for seg in &self.segments {
            if seg.is_jump {
                if seg.x_lo == x {
                    out.push(seg.y_lo);
                    out.push(seg.y_hi);
                }
            } else if seg.x_lo <= x && x <= seg.x_hi {
                out.push(seg.interpolate(x));
            }
        }
        out.sort_by(|a, b| a.total_cmp(b));
        out.dedup_by(|a, b| (*a - *b).abs() < 1e-12);
        out
    }
}
