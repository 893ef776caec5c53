//! Segment-interval formulation.
//!
//! One indicator `b_s` per segment selects the active piece and a local
//! offset `f_s ∈ [0, 1]` (with `f_s <= b_s`) walks along it:
//!
//! ```text
//!   x = Σ_s  x_lo(s)·b_s + (x_hi(s) - x_lo(s))·f_s
//!   y = Σ_s  y_lo(s)·b_s + (y_hi(s) - y_lo(s))·f_s
//!   Σ_s b_s = 1
//! ```
//!
//! A jump has no width to walk. Unless the whole vertical span is admitted,
//! it gets no offset and its indicator pins `y` to the jump's anchor value.

use super::{Emitter, Encoder, Encoding};
use crate::config::{Formulation, JumpValues};
use crate::segments::SegmentTable;
use pwl_core::LinearExpr;
use tracing::trace;

pub(crate) struct IntervalEncoder {
    jumps: JumpValues,
}

impl IntervalEncoder {
    pub(crate) fn new(jumps: JumpValues) -> Self {
        Self { jumps }
    }
}

impl Encoder for IntervalEncoder {
    fn formulation(&self) -> Formulation {
        Formulation::Interval
    }

    fn encode(&self, table: &SegmentTable, em: &mut Emitter<'_>) -> Encoding {
        let mut x_expr = LinearExpr::zero();
        let mut y_expr = LinearExpr::zero();
        let mut pick = LinearExpr::zero();

        for (s, seg) in table.segments().iter().enumerate() {
            let b = em.indicator(&format!("b{}", s));
            pick.add_term(b, 1.0);
            x_expr.add_term(b, seg.x_lo);

            if seg.is_jump && self.jumps == JumpValues::Endpoints {
                trace!(segment = s, x = seg.x_lo, y = seg.anchor_y(), "jump anchor");
                y_expr.add_term(b, seg.anchor_y());
                continue;
            }

            let f = em.weight(&format!("f{}", s));
            y_expr.add_term(b, seg.y_lo);
            x_expr.add_term(f, seg.width());
            y_expr.add_term(f, seg.y_hi - seg.y_lo);
            em.le(
                &format!("off{}", s),
                LinearExpr::from(f) - LinearExpr::from(b),
                0.0,
            );
        }

        Encoding {
            x_expr,
            y_expr,
            unit_rows: vec![("pick".to_string(), pick)],
        }
    }
}
