//! Unbounded extension of the outermost segments.
//!
//! An open end becomes one more candidate piece: a ray `r >= 0` with its own
//! indicator `b` in the exclusivity set.
//!
//! ```text
//!   left:   x += x_0·b - r      y += y_0·b - m_0·r
//!   right:  x += x_n·b + r      y += y_n·b + m_n·r
//! ```
//!
//! `b` joins every unit row, so an active ray zeroes the encoder's own
//! indicators (and weights). `r` must vanish while `b = 0`: whenever the
//! model accepts SOS sets it is paired with `1 - b` in an SOS1 set, whatever
//! the indicator exclusivity, so the ray is unbounded. Models without SOS
//! support get `r <= ray_limit·b` instead, which caps how far the ray reaches.

use super::{BoundaryEnd, BoundaryRay, Emitter, Encoding};
use crate::config::EncodingConfig;
use crate::segments::SegmentTable;
use pwl_core::{LinearExpr, SosKind, VarSpec};
use tracing::{debug, warn};

/// Add a ray for every end left open by `config`.
pub(crate) fn extend(
    table: &SegmentTable,
    config: &EncodingConfig,
    encoding: &mut Encoding,
    em: &mut Emitter<'_>,
) -> Vec<BoundaryRay> {
    let mut rays = Vec::new();
    if !config.endpoints.bound_left {
        rays.push(add_ray(table, BoundaryEnd::Left, config.ray_limit, encoding, em));
    }
    if !config.endpoints.bound_right {
        rays.push(add_ray(table, BoundaryEnd::Right, config.ray_limit, encoding, em));
    }
    rays
}

fn add_ray(
    table: &SegmentTable,
    end: BoundaryEnd,
    ray_limit: f64,
    encoding: &mut Encoding,
    em: &mut Emitter<'_>,
) -> BoundaryRay {
    let points = table.points();
    let (x0, y0, slope, direction) = match end {
        BoundaryEnd::Left => {
            let (x, y) = points[0];
            (x, y, table.first_segment().slope(), -1.0)
        }
        BoundaryEnd::Right => {
            let (x, y) = points[points.len() - 1];
            (x, y, table.last_segment().slope(), 1.0)
        }
    };

    let ray = em.declare(&format!("ray_{}", end), VarSpec::non_negative());
    let indicator = em.indicator(&format!("ray_{}_on", end));

    for (_, row) in encoding.unit_rows.iter_mut() {
        row.add_term(indicator, 1.0);
    }
    encoding.x_expr.add_term(indicator, x0);
    encoding.x_expr.add_term(ray, direction);
    encoding.y_expr.add_term(indicator, y0);
    encoding.y_expr.add_term(ray, direction * slope);

    if em.has_sos() {
        let off = em.declare(&format!("ray_{}_off", end), VarSpec::unit_interval());
        em.eq(
            &format!("ray_{}_pair", end),
            LinearExpr::from(off) + LinearExpr::from(indicator),
            1.0,
        );
        em.sos(&format!("ray_{}_gate", end), SosKind::Sos1, &[ray, off]);
    } else {
        warn!(
            %end,
            ray_limit,
            "model has no native SOS support; boundary ray limited to ray_limit past the end breakpoint"
        );
        em.le(
            &format!("ray_{}_gate", end),
            LinearExpr::from(ray) - LinearExpr::term(indicator, ray_limit),
            0.0,
        );
    }

    debug!(%end, x = x0, y = y0, slope, "added boundary ray");
    BoundaryRay {
        end,
        ray,
        indicator,
        slope,
    }
}
