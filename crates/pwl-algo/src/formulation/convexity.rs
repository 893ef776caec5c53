//! Breakpoint-convexity formulation.
//!
//! Every flattened breakpoint `p` gets a weight `λ_p ∈ [0, 1]` and the input
//! and output are the weighted sums `x = Σ x_p·λ_p`, `y = Σ y_p·λ_p` with
//! `Σ λ_p = 1`. What differs between the adjacency modes is how the
//! nonzero weights are kept on one segment:
//!
//! - [`Adjacency::Segment`]: one indicator `z_s` per segment, `Σ z_s = 1`
//!   and `λ_p <= Σ { z_s : p is an endpoint of s }`.
//! - [`Adjacency::Logarithmic`]: SOS2 over the weight chain with
//!   ⌈log2(n - 1)⌉ binaries assigned by reflected Gray code.
//! - [`Adjacency::NativeSos2`]: the chain is handed to the model as an SOS2
//!   set.
//!
//! The chain links consecutive flattened points, so it also links the last
//! point of a block to the first point of the next one. The SOS2 modes cut
//! such links (and jump links when only endpoint values are admitted) with
//! one selector each: `λ_j <= s`, `λ_{j+1} <= 1 - s`.

use super::{Emitter, Encoder, Encoding};
use crate::config::{Adjacency, Formulation, JumpValues};
use crate::segments::{Link, SegmentTable};
use pwl_core::{LinearExpr, SosKind, VarId};
use tracing::trace;

pub(crate) struct ConvexityEncoder {
    jumps: JumpValues,
    adjacency: Adjacency,
}

impl ConvexityEncoder {
    pub(crate) fn new(jumps: JumpValues, adjacency: Adjacency) -> Self {
        Self { jumps, adjacency }
    }

    fn weights(&self, table: &SegmentTable, em: &mut Emitter<'_>) -> Vec<VarId> {
        (0..table.points().len())
            .map(|p| em.weight(&format!("lambda{}", p)))
            .collect()
    }

    fn segment_adjacency(
        &self,
        table: &SegmentTable,
        weights: &[VarId],
        em: &mut Emitter<'_>,
    ) -> LinearExpr {
        let picks: Vec<VarId> = (0..table.segments().len())
            .map(|s| em.indicator(&format!("z{}", s)))
            .collect();

        for (p, &lambda) in weights.iter().enumerate() {
            let mut lhs = LinearExpr::from(lambda);
            for s in table.segments_at(p) {
                let seg = &table.segments()[s];
                if seg.is_jump && self.jumps == JumpValues::Endpoints && seg.anchor() != p {
                    continue;
                }
                lhs.add_term(picks[s], -1.0);
            }
            em.le(&format!("adj{}", p), lhs, 0.0);
        }

        LinearExpr::sum(picks)
    }

    fn logarithmic(&self, table: &SegmentTable, weights: &[VarId], em: &mut Emitter<'_>) {
        let links = table.links().len();
        let codes: Vec<usize> = (0..links).map(gray_code).collect();

        for bit in 0..gray_bits(links) {
            let y = em.selector(&format!("gray{}", bit));
            let mut ones = LinearExpr::zero();
            let mut zeros = LinearExpr::zero();
            for (p, &lambda) in weights.iter().enumerate() {
                let adjacent = chain_links_at(p, links);
                if adjacent.iter().all(|&j| (codes[j] >> bit) & 1 == 1) {
                    ones.add_term(lambda, 1.0);
                }
                if adjacent.iter().all(|&j| (codes[j] >> bit) & 1 == 0) {
                    zeros.add_term(lambda, 1.0);
                }
            }
            em.le(&format!("gray{}_on", bit), ones - LinearExpr::from(y), 0.0);
            em.le(&format!("gray{}_off", bit), zeros + LinearExpr::from(y), 1.0);
        }
    }

    /// Selector per chain link that must not carry two nonzero weights.
    fn cut_forbidden_links(&self, table: &SegmentTable, weights: &[VarId], em: &mut Emitter<'_>) {
        for (j, link) in table.links().into_iter().enumerate() {
            let forbidden = match link {
                Link::Gap => true,
                Link::Jump(_) => self.jumps == JumpValues::Endpoints,
                Link::Piece(_) => false,
            };
            if !forbidden {
                continue;
            }
            trace!(link = j, ?link, "cutting chain link");
            let s = em.selector(&format!("cut{}", j));
            em.le(
                &format!("cut{}_lo", j),
                LinearExpr::from(weights[j]) - LinearExpr::from(s),
                0.0,
            );
            em.le(
                &format!("cut{}_hi", j),
                LinearExpr::from(weights[j + 1]) + LinearExpr::from(s),
                1.0,
            );
        }
    }
}

impl Encoder for ConvexityEncoder {
    fn formulation(&self) -> Formulation {
        Formulation::Convexity
    }

    fn adjacency(&self) -> Option<Adjacency> {
        Some(self.adjacency)
    }

    fn encode(&self, table: &SegmentTable, em: &mut Emitter<'_>) -> Encoding {
        let weights = self.weights(table, em);

        let mut x_expr = LinearExpr::zero();
        let mut y_expr = LinearExpr::zero();
        for (&lambda, &(x, y)) in weights.iter().zip(table.points()) {
            x_expr.add_term(lambda, x);
            y_expr.add_term(lambda, y);
        }

        let mut unit_rows = vec![(
            "weights".to_string(),
            LinearExpr::sum(weights.iter().copied()),
        )];
        match self.adjacency {
            Adjacency::Segment => {
                let picks = self.segment_adjacency(table, &weights, em);
                unit_rows.push(("pick".to_string(), picks));
            }
            Adjacency::Logarithmic => {
                self.logarithmic(table, &weights, em);
                self.cut_forbidden_links(table, &weights, em);
            }
            Adjacency::NativeSos2 => {
                em.sos("chain", SosKind::Sos2, &weights);
                self.cut_forbidden_links(table, &weights, em);
            }
        }

        Encoding {
            x_expr,
            y_expr,
            unit_rows,
        }
    }
}

/// Reflected binary Gray code of `j`.
fn gray_code(j: usize) -> usize {
    j ^ (j >> 1)
}

/// Bits needed to give each of `links` chain links its own code.
fn gray_bits(links: usize) -> usize {
    if links <= 1 {
        0
    } else {
        (usize::BITS - (links - 1).leading_zeros()) as usize
    }
}

/// Chain links having point `p` as an endpoint.
fn chain_links_at(p: usize, links: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(2);
    if p > 0 {
        out.push(p - 1);
    }
    if p < links {
        out.push(p);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formulation::exclusivity::IndicatorMode;
    use crate::segments::{breakpoints_from_options, breakpoints_from_xy};
    use pwl_core::{Model, Sense};

    fn run(table: &SegmentTable, jumps: JumpValues, adjacency: Adjacency) -> (Model, Encoding) {
        let mut model = Model::with_sos();
        let mut em = Emitter::new(&mut model, "c".into(), IndicatorMode::Binary);
        let encoding = ConvexityEncoder::new(jumps, adjacency).encode(table, &mut em);
        let emitted = em.finish();
        for eq in emitted.equations {
            pwl_core::ModelContext::attach_equation(&mut model, eq);
        }
        (model, encoding)
    }

    fn gapped() -> SegmentTable {
        let x = [Some(0.0), Some(1.0), Some(1.5), None, Some(2.0), Some(3.0), Some(3.0), Some(4.0)];
        let y = [Some(2.0), Some(1.0), Some(1.0), None, Some(1.0), Some(1.0), Some(2.0), Some(3.0)];
        SegmentTable::build(&breakpoints_from_options(&x, &y).unwrap()).unwrap()
    }

    #[test]
    fn gray_codes_differ_in_one_bit() {
        for j in 1..64 {
            assert_eq!((gray_code(j) ^ gray_code(j - 1)).count_ones(), 1);
        }
        assert_eq!(gray_bits(1), 0);
        assert_eq!(gray_bits(2), 1);
        assert_eq!(gray_bits(3), 2);
        assert_eq!(gray_bits(4), 2);
        assert_eq!(gray_bits(5), 3);
    }

    #[test]
    fn segment_mode_declares_weight_per_point_and_pick_per_segment() {
        let table = gapped();
        let (model, encoding) = run(&table, JumpValues::Endpoints, Adjacency::Segment);
        assert_eq!(model.num_binaries(), 5);
        assert_eq!(model.variables().len(), 7 + 5);
        assert_eq!(encoding.unit_rows.len(), 2);
        assert_eq!(model.equations().len(), 7);
        assert!(model.equations().iter().all(|e| e.sense == Sense::Le));
    }

    #[test]
    fn jump_only_gates_its_anchor() {
        let table = gapped();
        let (model, _) = run(&table, JumpValues::Endpoints, Adjacency::Segment);
        let z3 = model.variables().iter().find(|v| v.name == "c_z3").unwrap().id;
        // jump (3,1)-(3,2) is segment 3 joining points 4 and 5; anchor is point 4
        let adj4 = model.equations().iter().find(|e| e.name == "c_adj4").unwrap();
        let adj5 = model.equations().iter().find(|e| e.name == "c_adj5").unwrap();
        assert_eq!(adj4.lhs.coefficient(z3), -1.0);
        assert_eq!(adj5.lhs.coefficient(z3), 0.0);

        let (model, _) = run(&table, JumpValues::Span, Adjacency::Segment);
        let adj5 = model.equations().iter().find(|e| e.name == "c_adj5").unwrap();
        assert_eq!(adj5.lhs.coefficient(z3), -1.0);
    }

    #[test]
    fn logarithmic_mode_uses_few_binaries() {
        let x: Vec<f64> = (0..9).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        let table = SegmentTable::build(&breakpoints_from_xy(&x, &y).unwrap()).unwrap();
        let (model, encoding) = run(&table, JumpValues::Endpoints, Adjacency::Logarithmic);
        assert_eq!(model.num_binaries(), 3);
        assert_eq!(encoding.unit_rows.len(), 1);
        assert_eq!(model.equations().len(), 6);
    }

    #[test]
    fn logarithmic_mode_cuts_gaps_and_jumps() {
        let table = gapped();
        let (model, _) = run(&table, JumpValues::Endpoints, Adjacency::Logarithmic);
        // 6 chain links -> 3 gray bits, plus cuts for the gap and the jump
        let cuts: Vec<_> = model
            .variables()
            .iter()
            .filter(|v| v.name.starts_with("c_cut"))
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(cuts, vec!["c_cut2", "c_cut4"]);
        assert_eq!(model.num_binaries(), 5);

        let (model, _) = run(&table, JumpValues::Span, Adjacency::Logarithmic);
        assert_eq!(model.num_binaries(), 4);
    }

    #[test]
    fn native_sos2_records_the_weight_chain() {
        let table = gapped();
        let mut model = Model::with_sos();
        let mut em = Emitter::new(&mut model, "c".into(), IndicatorMode::Binary);
        let encoding = ConvexityEncoder::new(JumpValues::Endpoints, Adjacency::NativeSos2)
            .encode(&table, &mut em);
        let emitted = em.finish();
        assert_eq!(emitted.sos_sets.len(), 1);
        assert_eq!(emitted.sos_sets[0].kind, SosKind::Sos2);
        assert_eq!(emitted.sos_sets[0].members, emitted.continuous);
        assert_eq!(emitted.selectors.len(), 2);
        assert_eq!(encoding.unit_rows.len(), 1);
    }
}
