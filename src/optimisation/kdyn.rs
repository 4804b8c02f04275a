//! The k-dyn core reformulation: a refuted core is replaced by a cascade of
//! cardinality constraints of bounded fan-out over fresh relaxation
//! variables. A weight-free connector variable carries each chunk's
//! discharge into the next.

use log::debug;

use crate::basic_types::ConstraintOperationError;
use crate::basic_types::Literal;
use crate::engine::SatSolver;
use crate::propagation::PropagatorId;
use crate::torrone_assert_simple;

/// The branching factor bounding the size of each cardinality constraint.
fn branching_factor(core_size: usize) -> f64 {
    if core_size <= 2 {
        8.0
    } else {
        16.0 * (core_size as f64).log10()
    }
}

/// Rewrite the core given by its soft literals (`members`, the literals the
/// solver failed to satisfy together) into cardinality constraints over
/// fresh relaxation variables. Returns the relaxation literals; each of them
/// becomes a new soft of the core's weight.
///
/// Each chunk of `p` members gets `p − 1` relaxation variables and the
/// constraint `Σ members + Σ ¬rⱼ ≥ p − 1`: the first falsification within
/// the chunk is free, every further one must be paid by a relaxation.
/// Between chunks a connector variable keeps the overall discount single:
/// the connector is true only when its chunk is untouched, and it joins the
/// next chunk as an ordinary member, so only the first touched chunk gets
/// the free falsification. Consecutive relaxations are symmetry-broken by
/// `¬rⱼ ∨ rⱼ₊₁`.
pub(crate) fn reformulate(
    solver: &mut SatSolver,
    cardinality: PropagatorId,
    members: &[Literal],
) -> Result<Vec<Literal>, ConstraintOperationError> {
    let core_size = members.len();
    torrone_assert_simple!(core_size >= 1);
    if core_size == 1 {
        // The single literal's weight is already paid; there is nothing to
        // relax.
        return Ok(Vec::new());
    }

    let factor = branching_factor(core_size);
    let num_constraints =
        (((2 * core_size) as f64) / (factor - 2.0)).ceil().max(1.0) as usize;
    let group_size = ((2 * core_size - 1 + 2 * (num_constraints - 1)) as f64
        / (2 * num_constraints) as f64)
        .ceil() as usize;
    debug!(
        "k-dyn over a core of {core_size}: {num_constraints} constraints of group size {group_size}"
    );

    let mut new_softs: Vec<Literal> = Vec::new();
    let mut connector: Option<Literal> = None;
    let mut consumed = 0usize;

    while consumed < core_size {
        let mut chunk: Vec<Literal> = Vec::new();
        if let Some(carried) = connector.take() {
            chunk.push(carried);
        }
        while chunk.len() < group_size && consumed < core_size {
            chunk.push(members[consumed]);
            consumed += 1;
        }

        let chunk_size = chunk.len();
        if chunk_size == 1 {
            continue;
        }
        let bound = (chunk_size - 1) as i64;
        let is_last_chunk = consumed == core_size;

        let mut constraint_literals = chunk.clone();
        let mut previous: Option<Literal> = None;
        for _ in 0..chunk_size - 1 {
            let relaxation = Literal::new(solver.new_variable(), true);
            if let Some(previous) = previous {
                solver.add_clause(vec![!previous, relaxation])?;
            }
            constraint_literals.push(!relaxation);
            new_softs.push(relaxation);
            previous = Some(relaxation);
        }

        if !is_last_chunk {
            // The connector stays weight-free: it only signals whether this
            // chunk is still untouched, granting or revoking the next
            // chunk's free falsification.
            let carried = Literal::new(solver.new_variable(), true);
            for &member in &chunk {
                solver.add_clause(vec![!carried, member])?;
            }
            connector = Some(carried);
        }

        let weights = vec![1i64; constraint_literals.len()];
        solver.add_weight_constraint_ge(cardinality, constraint_literals, weights, bound)?;
    }

    Ok(new_softs)
}

#[cfg(test)]
mod tests {
    use super::branching_factor;

    #[test]
    fn chunk_arithmetic_covers_the_whole_core() {
        for core_size in 2..200usize {
            let factor = branching_factor(core_size);
            let num_constraints =
                (((2 * core_size) as f64) / (factor - 2.0)).ceil().max(1.0) as usize;
            let group_size = ((2 * core_size - 1 + 2 * (num_constraints - 1)) as f64
                / (2 * num_constraints) as f64)
                .ceil() as usize;

            // Every chunk consumes at least one fresh core literal besides
            // the connector, so the rewrite always terminates.
            assert!(group_size >= 2, "degenerate group size for {core_size}");
        }
    }
}
