//! Executable host-integration contracts.
//!
//! The sequencer trusts the host's scoped store: a store that miscounts,
//! leaks shifts across groups, or fails to exclude the mutated row corrupts
//! sequences silently. These checks make the density contract testable at
//! integration time; production paths never call them.

use crate::{
    error::Error,
    group::GroupKey,
    model::SequenceModel,
    position::Position,
    traits::{Positioned, SequenceAudit},
};

/// Verify that `group` holds exactly the positions
/// `{start, …, start + count - 1}`.
///
/// Any broken density here means a host contract was violated (or the caller
/// skipped external serialization, per the concurrency contract): the
/// sequencer restores density before every lifecycle entry point returns.
pub fn verify_density<S, R>(
    store: &S,
    model: &SequenceModel,
    group: &GroupKey,
) -> Result<(), Error>
where
    S: SequenceAudit<R>,
    R: Positioned,
{
    let positions = store.positions(group)?;
    if let Some(defect) = first_defect(&positions, model.start) {
        return Err(Error::store_invariant(format!(
            "{}: group {group} breaks density: {defect} (positions: {positions:?})",
            model.path
        )));
    }

    Ok(())
}

/// First density defect in an ascending position list, as a description.
fn first_defect(positions: &[Position], start: Position) -> Option<String> {
    for (rank, position) in positions.iter().enumerate() {
        let expected = start + i64::try_from(rank).unwrap_or(Position::MAX);
        if *position != expected {
            return Some(format!(
                "expected {expected} at rank {rank}, found {position}"
            ));
        }
    }

    None
}

///
/// TESTS
///
