use crate::{
    error::Error,
    model::SequenceModel,
    obs::sink::{self, MetricsEvent},
    position::{self, Position},
    scope::GroupScope,
    traits::{Positioned, SequenceStore},
};

///
/// PositionLocker
///
/// External locking strategy overriding automatic end-position assignment.
/// Attached per row type as an explicit sequencer field; there is no global
/// registry. The returned position must be at or above the model's start.
///

pub trait PositionLocker<R: Positioned> {
    /// Pick the position for a row about to be placed into a sequence of
    /// `sequence_len` rows (the count already includes the row itself).
    fn next_position(&self, row: &R, sequence_len: u64) -> Result<Position, Error>;
}

///
/// Assignment
/// Resolved placement for the row about to persist.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Assignment {
    pub position: Position,
    /// The row lands exactly at the current end of its group.
    pub terminal: bool,
}

/// Resolve the position a row should persist with, or `None` when the save
/// touches neither position nor group and assignment has nothing to do.
///
/// Decision order per placement:
/// 1. an explicit caller value wins (negative values resolve from the end);
/// 2. otherwise a registered locker picks the position;
/// 3. otherwise the row appends at `max + 1` (or `start` in an empty group).
///
/// A value that resolves below `start` re-resolves once against the group
/// size and then saturates at `start`; out-of-range input is clamped, never
/// rejected.
pub(crate) fn assign<S, R>(
    model: &SequenceModel,
    locker: Option<&dyn PositionLocker<R>>,
    store: &mut S,
    row: &R,
) -> Result<Option<Assignment>, Error>
where
    S: SequenceStore<R>,
    R: Positioned,
{
    let inserting = !row.exists();
    let group_changing = !inserting && row.group_dirty();
    if !inserting && !group_changing && !row.position_dirty() {
        return Ok(None);
    }

    // The stored count misses the row whenever it is not yet a member of the
    // target group (genuine insert, or hopping groups).
    let scope: GroupScope<'_, S, R> =
        GroupScope::new(store, row.group_key(), row.key(), model.start);
    let stored = scope.count()?;
    let len = stored + u64::from(inserting || group_changing);

    // A pending position only counts as explicit when the caller set it for
    // this placement; a stale position carried across a group change does not.
    let explicit = if group_changing && !row.position_dirty() {
        None
    } else {
        row.position()
    };

    let raw = match explicit {
        Some(raw) => raw,
        None => {
            if let Some(locker) = locker {
                sink::record(MetricsEvent::LockerInvoked {
                    model_path: model.path,
                });
                let picked = locker.next_position(row, len)?;
                if picked < model.start {
                    return Err(Error::policy_unsupported(format!(
                        "{}: locker returned {picked}, below sequence start {}",
                        model.path, model.start
                    )));
                }

                picked
            } else {
                scope.end_position()?
            }
        }
    };

    let mut resolved = if raw < 0 {
        position::resolve(raw, len)
    } else {
        raw
    };
    if resolved < model.start {
        // Under-range input re-resolves against the group size once, then
        // saturates at the sequence start.
        resolved = resolved
            .saturating_add(i64::try_from(len).unwrap_or(Position::MAX))
            .max(model.start);
    }

    Ok(Some(Assignment {
        position: resolved,
        terminal: position::is_terminal(resolved, len),
    }))
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        group::GroupKey,
        mem::{MemRow, MemStore},
    };

    fn model() -> SequenceModel {
        SequenceModel::new("assign::tests::Row")
    }

    fn seeded_store(positions: &[Position]) -> MemStore {
        let mut store = MemStore::new();
        for position in positions {
            let key = store.allocate_key();
            store.put(key, GroupKey::ungrouped(), *position);
        }

        store
    }

    #[test]
    fn insert_without_position_appends() {
        let mut store = seeded_store(&[0, 1, 2]);
        let row = MemRow::new(GroupKey::ungrouped());

        let assignment = assign(&model(), None, &mut store, &row)
            .expect("assign")
            .expect("insert always assigns");
        assert_eq!(assignment.position, 3);
        assert!(assignment.terminal);
    }

    #[test]
    fn insert_into_empty_group_starts_at_start() {
        let mut store = MemStore::new();
        let row = MemRow::new(GroupKey::ungrouped());

        let assignment = assign(&model().with_start(1), None, &mut store, &row)
            .expect("assign")
            .expect("insert always assigns");
        assert_eq!(assignment.position, 1);
        assert!(assignment.terminal);
    }

    #[test]
    fn negative_one_resolves_to_new_last_slot() {
        let mut store = seeded_store(&[0, 1]);
        let row = MemRow::at(GroupKey::ungrouped(), -1);

        let assignment = assign(&model(), None, &mut store, &row)
            .expect("assign")
            .expect("insert always assigns");
        // Count includes the inserted row: 3 rows, last slot is 2.
        assert_eq!(assignment.position, 2);
        assert!(assignment.terminal);
    }

    #[test]
    fn explicit_interior_position_is_not_terminal() {
        let mut store = seeded_store(&[0, 1, 2]);
        let row = MemRow::at(GroupKey::ungrouped(), 1);

        let assignment = assign(&model(), None, &mut store, &row)
            .expect("assign")
            .expect("insert always assigns");
        assert_eq!(assignment.position, 1);
        assert!(!assignment.terminal);
    }

    #[test]
    fn under_range_negative_clamps_by_re_resolution() {
        let mut store = seeded_store(&[0, 1]);
        // Three rows once inserted; -7 resolves to -4, re-resolves to -1,
        // then saturates at start.
        let row = MemRow::at(GroupKey::ungrouped(), -7);

        let assignment = assign(&model(), None, &mut store, &row)
            .expect("assign")
            .expect("insert always assigns");
        assert_eq!(assignment.position, 0);
        assert!(!assignment.terminal);
    }

    #[test]
    fn clean_update_assigns_nothing() {
        let mut store = MemStore::new();
        let mut row = MemRow::at(GroupKey::ungrouped(), 0);
        let key = store.allocate_key();
        row.adopt_key(key);
        store.put(key, GroupKey::ungrouped(), 0);
        row.mark_persisted();
        row.sync_original();

        let assignment = assign(&model(), None, &mut store, &row).expect("assign");
        assert!(assignment.is_none());
    }

    struct FixedLocker(Position);

    impl PositionLocker<MemRow> for FixedLocker {
        fn next_position(&self, _row: &MemRow, _sequence_len: u64) -> Result<Position, Error> {
            Ok(self.0)
        }
    }

    #[test]
    fn locker_overrides_end_assignment() {
        let mut store = seeded_store(&[0, 1, 2]);
        let row = MemRow::new(GroupKey::ungrouped());

        let assignment = assign(&model(), Some(&FixedLocker(1)), &mut store, &row)
            .expect("assign")
            .expect("insert always assigns");
        assert_eq!(assignment.position, 1);
        assert!(!assignment.terminal);
    }

    #[test]
    fn locker_below_start_is_a_contract_breach() {
        let mut store = MemStore::new();
        let row = MemRow::new(GroupKey::ungrouped());

        let err = assign(&model().with_start(1), Some(&FixedLocker(0)), &mut store, &row)
            .expect_err("locker below start must fail");
        assert_eq!(err.class, crate::error::ErrorClass::Unsupported);
    }
}
