use crate::{
    assign::{self, PositionLocker},
    error::Error,
    model::SequenceModel,
    obs::sink::{self, ExecKind, MetricsEvent, Span},
    position::{self, Position},
    shift::{self, Transition},
    traits::{Positioned, SequenceStore},
};
use std::{cell::Cell, marker::PhantomData};

///
/// MoveOutcome
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MoveOutcome {
    Moved,
    /// Target equals the current position; nothing was written.
    Unchanged,
}

///
/// Sequencer
///
/// Lifecycle coordinator: the host's event dispatch calls the four hook
/// entry points around its own persist step, and the sequencer keeps every
/// group's sequence dense. The sequencer holds no state across calls beyond
/// its configuration and the scoped shifting switch.
///
/// Hook contract (host side):
/// - `before_save` runs before the row persists, with dirty attributes
///   still pending;
/// - `after_insert` / `after_update` run after the persist commits, with
///   `*_changed` synced and `original_*` still reporting pre-save values;
/// - `after_delete` runs after the row is removed, with its pre-delete
///   attributes intact.
///

pub struct Sequencer<S, R: Positioned> {
    model: SequenceModel,
    locker: Option<Box<dyn PositionLocker<R>>>,
    shifting: Cell<bool>,
    _marker: PhantomData<S>,
}

impl<S, R> Sequencer<S, R>
where
    S: SequenceStore<R>,
    R: Positioned,
{
    // ======================================================================
    // Construction & configuration
    // ======================================================================

    #[must_use]
    pub const fn new(model: SequenceModel) -> Self {
        Self {
            model,
            locker: None,
            shifting: Cell::new(true),
            _marker: PhantomData,
        }
    }

    /// Attach an external position-locking strategy, replacing automatic
    /// end-position assignment.
    #[must_use]
    pub fn with_locker(mut self, locker: impl PositionLocker<R> + 'static) -> Self {
        self.locker = Some(Box::new(locker));
        self
    }

    #[must_use]
    pub const fn model(&self) -> &SequenceModel {
        &self.model
    }

    #[must_use]
    pub fn shifting_enabled(&self) -> bool {
        self.shifting.get()
    }

    /// Disable sibling shifting until the returned guard drops. Used by
    /// `swap`; hosts can use it for their own direct-write maintenance.
    #[must_use]
    pub fn suspend_shifting(&self) -> ShiftSuspension<'_> {
        let prev = self.shifting.replace(false);

        ShiftSuspension {
            flag: &self.shifting,
            prev,
        }
    }

    // ======================================================================
    // Lifecycle hooks
    // ======================================================================

    /// Resolve the position the row should persist with (assignment policy
    /// plus negative/under-range normalization) and stamp the terminal flag.
    pub fn before_save(&self, store: &mut S, row: &mut R) -> Result<(), Error> {
        let _span = Span::new(ExecKind::Assign, self.model.path);

        let Some(assignment) = assign::assign(&self.model, self.locker.as_deref(), store, row)?
        else {
            return Ok(());
        };

        row.set_position(assignment.position);
        row.set_terminal(assignment.terminal);
        sink::record(MetricsEvent::PositionAssigned {
            model_path: self.model.path,
            terminal: assignment.terminal,
        });

        Ok(())
    }

    /// Open a slot for a freshly inserted row, unless it landed at the end.
    pub fn after_insert(&self, store: &mut S, row: &R) -> Result<u64, Error> {
        if !self.shifting.get() {
            return Ok(0);
        }

        let mut span = Span::new(ExecKind::Insert, self.model.path);
        let position = self.require_position(row)?;
        let plan = shift::plan(Transition::Insert {
            group: row.group_key(),
            position,
            terminal: row.terminal(),
        });

        let rows = shift::apply::<S, R>(store, &self.model, row.key(), plan)?;
        span.set_rows(rows);

        Ok(rows)
    }

    /// Re-densify around a persisted position or group change; no-op when
    /// the save touched neither.
    pub fn after_update(&self, store: &mut S, row: &R) -> Result<u64, Error> {
        if !self.shifting.get() {
            return Ok(0);
        }

        let group_changed = row.group_changed();
        if !group_changed && !row.position_changed() {
            return Ok(0);
        }

        let mut span = Span::new(ExecKind::Update, self.model.path);
        let new_position = self.require_position(row)?;
        let old_position = row.original_position().ok_or_else(|| {
            Error::lifecycle_invariant(format!(
                "{}: updated row has no original position",
                self.model.path
            ))
        })?;
        let old_group = if group_changed {
            row.original_group_key()
        } else {
            row.group_key()
        };

        let plan = shift::plan(Transition::Update {
            old_group,
            new_group: row.group_key(),
            old_position,
            new_position,
            terminal: row.terminal(),
        });

        let rows = shift::apply::<S, R>(store, &self.model, row.key(), plan)?;
        span.set_rows(rows);

        Ok(rows)
    }

    /// Close the gap left by a removed row. The row is already gone from the
    /// store, so no exclusion is threaded through the shift.
    pub fn after_delete(&self, store: &mut S, row: &R) -> Result<u64, Error> {
        if !self.shifting.get() {
            return Ok(0);
        }

        let mut span = Span::new(ExecKind::Delete, self.model.path);
        let position = self.require_position(row)?;
        let plan = shift::plan(Transition::Delete {
            group: row.group_key(),
            position,
        });

        let rows = shift::apply::<S, R>(store, &self.model, None, plan)?;
        span.set_rows(rows);

        Ok(rows)
    }

    // ======================================================================
    // Convenience operations
    // ======================================================================

    /// Move a persisted row to `raw` (negative addresses from the end) and
    /// persist it through the host `save` pipeline. No write happens when
    /// the resolved target equals the current position.
    ///
    /// Targets past the current end are the caller's responsibility, exactly
    /// as explicit out-of-range saves are.
    pub fn move_to<F>(
        &self,
        store: &mut S,
        row: &mut R,
        raw: Position,
        save: F,
    ) -> Result<MoveOutcome, Error>
    where
        F: FnOnce(&mut S, &mut R) -> Result<(), Error>,
    {
        let _span = Span::new(ExecKind::Move, self.model.path);

        if !row.exists() {
            return Err(Error::lifecycle_invariant(format!(
                "{}: move target row is not persisted",
                self.model.path
            )));
        }
        let current = self.require_position(row)?;

        let len = store.count(&row.group_key())?;
        if position::resolve(raw, len) == current {
            return Ok(MoveOutcome::Unchanged);
        }

        // Store the raw value; the assignment policy in before_save is the
        // single place negatives resolve.
        row.set_position(raw);
        save(store, row)?;

        Ok(MoveOutcome::Moved)
    }

    /// Move a persisted row to the start of its sequence.
    pub fn move_to_start<F>(&self, store: &mut S, row: &mut R, save: F) -> Result<MoveOutcome, Error>
    where
        F: FnOnce(&mut S, &mut R) -> Result<(), Error>,
    {
        self.move_to(store, row, self.model.start, save)
    }

    /// Move a persisted row to the end of its sequence.
    pub fn move_to_end<F>(&self, store: &mut S, row: &mut R, save: F) -> Result<MoveOutcome, Error>
    where
        F: FnOnce(&mut S, &mut R) -> Result<(), Error>,
    {
        self.move_to(store, row, -1, save)
    }

    /// Exchange two sibling rows' positions directly: shifting is suspended
    /// for the duration, both rows are saved, and no siblings are touched.
    pub fn swap<F>(&self, store: &mut S, a: &mut R, b: &mut R, mut save: F) -> Result<(), Error>
    where
        F: FnMut(&mut S, &mut R) -> Result<(), Error>,
    {
        let _span = Span::new(ExecKind::Swap, self.model.path);

        if !a.exists() || !b.exists() {
            return Err(Error::lifecycle_invariant(format!(
                "{}: swap requires both rows persisted",
                self.model.path
            )));
        }
        if a.group_key() != b.group_key() {
            return Err(Error::lifecycle_invariant(format!(
                "{}: swap across groups {} and {} would break density",
                self.model.path,
                a.group_key(),
                b.group_key()
            )));
        }

        let pos_a = self.require_position(a)?;
        let pos_b = self.require_position(b)?;

        let _guard = self.suspend_shifting();
        a.set_position(pos_b);
        b.set_position(pos_a);
        save(store, a)?;
        save(store, b)?;

        Ok(())
    }

    fn require_position(&self, row: &R) -> Result<Position, Error> {
        row.position().ok_or_else(|| {
            Error::lifecycle_invariant(format!("{}: row has no position", self.model.path))
        })
    }
}

///
/// ShiftSuspension
/// Guard restoring the previous shifting switch on drop, including unwind.
///

pub struct ShiftSuspension<'a> {
    flag: &'a Cell<bool>,
    prev: bool,
}

impl Drop for ShiftSuspension<'_> {
    fn drop(&mut self) {
        self.flag.set(self.prev);
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::{MemRow, MemStore};

    fn sequencer() -> Sequencer<MemStore, MemRow> {
        Sequencer::new(SequenceModel::new("lifecycle::tests::Row"))
    }

    #[test]
    fn suspension_nests_and_restores() {
        let seq = sequencer();
        assert!(seq.shifting_enabled());

        {
            let _outer = seq.suspend_shifting();
            assert!(!seq.shifting_enabled());
            {
                let _inner = seq.suspend_shifting();
                assert!(!seq.shifting_enabled());
            }
            assert!(!seq.shifting_enabled());
        }

        assert!(seq.shifting_enabled());
    }

    #[test]
    fn hooks_are_inert_while_suspended() {
        let seq = sequencer();
        let mut store = MemStore::new();
        let mut row = MemRow::new(crate::group::GroupKey::ungrouped());
        row.adopt_key(store.allocate_key());
        row.set_position(0);
        row.mark_persisted();

        let _guard = seq.suspend_shifting();
        let rows = seq
            .after_insert(&mut store, &row)
            .expect("suspended hook succeeds");
        assert_eq!(rows, 0);
    }

    #[test]
    fn move_on_unsaved_row_is_an_invariant_breach() {
        let seq = sequencer();
        let mut store = MemStore::new();
        let mut row = MemRow::new(crate::group::GroupKey::ungrouped());

        let err = seq
            .move_to(&mut store, &mut row, 0, |_, _| Ok(()))
            .expect_err("unsaved row cannot move");
        assert_eq!(err.origin, crate::error::ErrorOrigin::Lifecycle);
    }
}
