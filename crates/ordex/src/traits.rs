use crate::{
    error::Error,
    group::GroupKey,
    position::Position,
    scope::ShiftOp,
};
use std::fmt::Debug;

// ============================================================================
// ROW CAPABILITY
// ============================================================================
//
// `Positioned` is the capability a host row type grants the sequencer: typed
// access to the position and group attributes plus the dirty-tracking facts
// the lifecycle needs. It is consumed through generics, never inheritance.
//

///
/// Positioned
///
/// ## Semantics
/// - `position()` is the current attribute value; `None` means the caller has
///   not assigned one and the assignment policy decides.
/// - `*_dirty` reports a pending, unsaved difference from the loaded value.
/// - `*_changed` reports the difference recorded by the save that just
///   committed; hosts sync it during their persist step, before firing the
///   after-update event.
/// - `original_*` return the pre-save values until the host syncs originals,
///   which must happen after the after-event fires.
/// - `terminal` is transient save-time state owned by the sequencer; hosts
///   only store it on the row instance, never persist it.
///

pub trait Positioned {
    /// Storage representation of the primary key. `None` until first persisted.
    type Key: Copy + Debug + Eq + Ord + 'static;

    fn key(&self) -> Option<Self::Key>;

    fn position(&self) -> Option<Position>;
    fn set_position(&mut self, position: Position);
    fn group_key(&self) -> GroupKey;

    /// True once the row has been persisted.
    fn exists(&self) -> bool;

    fn position_dirty(&self) -> bool;
    fn position_changed(&self) -> bool;
    fn original_position(&self) -> Option<Position>;

    fn group_dirty(&self) -> bool;
    fn group_changed(&self) -> bool;
    fn original_group_key(&self) -> GroupKey;

    fn terminal(&self) -> bool;
    fn set_terminal(&mut self, terminal: bool);
}

// ============================================================================
// HOST STORAGE
// ============================================================================

///
/// SequenceStore
///
/// Minimal group-scoped storage surface the host provides. Every shift is a
/// single bulk mutation over the stored rows of one group; `exclude` carries
/// the primary key of the row being mutated so it never shifts itself.
///
/// The store is only ever called from inside the caller's transaction/lock
/// scope; it performs no serialization of its own.
///

pub trait SequenceStore<R: Positioned> {
    /// Number of stored rows in the group.
    fn count(&self, group: &GroupKey) -> Result<u64, Error>;

    /// Highest stored position in the group, `None` when the group is empty.
    fn max_position(&self, group: &GroupKey) -> Result<Option<Position>, Error>;

    /// Bulk-shift every stored row of `group` whose position falls in the
    /// op's range, skipping `exclude`. Returns the number of rows touched.
    fn shift(
        &mut self,
        group: &GroupKey,
        op: ShiftOp,
        exclude: Option<R::Key>,
    ) -> Result<u64, Error>;
}

///
/// SequenceAudit
///
/// Optional host extension for integration-time contract validation: exposes
/// the raw stored positions of a group so density can be checked exactly.
/// Production code paths never require it.
///

pub trait SequenceAudit<R: Positioned>: SequenceStore<R> {
    /// All stored positions in the group, in ascending order.
    fn positions(&self, group: &GroupKey) -> Result<Vec<Position>, Error>;
}
