use crate::{
    error::Error,
    group::GroupKey,
    position::Position,
    traits::{Positioned, SequenceStore},
};
use serde::{Deserialize, Serialize};

///
/// ShiftDirection
///
/// Canonical direction of a bulk sibling shift, shared by the shift engine,
/// the store surface, and metrics.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ShiftDirection {
    /// Increment positions by one (opens a slot).
    Up,
    /// Decrement positions by one (closes a gap).
    Down,
}

///
/// ShiftRange
///
/// Half-open position range `[from, to)`; an absent `to` means "to the end of
/// the sequence". Empty ranges are legal and shift nothing.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ShiftRange {
    from: Position,
    to: Option<Position>,
}

impl ShiftRange {
    /// `[from, end)`
    #[must_use]
    pub const fn starting_at(from: Position) -> Self {
        Self { from, to: None }
    }

    /// `[from, to)`
    #[must_use]
    pub const fn between(from: Position, to: Position) -> Self {
        Self { from, to: Some(to) }
    }

    #[must_use]
    pub const fn start(&self) -> Position {
        self.from
    }

    #[must_use]
    pub const fn end(&self) -> Option<Position> {
        self.to
    }

    #[must_use]
    pub fn contains(&self, position: Position) -> bool {
        position >= self.from && self.to.is_none_or(|to| position < to)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to.is_some_and(|to| to <= self.from)
    }
}

///
/// ShiftOp
/// One bulk mutation: direction plus the affected range.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ShiftOp {
    pub direction: ShiftDirection,
    pub range: ShiftRange,
}

impl ShiftOp {
    #[must_use]
    pub const fn up(range: ShiftRange) -> Self {
        Self {
            direction: ShiftDirection::Up,
            range,
        }
    }

    #[must_use]
    pub const fn down(range: ShiftRange) -> Self {
        Self {
            direction: ShiftDirection::Down,
            range,
        }
    }
}

///
/// GroupScope
///
/// Sequence query facade: the host store narrowed to one group, with the
/// mutated row's key threaded through every shift so a row never shifts
/// itself. Built against either the row's current group or its original
/// (pre-change) group.
///

pub struct GroupScope<'s, S, R: Positioned> {
    store: &'s mut S,
    group: GroupKey,
    exclude: Option<R::Key>,
    start: Position,
}

impl<'s, S, R> GroupScope<'s, S, R>
where
    S: SequenceStore<R>,
    R: Positioned,
{
    #[must_use]
    pub fn new(store: &'s mut S, group: GroupKey, exclude: Option<R::Key>, start: Position) -> Self {
        Self {
            store,
            group,
            exclude,
            start,
        }
    }

    pub fn count(&self) -> Result<u64, Error> {
        self.store.count(&self.group)
    }

    pub fn max_position(&self) -> Result<Option<Position>, Error> {
        self.store.max_position(&self.group)
    }

    /// Position a newly appended row would take: one past the current max,
    /// or the configured start when the group is empty.
    pub fn end_position(&self) -> Result<Position, Error> {
        Ok(self
            .max_position()?
            .map_or(self.start, |max| max + 1))
    }

    /// Open a slot: `position += 1` for every sibling in `range`.
    pub fn shift_up(&mut self, range: ShiftRange) -> Result<u64, Error> {
        self.shift(ShiftOp::up(range))
    }

    /// Close a gap: `position -= 1` for every sibling in `range`.
    pub fn shift_down(&mut self, range: ShiftRange) -> Result<u64, Error> {
        self.shift(ShiftOp::down(range))
    }

    fn shift(&mut self, op: ShiftOp) -> Result<u64, Error> {
        if op.range.is_empty() {
            return Ok(0);
        }

        self.store.shift(&self.group, op, self.exclude)
    }
}

///
/// TESTS
///
