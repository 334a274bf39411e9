use crate::{
    error::Error,
    group::GroupKey,
    model::SequenceModel,
    obs::sink::{self, MetricsEvent},
    position::Position,
    scope::{GroupScope, ShiftDirection, ShiftRange},
    traits::{Positioned, SequenceStore},
};

///
/// Transition
///
/// One row mutation as seen after it persisted: the old and new placement of
/// the row. The shift engine derives the sibling shifts purely from this.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Transition {
    Insert {
        group: GroupKey,
        position: Position,
        terminal: bool,
    },
    Update {
        old_group: GroupKey,
        new_group: GroupKey,
        old_position: Position,
        new_position: Position,
        terminal: bool,
    },
    Delete {
        group: GroupKey,
        position: Position,
    },
}

///
/// ShiftPlan
///
/// The bulk mutations restoring density after a transition. `Relocate` keeps
/// the close-gap leg structurally first: its range is computed against the
/// pre-change position and must not be perturbed by the open-slot leg.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ShiftPlan {
    None,
    /// Slide `[range)` right by one in `group` to make room.
    OpenSlot { group: GroupKey, range: ShiftRange },
    /// Slide `[range)` left by one in `group` to close a hole.
    CloseGap { group: GroupKey, range: ShiftRange },
    /// Group change: close the gap left in the original group, then open a
    /// slot in the new group unless the row landed at its end.
    Relocate {
        origin: GroupKey,
        close: ShiftRange,
        open: Option<(GroupKey, ShiftRange)>,
    },
}

/// Derive the shift plan for a transition.
///
/// Every arm mirrors one row of the state table:
/// - insert before the end opens `[new, end)`
/// - insert at the end displaces nobody
/// - moving right closes `(old, new]`, moving left opens `[new, old)`
/// - a group change closes `(old, end)` in the origin, then opens
///   `[new, end)` in the target unless terminal
/// - delete closes `(pos, end)`
#[must_use]
pub fn plan(transition: Transition) -> ShiftPlan {
    match transition {
        Transition::Insert { terminal: true, .. } => ShiftPlan::None,
        Transition::Insert {
            group,
            position,
            terminal: false,
        } => ShiftPlan::OpenSlot {
            group,
            range: ShiftRange::starting_at(position),
        },

        Transition::Update {
            old_group,
            new_group,
            old_position,
            new_position,
            terminal,
        } => {
            if old_group != new_group {
                ShiftPlan::Relocate {
                    origin: old_group,
                    close: ShiftRange::starting_at(old_position + 1),
                    open: (!terminal)
                        .then(|| (new_group, ShiftRange::starting_at(new_position))),
                }
            } else if new_position > old_position {
                ShiftPlan::CloseGap {
                    group: new_group,
                    range: ShiftRange::between(old_position + 1, new_position + 1),
                }
            } else if new_position < old_position {
                ShiftPlan::OpenSlot {
                    group: new_group,
                    range: ShiftRange::between(new_position, old_position),
                }
            } else {
                ShiftPlan::None
            }
        }

        Transition::Delete { group, position } => ShiftPlan::CloseGap {
            group,
            range: ShiftRange::starting_at(position + 1),
        },
    }
}

/// Apply a plan through the group facade, returning total rows shifted.
pub(crate) fn apply<S, R>(
    store: &mut S,
    model: &SequenceModel,
    exclude: Option<R::Key>,
    plan: ShiftPlan,
) -> Result<u64, Error>
where
    S: SequenceStore<R>,
    R: Positioned,
{
    match plan {
        ShiftPlan::None => Ok(0),
        ShiftPlan::OpenSlot { group, range } => {
            apply_leg::<S, R>(store, model, exclude, group, ShiftDirection::Up, range)
        }
        ShiftPlan::CloseGap { group, range } => {
            apply_leg::<S, R>(store, model, exclude, group, ShiftDirection::Down, range)
        }
        ShiftPlan::Relocate {
            origin,
            close,
            open,
        } => {
            // Close-before-open: the close range is anchored to the
            // pre-change position.
            let mut rows =
                apply_leg::<S, R>(store, model, exclude, origin, ShiftDirection::Down, close)?;
            if let Some((group, range)) = open {
                rows +=
                    apply_leg::<S, R>(store, model, exclude, group, ShiftDirection::Up, range)?;
            }

            Ok(rows)
        }
    }
}

fn apply_leg<S, R>(
    store: &mut S,
    model: &SequenceModel,
    exclude: Option<R::Key>,
    group: GroupKey,
    direction: ShiftDirection,
    range: ShiftRange,
) -> Result<u64, Error>
where
    S: SequenceStore<R>,
    R: Positioned,
{
    let mut scope: GroupScope<'_, S, R> = GroupScope::new(store, group, exclude, model.start);
    let rows = match direction {
        ShiftDirection::Up => scope.shift_up(range)?,
        ShiftDirection::Down => scope.shift_down(range)?,
    };

    sink::record(MetricsEvent::ShiftApplied {
        model_path: model.path,
        direction,
        rows,
    });

    Ok(rows)
}

///
/// TESTS
///
