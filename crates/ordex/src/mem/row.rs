use crate::{group::GroupKey, position::Position, traits::Positioned};
use ulid::Ulid;

///
/// MemRow
///
/// Host-side row instance with the attribute/dirty-tracking surface an ORM
/// model would provide: current attributes, originals as of the last
/// load/persist, and the change flags synced by the save pipeline.
///

#[derive(Clone, Debug)]
pub struct MemRow {
    key: Option<Ulid>,
    position: Option<Position>,
    group: GroupKey,
    exists: bool,
    terminal: bool,
    original_position: Option<Position>,
    original_group: GroupKey,
    changed_position: bool,
    changed_group: bool,
}

impl MemRow {
    /// Fresh unsaved row with no position; the assignment policy places it.
    #[must_use]
    pub fn new(group: GroupKey) -> Self {
        Self {
            key: None,
            position: None,
            group: group.clone(),
            exists: false,
            terminal: false,
            original_position: None,
            original_group: group,
            changed_position: false,
            changed_group: false,
        }
    }

    /// Fresh unsaved row with an explicit caller position (may be negative).
    #[must_use]
    pub fn at(group: GroupKey, position: Position) -> Self {
        let mut row = Self::new(group);
        row.position = Some(position);

        row
    }

    pub fn set_group(&mut self, group: GroupKey) {
        self.group = group;
    }

    // ======================================================================
    // Host pipeline plumbing
    // ======================================================================

    pub fn adopt_key(&mut self, key: Ulid) {
        self.key = Some(key);
    }

    pub fn mark_persisted(&mut self) {
        self.exists = true;
    }

    pub fn mark_deleted(&mut self) {
        self.exists = false;
    }

    /// Sync the `*_changed` flags from the pending dirty state. The host
    /// calls this right after its persist step, before firing after-events.
    pub fn record_changes(&mut self) {
        self.changed_position = self.position != self.original_position;
        self.changed_group = self.group != self.original_group;
    }

    /// Overwrite originals with current attributes. The host calls this
    /// after the after-events fired; until then `original_*` report the
    /// pre-save values.
    pub fn sync_original(&mut self) {
        self.original_position = self.position;
        self.original_group = self.group.clone();
    }
}

impl Positioned for MemRow {
    type Key = Ulid;

    fn key(&self) -> Option<Ulid> {
        self.key
    }

    fn position(&self) -> Option<Position> {
        self.position
    }

    fn set_position(&mut self, position: Position) {
        self.position = Some(position);
    }

    fn group_key(&self) -> GroupKey {
        self.group.clone()
    }

    fn exists(&self) -> bool {
        self.exists
    }

    fn position_dirty(&self) -> bool {
        self.position != self.original_position
    }

    fn position_changed(&self) -> bool {
        self.changed_position
    }

    fn original_position(&self) -> Option<Position> {
        self.original_position
    }

    fn group_dirty(&self) -> bool {
        self.group != self.original_group
    }

    fn group_changed(&self) -> bool {
        self.changed_group
    }

    fn original_group_key(&self) -> GroupKey {
        self.original_group.clone()
    }

    fn terminal(&self) -> bool {
        self.terminal
    }

    fn set_terminal(&mut self, terminal: bool) {
        self.terminal = terminal;
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn group(tag: &str) -> GroupKey {
        GroupKey::from_iter([Value::from(tag)])
    }

    #[test]
    fn dirty_tracks_pending_difference_from_original() {
        let mut row = MemRow::at(group("a"), 2);
        row.sync_original();
        assert!(!row.position_dirty());

        row.set_position(5);
        assert!(row.position_dirty());
        assert_eq!(row.original_position(), Some(2));
    }

    #[test]
    fn record_changes_snapshots_the_save_delta() {
        let mut row = MemRow::at(group("a"), 0);
        row.sync_original();

        row.set_group(group("b"));
        row.record_changes();
        assert!(row.group_changed());
        assert!(!row.position_changed());
        assert_eq!(row.original_group_key(), group("a"));

        row.sync_original();
        assert!(!row.group_dirty());
        assert_eq!(row.original_group_key(), group("b"));
    }
}
