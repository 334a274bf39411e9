use crate::{
    error::Error,
    group::GroupKey,
    mem::MemRow,
    position::Position,
    scope::{ShiftDirection, ShiftOp},
    traits::{SequenceAudit, SequenceStore},
};
use std::collections::BTreeMap;
use ulid::Ulid;

///
/// StoredRow
/// Persisted attributes of one row: what a table row would hold.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoredRow {
    pub group: GroupKey,
    pub position: Position,
}

///
/// MemStore
///
/// BTreeMap-backed storage with deterministic key allocation. Writes are
/// whole-row puts; shifts are one pass over the map, the in-memory analogue
/// of a single set-based UPDATE.
///

#[derive(Clone, Debug, Default)]
pub struct MemStore {
    rows: BTreeMap<Ulid, StoredRow>,
    next_key: u128,
}

impl MemStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_key: 0,
        }
    }

    /// Deterministic, monotonically increasing key.
    pub fn allocate_key(&mut self) -> Ulid {
        self.next_key += 1;

        Ulid::from_parts(0, self.next_key)
    }

    pub fn put(&mut self, key: Ulid, group: GroupKey, position: Position) {
        self.rows.insert(key, StoredRow { group, position });
    }

    pub fn remove(&mut self, key: &Ulid) -> Option<StoredRow> {
        self.rows.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &Ulid) -> Option<&StoredRow> {
        self.rows.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ulid, &StoredRow)> {
        self.rows.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl SequenceStore<MemRow> for MemStore {
    fn count(&self, group: &GroupKey) -> Result<u64, Error> {
        let n = self.rows.values().filter(|row| row.group == *group).count();

        Ok(u64::try_from(n).unwrap_or(u64::MAX))
    }

    fn max_position(&self, group: &GroupKey) -> Result<Option<Position>, Error> {
        Ok(self
            .rows
            .values()
            .filter(|row| row.group == *group)
            .map(|row| row.position)
            .max())
    }

    fn shift(
        &mut self,
        group: &GroupKey,
        op: ShiftOp,
        exclude: Option<Ulid>,
    ) -> Result<u64, Error> {
        let delta: Position = match op.direction {
            ShiftDirection::Up => 1,
            ShiftDirection::Down => -1,
        };

        let mut touched = 0u64;
        for (key, row) in &mut self.rows {
            if exclude == Some(*key) || row.group != *group || !op.range.contains(row.position) {
                continue;
            }
            row.position += delta;
            touched += 1;
        }

        Ok(touched)
    }
}

impl SequenceAudit<MemRow> for MemStore {
    fn positions(&self, group: &GroupKey) -> Result<Vec<Position>, Error> {
        let mut positions: Vec<Position> = self
            .rows
            .values()
            .filter(|row| row.group == *group)
            .map(|row| row.position)
            .collect();
        positions.sort_unstable();

        Ok(positions)
    }
}

///
/// TESTS
///
