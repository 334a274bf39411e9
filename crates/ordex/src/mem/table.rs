use crate::{
    error::Error,
    group::GroupKey,
    lifecycle::{MoveOutcome, Sequencer},
    mem::{MemRow, MemStore, StoredRow},
    model::SequenceModel,
    position::Position,
    traits::Positioned,
};
use ulid::Ulid;

///
/// MemTable
///
/// The host-side pipeline: persists rows into the store and fires the
/// sequencer hooks in contract order (before-save, persist, change sync,
/// after-event, original sync). Real integrations do exactly this from
/// their ORM's event dispatch.
///

pub struct MemTable {
    store: MemStore,
    seq: Sequencer<MemStore, MemRow>,
}

impl MemTable {
    #[must_use]
    pub fn new(model: SequenceModel) -> Self {
        Self::with_sequencer(Sequencer::new(model))
    }

    #[must_use]
    pub const fn with_sequencer(seq: Sequencer<MemStore, MemRow>) -> Self {
        Self {
            store: MemStore::new(),
            seq,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &MemStore {
        &self.store
    }

    #[must_use]
    pub fn store_mut(&mut self) -> &mut MemStore {
        &mut self.store
    }

    #[must_use]
    pub const fn sequencer(&self) -> &Sequencer<MemStore, MemRow> {
        &self.seq
    }

    pub fn save(&mut self, row: &mut MemRow) -> Result<(), Error> {
        save_with(&self.seq, &mut self.store, row)
    }

    pub fn delete(&mut self, row: &mut MemRow) -> Result<(), Error> {
        let key = row
            .key()
            .ok_or_else(|| Error::store_not_found("<unsaved row>"))?;
        self.store
            .remove(&key)
            .ok_or_else(|| Error::store_not_found(key))?;
        self.seq.after_delete(&mut self.store, row)?;
        row.mark_deleted();

        Ok(())
    }

    pub fn move_to(&mut self, row: &mut MemRow, raw: Position) -> Result<MoveOutcome, Error> {
        self.seq.move_to(&mut self.store, row, raw, |store, row| {
            save_with(&self.seq, store, row)
        })
    }

    pub fn move_to_start(&mut self, row: &mut MemRow) -> Result<MoveOutcome, Error> {
        self.seq.move_to_start(&mut self.store, row, |store, row| {
            save_with(&self.seq, store, row)
        })
    }

    pub fn move_to_end(&mut self, row: &mut MemRow) -> Result<MoveOutcome, Error> {
        self.seq.move_to_end(&mut self.store, row, |store, row| {
            save_with(&self.seq, store, row)
        })
    }

    pub fn swap(&mut self, a: &mut MemRow, b: &mut MemRow) -> Result<(), Error> {
        self.seq.swap(&mut self.store, a, b, |store, row| {
            save_with(&self.seq, store, row)
        })
    }

    /// Rows of a group in listing order: by position when the model orders
    /// results, otherwise key order.
    #[must_use]
    pub fn rows_in(&self, group: &GroupKey) -> Vec<(Ulid, StoredRow)> {
        let mut rows: Vec<(Ulid, StoredRow)> = self
            .store
            .iter()
            .filter(|(_, row)| row.group == *group)
            .map(|(key, row)| (*key, row.clone()))
            .collect();
        if self.seq.model().order_by_position {
            rows.sort_by_key(|(_, row)| row.position);
        }

        rows
    }

    #[must_use]
    pub fn position_of(&self, key: Ulid) -> Option<Position> {
        self.store.get(&key).map(|row| row.position)
    }
}

/// One save through the full pipeline. Free function so the sequencer's
/// convenience ops can re-enter it from their `save` closures.
fn save_with(
    seq: &Sequencer<MemStore, MemRow>,
    store: &mut MemStore,
    row: &mut MemRow,
) -> Result<(), Error> {
    let inserting = !row.exists();
    seq.before_save(store, row)?;

    let position = row
        .position()
        .ok_or_else(|| Error::lifecycle_invariant("row has no position after before-save"))?;
    let key = match row.key() {
        Some(key) => key,
        None => {
            let key = store.allocate_key();
            row.adopt_key(key);
            key
        }
    };

    store.put(key, row.group_key(), position);
    row.record_changes();
    if inserting {
        row.mark_persisted();
        seq.after_insert(store, row)?;
    } else {
        seq.after_update(store, row)?;
    }
    row.sync_original();

    Ok(())
}
