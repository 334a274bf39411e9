//! Dense position maintenance for grouped, ordered rows.
//!
//! ordex keeps a zero-based, gap-free integer ordering over the rows of a
//! table (optionally partitioned into independent groups) consistent under
//! insert, move, group-change, and delete, by translating each row mutation
//! into the minimal set of bulk sibling shifts. It is a library
//! consumed by a persistence layer: the host supplies row attribute access,
//! dirty tracking, and a group-scoped storage surface, and calls the
//! sequencer from its lifecycle event dispatch inside its own transaction.
#![warn(unreachable_pub)]

pub mod assign;
pub mod contracts;
pub mod error;
pub mod group;
pub mod lifecycle;
pub mod mem;
pub mod model;
pub mod obs;
pub mod position;
pub mod scope;
pub mod shift;
pub mod traits;
pub mod value;

///
/// CONSTANTS
///

/// Maximum number of fields allowed in a group key.
///
/// Keeps group tuples bounded so sibling filters stay cheap and model
/// declarations stay honest.
pub const MAX_GROUP_FIELDS: usize = 4;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, sequencers, stores, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        group::GroupKey,
        model::SequenceModel,
        position::Position,
        traits::{Positioned, SequenceAudit, SequenceStore},
        value::Value,
    };
}
