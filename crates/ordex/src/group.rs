use crate::value::Value;
use derive_more::{Deref, IntoIterator};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// GroupKey
///
/// Ordered tuple of scalar values partitioning a sequence into independent
/// groups. Two rows are siblings iff their group keys are equal; the empty
/// tuple is the single group of an ungrouped model.
///
/// Field order is significant: the tuple is built in the model's declared
/// group-field order, so positional equality is the siblinghood contract.
///

#[derive(
    Clone, Debug, Default, Deref, Deserialize, Eq, Hash, IntoIterator, Ord, PartialEq, PartialOrd,
    Serialize,
)]
#[into_iterator(owned, ref)]
pub struct GroupKey(Vec<Value>);

impl GroupKey {
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// The single group shared by every row of an ungrouped model.
    #[must_use]
    pub const fn ungrouped() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub const fn is_ungrouped(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Value> for GroupKey {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, ")")
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_positional() {
        let left = GroupKey::from_iter([Value::from("fiction"), Value::from(1i64)]);
        let right = GroupKey::from_iter([Value::from(1i64), Value::from("fiction")]);
        assert_ne!(left, right, "group key equality must respect field order");
        assert_eq!(
            left,
            GroupKey::from_iter([Value::from("fiction"), Value::from(1i64)])
        );
    }

    #[test]
    fn ungrouped_is_the_empty_tuple() {
        assert!(GroupKey::ungrouped().is_ungrouped());
        assert_eq!(GroupKey::default(), GroupKey::ungrouped());
        assert!(!GroupKey::from_iter([Value::None]).is_ungrouped());
    }

    #[test]
    fn display_renders_tuple_form() {
        let key = GroupKey::from_iter([Value::from("shelf"), Value::from(2u64)]);
        assert_eq!(key.to_string(), "(shelf, 2)");
        assert_eq!(GroupKey::ungrouped().to_string(), "()");
    }

    #[test]
    fn derefs_to_its_values() {
        let key = GroupKey::from_iter([Value::from("shelf"), Value::from(2u64)]);
        assert_eq!(key.len(), 2);
        assert_eq!(
            (&key).into_iter().count(),
            2,
            "borrowed iteration visits every element"
        );
    }
}
