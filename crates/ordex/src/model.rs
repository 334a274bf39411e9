use crate::{error::Error, position::Position};

/// Default name of the host column holding the position.
pub const DEFAULT_POSITION_FIELD: &str = "position";

///
/// SequenceModel
/// Static per-row-type configuration consumed by the sequencer runtime.
///

#[derive(Clone, Copy, Debug)]
pub struct SequenceModel {
    /// Fully-qualified row-type path (for dispatch and diagnostics).
    pub path: &'static str,
    /// Host field holding the position value.
    pub position_field: &'static str,
    /// First position of every sequence.
    pub start: Position,
    /// Host fields forming the group key, in tuple order. Empty = ungrouped.
    pub group_fields: &'static [&'static str],
    /// Whether the host should order result sets by position by default.
    pub order_by_position: bool,
}

impl SequenceModel {
    #[must_use]
    pub const fn new(path: &'static str) -> Self {
        Self {
            path,
            position_field: DEFAULT_POSITION_FIELD,
            start: 0,
            group_fields: &[],
            order_by_position: false,
        }
    }

    #[must_use]
    pub const fn with_position_field(mut self, field: &'static str) -> Self {
        self.position_field = field;
        self
    }

    #[must_use]
    pub const fn with_start(mut self, start: Position) -> Self {
        self.start = start;
        self
    }

    #[must_use]
    pub const fn with_group_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.group_fields = fields;
        self
    }

    #[must_use]
    pub const fn ordered(mut self) -> Self {
        self.order_by_position = true;
        self
    }

    #[must_use]
    pub const fn is_grouped(&self) -> bool {
        !self.group_fields.is_empty()
    }

    /// Validate declared facts. Hosts call this once at wiring time; the
    /// runtime itself never re-checks.
    pub fn validate(&self) -> Result<(), Error> {
        if self.group_fields.len() > crate::MAX_GROUP_FIELDS {
            return Err(Error::policy_unsupported(format!(
                "{}: group key exceeds {} fields ({})",
                self.path,
                crate::MAX_GROUP_FIELDS,
                self.group_fields.len()
            )));
        }
        if self.start < 0 {
            return Err(Error::policy_unsupported(format!(
                "{}: start position must be non-negative, got {}",
                self.path, self.start
            )));
        }

        Ok(())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_ungrouped_zero_start() {
        let model = SequenceModel::new("demo::Page");
        assert_eq!(model.position_field, DEFAULT_POSITION_FIELD);
        assert_eq!(model.start, 0);
        assert!(!model.is_grouped());
        assert!(!model.order_by_position);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn builders_compose() {
        let model = SequenceModel::new("demo::Chapter")
            .with_position_field("sort_order")
            .with_start(1)
            .with_group_fields(&["book_id"])
            .ordered();
        assert_eq!(model.position_field, "sort_order");
        assert_eq!(model.start, 1);
        assert!(model.is_grouped());
        assert!(model.order_by_position);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn validate_rejects_oversized_group_key() {
        let model = SequenceModel::new("demo::Wide")
            .with_group_fields(&["a", "b", "c", "d", "e"]);
        let err = model.validate().expect_err("five group fields should fail");
        assert_eq!(err.class, crate::error::ErrorClass::Unsupported);
    }

    #[test]
    fn validate_rejects_negative_start() {
        let model = SequenceModel::new("demo::Neg").with_start(-1);
        assert!(model.validate().is_err());
    }
}
