use std::cmp::Ordering;

use super::{alphanumeric::compare_alphanumeric, spatial::SpatialOptions};

/// How the sorted field stores its terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchCompareFieldType {
    Sequence,
    Integer,
    Floating,
    Alphanumeric,
    Spatial,
}

/// Orders two present values of the sorted field.
///
/// Comparers only see entries that hold a value; entries without one sort after
/// every other entry in both directions.
pub trait MatchComparer {
    fn field_type(&self) -> MatchCompareFieldType;

    /// Applies the sort direction to an ascending ordering.
    fn orient(&self, ascending: Ordering) -> Ordering;

    /// Terms must be decoded before comparing; compact keys cannot be compared
    /// as stored.
    fn requires_decoding(&self) -> bool {
        false
    }

    fn compare_sequence(&self, x: &[u8], y: &[u8]) -> Ordering {
        self.orient(x.cmp(y))
    }

    fn compare_numerical<T: PartialOrd>(&self, x: T, y: T) -> Ordering {
        self.orient(x.partial_cmp(&y).unwrap_or(Ordering::Equal))
    }

    fn spatial(&self) -> Option<&SpatialOptions> {
        None
    }

    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy)]
pub struct AscendingMatchComparer {
    field_type: MatchCompareFieldType,
}

impl AscendingMatchComparer {
    pub fn new(field_type: MatchCompareFieldType) -> Self {
        AscendingMatchComparer { field_type }
    }
}

impl MatchComparer for AscendingMatchComparer {
    fn field_type(&self) -> MatchCompareFieldType {
        self.field_type
    }

    fn orient(&self, ascending: Ordering) -> Ordering {
        ascending
    }

    fn name(&self) -> &'static str {
        "Ascending"
    }
}

/// The negation of [`AscendingMatchComparer`].
#[derive(Debug, Clone, Copy)]
pub struct DescendingMatchComparer {
    field_type: MatchCompareFieldType,
}

impl DescendingMatchComparer {
    pub fn new(field_type: MatchCompareFieldType) -> Self {
        DescendingMatchComparer { field_type }
    }
}

impl MatchComparer for DescendingMatchComparer {
    fn field_type(&self) -> MatchCompareFieldType {
        self.field_type
    }

    fn orient(&self, ascending: Ordering) -> Ordering {
        ascending.reverse()
    }

    fn name(&self) -> &'static str {
        "Descending"
    }
}

/// Natural order: digit runs compare by numeric value.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlphanumericMatchComparer {
    descending: bool,
}

impl AlphanumericMatchComparer {
    pub fn ascending() -> Self {
        AlphanumericMatchComparer { descending: false }
    }

    pub fn descending() -> Self {
        AlphanumericMatchComparer { descending: true }
    }
}

impl MatchComparer for AlphanumericMatchComparer {
    fn field_type(&self) -> MatchCompareFieldType {
        MatchCompareFieldType::Alphanumeric
    }

    fn orient(&self, ascending: Ordering) -> Ordering {
        if self.descending {
            ascending.reverse()
        } else {
            ascending
        }
    }

    fn requires_decoding(&self) -> bool {
        true
    }

    fn compare_sequence(&self, x: &[u8], y: &[u8]) -> Ordering {
        self.orient(compare_alphanumeric(x, y))
    }

    fn name(&self) -> &'static str {
        if self.descending {
            "AlphanumericDescending"
        } else {
            "AlphanumericAscending"
        }
    }
}

/// Orders entries by their distance to a point.
#[derive(Debug, Clone)]
pub struct SpatialMatchComparer {
    options: SpatialOptions,
    descending: bool,
}

impl SpatialMatchComparer {
    pub fn ascending(options: SpatialOptions) -> Self {
        SpatialMatchComparer {
            options,
            descending: false,
        }
    }

    pub fn descending(options: SpatialOptions) -> Self {
        SpatialMatchComparer {
            options,
            descending: true,
        }
    }
}

impl MatchComparer for SpatialMatchComparer {
    fn field_type(&self) -> MatchCompareFieldType {
        MatchCompareFieldType::Spatial
    }

    fn orient(&self, ascending: Ordering) -> Ordering {
        if self.descending {
            ascending.reverse()
        } else {
            ascending
        }
    }

    fn requires_decoding(&self) -> bool {
        true
    }

    fn spatial(&self) -> Option<&SpatialOptions> {
        Some(&self.options)
    }

    fn name(&self) -> &'static str {
        if self.descending {
            "SpatialDescending"
        } else {
            "SpatialAscending"
        }
    }
}
