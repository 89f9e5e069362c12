use bitflags::bitflags;

bitflags! {
    /// Shape of a stored field value. `LIST | TUPLE` marks a list whose elements
    /// also carry a long and a double.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct IndexEntryFieldType: u8 {
        const NONE = 1;
        const TUPLE = 1 << 2;
        const LIST = 1 << 3;
        const INVALID = 1 << 6;
    }
}

impl IndexEntryFieldType {
    pub fn is_list(self) -> bool {
        self.contains(IndexEntryFieldType::LIST)
    }

    pub fn is_tuple(self) -> bool {
        self.contains(IndexEntryFieldType::TUPLE)
    }

    /// `true` for a value that is present and not a list.
    pub fn is_scalar(self) -> bool {
        !self.is_list() && !self.contains(IndexEntryFieldType::INVALID)
    }

    pub fn is_absent(self) -> bool {
        self.contains(IndexEntryFieldType::INVALID)
    }
}
