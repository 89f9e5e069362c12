//! Binary codec for a single index entry: the serialized form of one document's
//! field values.
//!
//! ```text
//! <header: 10 bytes>
//!     length:u32 | known_field_count:u16 (count << 2 | pointer width) | dynamic_table:u32
//! <data section>
//!     raw:        <len:varint><bytes>
//!     tuple:      <type:varint><long:varint><double:f64><len:varint><bytes>
//!     list:       <type:varint><count:varint><length_table_ptr:u32><bytes...><lengths:varint...>
//!     tuple list: <type:varint><count:varint><length_table_ptr:u32><long_table_ptr:u32>
//!                 <doubles:f64...><bytes...><lengths:varint...><longs:varint...>
//! <dynamic field count:u8> <dynamic field pointers:u32...>
//! <known field pointers: 1, 2 or 4 bytes each>
//! ```
//!
//! Known field pointers carry a "typed" flag in their most significant bit; typed
//! values start with a type byte, untyped ones are raw sequences. The all-ones
//! pointer marks an absent field.

pub mod field_type;
pub mod header;
pub mod known_fields;
pub mod numeric;
pub mod reader;
pub mod writer;

#[cfg(test)]
mod tests;

pub use field_type::IndexEntryFieldType;
pub use known_fields::KnownFields;
pub use reader::{FieldItem, FieldIterator, IndexEntryReader};
pub use writer::{IndexEntryWriter, ListFieldWriter};
