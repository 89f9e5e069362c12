//! Integer codecs shared by the index entry format and posting lists:
//! variable-size integers, bit-packed delta runs and frequency folding.

pub mod frequency;
pub mod pfor;
pub mod varint;
