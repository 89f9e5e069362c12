//! Read contracts of the page store the query layer consumes, with in-memory
//! implementations.
//!
//! The transactional store itself (B-trees, compact prefix trees, the container
//! allocator) lives elsewhere; this crate models only the narrow surface that
//! searching needs:
//!
//! - [`fixed_size_tree::FixedSizeTree`]: result id to fixed-width value
//! - [`container::ContainerStore`]: container id to an item and its page metadata
//! - [`key_dictionary::KeyDictionary`]: compact key encoding per page
//! - [`posting_list`]: PFOR-compressed posting lists and their iterators
//! - [`lookup`]: ordered numeric term lookups
//! - [`postings::PostingStore`]: term resolution and posting retrieval

pub mod container;
pub mod fixed_size_tree;
pub mod key_dictionary;
pub mod lookup;
pub mod posting_list;
pub mod postings;
