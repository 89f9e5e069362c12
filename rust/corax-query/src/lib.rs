//! Lazy id streams ("matches") over the postings and stored entries of an index.
//!
//! Every node of a query tree implements [`match_protocol::QueryMatch`]: it can
//! `fill` a caller buffer with ascending ids or intersect (`and_with`) a buffer
//! of candidates in place. Leaves are [`term_match::TermMatch`]es; combinators
//! intersect or unite two matches, union terms, filter on stored values, sort
//! and memoize. Scratch buffers come from [`buffers_pool`] and go back on drop.

pub mod binary;
pub mod buffers_pool;
pub mod config;
pub mod growable_buffer;
pub mod match_protocol;
pub mod memoization;
pub mod merge;
pub mod multi_term;
pub mod scoring;
pub mod searcher;
pub mod sorting;
pub mod term_match;
pub mod term_provider;
pub mod terms_reader;
pub mod unary;

#[cfg(test)]
mod tests;

pub use config::QueryConfig;
pub use match_protocol::{Confidence, QueryInspectionNode, QueryMatch};
pub use searcher::IndexSearcher;
