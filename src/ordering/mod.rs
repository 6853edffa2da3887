//! # Chapter Ordering
//!
//! Renumbers an owner's chapters in one atomic batch. Observers never see
//! an intermediate state where two chapters share a number.

mod orderer;

pub use orderer::ChapterOrderer;
