//! Core library for fieldmap
//!
//! This crate implements the **Functional Core** of the fieldmap
//! pipeline, following the Functional Core - Imperative Shell pattern:
//! pure transformation functions with zero I/O, deterministic and
//! testable with fixture data alone.
//!
//! - [`classify`]: the two-tier field classifier -- deterministic
//!   heuristics, batched prompt building, AI response parsing, and the
//!   Tier-1 -> Tier-2 fallback combinator.
//! - [`template`]: reusable field templates and compile-time value
//!   resolution.
//!
//! I/O (PDF parsing, the AI provider round-trip, template persistence)
//! lives in the `pdfform` and `fieldmap` crates, which feed data through
//! these functions.

pub mod classify;
pub mod template;
