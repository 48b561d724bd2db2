//! Low-level building blocks shared by the indexes and the graph engine.

/// Generation-checked slot storage with a free list.
///
/// Backs every pooled structure: index items, vertices, edges and queue
/// states.
pub mod arena;

/// Bit-string keys and their ordering rules.
pub mod bits;
