//! End-to-end tests over the public API: load → canonicalize → optimize →
//! size → save.

mod fixtures;
mod pipeline;
mod portfolio;
