#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Seeded procedural level generation for gridvault.
//!
//! [`rng::LevelRng`] is the only entropy source in the workspace and is
//! reseeded from the level seed at every episode boundary. [`maze`] turns
//! that stream into a bordered grid of cell markers that game variants copy
//! into the world during population.

pub mod maze;
pub mod rng;
