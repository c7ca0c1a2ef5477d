//! Shared primitive types and ecosystem constants for the milestone buyback chain.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod assets;
pub mod ecosystem;

pub use assets::*;
pub use ecosystem::*;
