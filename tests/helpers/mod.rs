// Shared across test binaries; not every binary uses every helper.
#![allow(dead_code)]

pub mod database;
pub mod fixtures;
