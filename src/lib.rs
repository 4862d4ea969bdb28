// Copyright 2025 Cornell University
// released under MIT License
// author: Kevin Laeufer <laeufer@cornell.edu>

pub mod diagnostic;
pub mod errors;
pub mod logic;
pub mod normalize;
pub mod registry;
pub mod serialize;
pub mod synthesis;
