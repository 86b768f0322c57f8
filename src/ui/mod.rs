//! Presentation helpers that do not depend on a GUI toolkit

pub mod grid;
