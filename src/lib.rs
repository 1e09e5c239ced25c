//! Signalized Intersection Simulation Library
//!
//! A discrete-time simulation of a single four-way intersection used to compare
//! fixed-time and adaptive signal control. Rendering and plotting live outside
//! this crate; everything here produces plain data.

pub mod simulation;
