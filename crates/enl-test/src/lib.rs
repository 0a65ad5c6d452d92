//! ENL Test Harness - Multi-node simulation
//!
//! This crate provides:
//! - An in-memory network with per-link loss
//! - A loopback transport and transaction engine per node
//! - Cluster scenarios wiring runtime nodes onto the network

pub mod cluster;
pub mod simulator;

pub use cluster::*;
pub use simulator::*;
