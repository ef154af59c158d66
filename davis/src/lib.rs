//! User processes and ready-made scenarios for the davis simulator.
//!
//! The heavy machinery lives in [`davis_core`]: the process contract, the
//! network fabric, and the routing and transport layers. This crate supplies
//! the processes that sit at the top of a node's stack (conversations,
//! traffic generators, the logical-clock wrapper), the scenarios that
//! assemble them into topologies, and the runner binary.

pub mod applications;
pub mod cli;
pub mod simulations;
