//! A simulator for distributed algorithms: independent logical processes
//! exchange messages over a simulated network and run layered protocols by
//! composing processes around one another.
//!
//! # Organization
//!
//! - [`Message`], [`Envelope`], and [`ProcessId`] form the message model:
//!   nested values each layer can wrap and unwrap.
//! - [`Process`] is the unit of protocol logic; a layer owns an inner
//!   process and delegates `step` to it through interposed closures.
//! - [`Topology`] and [`Cluster`] are the network fabric: they wire each
//!   process to bounded mailboxes and drive every node in its own task.
//! - [`DistanceVector`](routing::DistanceVector) and
//!   [`ReliableTransport`](transport::ReliableTransport) are the two
//!   protocol layers built on that contract.
//!
//! # The simulation is closed
//!
//! A fixed set of processes, in-memory mailboxes, no external I/O during a
//! run besides diagnostic tracing. Backpressure everywhere is "drop on
//! full, no signal": retry is the responsibility of a layer above, which is
//! exactly what the transport layer provides.

pub mod cluster;
pub use cluster::Cluster;

pub mod error;
pub use error::{ConfigurationError, ProtocolViolation, SimError};

mod id;
pub use id::ProcessId;

pub mod logging;

pub mod message;
pub use message::{Ack, DataSegment, Envelope, Message, RoutingUpdate, SequenceNumber};

mod node;

pub mod process;
pub use process::{Process, ReceiveFn, SendFn};

pub mod routing;
pub use routing::{DistanceVector, NextStep, RoutingTable};

pub mod scenario;
pub use scenario::{run_scenario, run_scenario_with_timeout, Scenario};

pub mod shutdown;
pub use shutdown::{ExitStatus, Shutdown};

pub mod topology;
pub use topology::{Topology, TopologyNode};

pub mod transport;
pub use transport::ReliableTransport;
