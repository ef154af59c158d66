mod conversation;
pub use conversation::{Conversation, Transcript};

mod idle;
pub use idle::Idle;

mod lamport;
pub use lamport::LamportClock;

mod random_traffic;
pub use random_traffic::RandomTraffic;
