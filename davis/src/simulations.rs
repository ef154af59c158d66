mod bellman_ford;
pub use bellman_ford::{bellman_ford, BellmanFordScenario};

mod direct_conversation;
pub use direct_conversation::{direct_conversation, DirectConversationScenario};

mod random_traffic;
pub use random_traffic::{random_traffic, RandomTrafficScenario};
