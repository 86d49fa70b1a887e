pub mod agent;
pub mod directory;

pub use agent::{resolve_agent_seat, AgentActionRequest, AgentActionResponse};
pub use directory::{DirectoryClient, HttpDirectoryClient, StubDirectoryClient};
