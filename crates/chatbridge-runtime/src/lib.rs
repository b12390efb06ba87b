// Agent runtime seam
//
// This crate defines the collaborator interfaces the bridge consumes:
// the turn-event schema agents emit, the session service that owns
// persistence (append-only event log plus a mutable state blob), and the
// per-app runner registry with graceful shutdown.
//
// Key design decisions:
// - Traits at every seam (SessionService, AgentRunner) so backends are
//   pluggable; an in-memory session service ships for examples and tests
// - The registry is an explicit injected object, never a process global

pub mod error;
pub mod events;
pub mod memory;
pub mod registry;
pub mod session;

pub use error::{Result, RuntimeError};
pub use events::{TurnContent, TurnEvent, TurnPart, TurnStream};
pub use memory::InMemorySessionService;
pub use registry::{AgentRunner, RunnerRegistry};
pub use session::{Session, SessionEvent, SessionService};
