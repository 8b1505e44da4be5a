//! Invoice status lifecycle: transition policy, ledger synchronisation and
//! the orchestrator that applies both atomically.

pub mod ledger;
pub mod orchestrator;
pub mod policy;

pub use ledger::{synchronize, LedgerAction};
pub use orchestrator::{AllowedTransitions, OverridePolicy, TransitionOrchestrator, TransitionRequest};
pub use policy::{allowed_next_states, is_terminal, validate_transition};
