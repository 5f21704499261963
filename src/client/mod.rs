//! Client-side coordination: the session controller, its event surface,
//! the audit ledger, and action policies.

pub mod controller;
pub mod events;
pub mod ledger;
pub mod policy;

pub use controller::{SessionController, SessionIdAllocator};
pub use events::SessionEvent;
pub use ledger::{RoundRecord, SessionLedger};
pub use policy::{ActionPolicy, CounterPolicy, UniformPolicy};
