#[macro_use]
extern crate serde;

mod ballot;
mod clock;
mod decryption;
mod election;
mod error;
mod events;
mod ledger;
mod orchestrator;
mod registry;
mod store;
mod tally;

pub use ballot::*;
pub use clock::*;
pub use decryption::*;
pub use election::*;
pub use error::*;
pub use events::*;
pub use ledger::*;
pub use orchestrator::*;
pub use registry::*;
pub use store::*;
pub use tally::*;
