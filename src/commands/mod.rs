// ABOUTME: Command module aggregator for the hoist CLI.
// ABOUTME: Re-exports the deploy and describe command handlers.

mod deploy;
mod describe;

pub use deploy::deploy;
pub use describe::describe;
