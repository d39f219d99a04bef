//! Planning and submission state is kept in a SQLite ledger
//!
//! Only plan and submit touch the ledger; workers may run on other nodes
//! and never open it. It exists so an operator can see what was planned,
//! what was submitted, and under which SLURM job id.

/// Connect to the ledger database
pub mod open;

/// Record planned units and mark them submitted
pub mod ledger;
