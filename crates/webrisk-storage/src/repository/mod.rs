//! Database repositories for each table.

pub mod verdicts;

pub use verdicts::VerdictsRepo;
