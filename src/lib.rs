pub mod cli;
pub mod commands;
pub mod consensus;
pub mod eval;
pub mod hmm;
pub mod utils;
