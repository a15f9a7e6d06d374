mod methods;

pub use methods::{best_chunk, independent_consensus, CallInput, CallMethod, CallResult};
