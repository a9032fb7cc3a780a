mod trace_id;
mod types;

pub use trace_id::*;
pub use types::*;
