mod filter;
mod paths;
mod scan;

pub use filter::*;
pub use paths::*;
pub use scan::*;
