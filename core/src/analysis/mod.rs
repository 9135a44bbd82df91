pub use constraints::*;
pub use observation::*;
pub use solver::*;

mod constraints;
mod observation;
mod solver;
