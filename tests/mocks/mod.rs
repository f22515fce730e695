pub mod faulty;
pub mod no_batch;

pub use faulty::{Fault, FaultProbe, FaultyAdapter};
pub use no_batch::NoBatchAdapter;
