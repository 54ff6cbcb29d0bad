pub mod genealogy;

pub use genealogy::*;
