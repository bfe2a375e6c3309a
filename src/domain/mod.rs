pub mod cafe;
pub mod roaster;

pub use cafe::{CafeRecord, maps_link};
pub use roaster::RoasterRecord;
