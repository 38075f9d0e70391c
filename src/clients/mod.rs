pub mod reading_client;

pub use reading_client::{ReadingBackend, ReadingClient};
