mod driver;
mod error;
mod memory;

pub use driver::EnvironmentDriver;
pub use error::{Error, Result};
pub use memory::InMemoryDriver;
