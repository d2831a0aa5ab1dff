pub mod backend;
pub mod configuration;
pub mod database;
pub mod object;

pub use backend::*;
pub use configuration::*;
pub use database::*;
pub use object::*;
