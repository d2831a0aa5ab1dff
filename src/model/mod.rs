pub mod commit;
pub mod common;
pub mod document;
pub mod instance;
pub mod schema;

pub use commit::*;
pub use common::*;
pub use instance::*;
pub use schema::*;
