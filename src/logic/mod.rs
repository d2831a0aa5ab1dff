pub mod display;
pub mod export;
pub mod interaction;
pub mod schema_tree;
pub mod tree;

pub use display::*;
pub use export::*;
pub use interaction::*;
pub use schema_tree::*;
pub use tree::*;
