pub mod backend;
pub mod class;
pub mod configuration;
pub mod kernel;
pub mod properties;

pub use backend::*;
pub use class::*;
pub use configuration::*;
pub use kernel::*;
pub use properties::*;
