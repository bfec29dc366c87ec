pub mod executor;
pub mod model;
pub mod registry;
