pub mod credentials;
pub mod source;
pub mod target;
