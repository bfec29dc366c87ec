pub mod auto_sync;
pub mod credentials;
pub mod diff;
pub mod jobs;
pub mod resolver;
