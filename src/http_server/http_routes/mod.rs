pub mod auto_sync;
pub mod catalog;
pub mod credentials;
pub mod jobs;
