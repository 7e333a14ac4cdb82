/// Service layer for the thumbnail worker
pub mod thumbnail;
