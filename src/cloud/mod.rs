//! Remote storage helpers

mod s3_syncer;

pub use s3_syncer::{CommandRunner, S3Sync, SyncCommand, SystemRunner};
