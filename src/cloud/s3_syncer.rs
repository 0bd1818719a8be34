//! Bucket mirroring through the `aws` CLI

use crate::constants::SYNC_PROGRAM;
use std::fmt;
use std::process::Command;
use tracing::{info, warn};

/// A fully assembled `aws s3 sync` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl SyncCommand {
    pub fn new(source: &str, destination: &str) -> Self {
        Self {
            program: SYNC_PROGRAM.to_string(),
            args: vec![
                "s3".to_string(),
                "sync".to_string(),
                source.to_string(),
                destination.to_string(),
            ],
        }
    }
}

impl fmt::Display for SyncCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Executes a sync command and reports its exit code
pub trait CommandRunner {
    fn run(&self, command: &SyncCommand) -> std::io::Result<Option<i32>>;
}

/// Spawns the real process and waits for it
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &SyncCommand) -> std::io::Result<Option<i32>> {
        let status = Command::new(&command.program).args(&command.args).status()?;
        Ok(status.code())
    }
}

#[derive(Debug, Clone, Default)]
pub struct S3Sync<R: CommandRunner = SystemRunner> {
    runner: R,
}

impl S3Sync<SystemRunner> {
    pub fn new() -> Self {
        Self { runner: SystemRunner }
    }
}

impl<R: CommandRunner> S3Sync<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Upload `folder` to `aws_bucket_url`
    pub fn sync_folder_to_s3(&self, folder: &str, aws_bucket_url: &str) {
        self.sync(folder, aws_bucket_url);
    }

    /// Download `aws_bucket_url` into `folder`
    pub fn sync_folder_from_s3(&self, folder: &str, aws_bucket_url: &str) {
        self.sync(aws_bucket_url, folder);
    }

    fn sync(&self, source: &str, destination: &str) {
        let command = SyncCommand::new(source, destination);
        info!("Executing command: {}", command);
        match self.runner.run(&command) {
            Ok(Some(0)) => {}
            Ok(Some(code)) => warn!(code, command = %command, "sync exited with a non-zero status"),
            Ok(None) => warn!(command = %command, "sync terminated by a signal"),
            Err(e) => warn!(error = %e, command = %command, "failed to start sync"),
        }
        info!("Finished syncing {} to {}", source, destination);
    }
}
