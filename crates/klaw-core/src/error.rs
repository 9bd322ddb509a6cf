use std::error::Error;

use crate::config::ConfigError;
use crate::github::RepoError;
use crate::issue::IssueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad or missing configuration, credential or repository metadata.
    Config,
    /// The issue tracker could not be reached or answered unexpectedly.
    Remote,
}

impl ErrorClass {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorClass::Config => 2,
            ErrorClass::Remote => 3,
        }
    }
}

pub const EXIT_FAILURE: u8 = 1;

/// Class of the first error in the chain that klaw knows about.
pub fn classify(err: &(dyn Error + 'static)) -> Option<ErrorClass> {
    let mut current: Option<&(dyn Error + 'static)> = Some(err);
    while let Some(err) = current {
        if err.is::<ConfigError>() || err.is::<RepoError>() {
            return Some(ErrorClass::Config);
        }
        if err.is::<IssueError>() {
            return Some(ErrorClass::Remote);
        }
        current = err.source();
    }
    None
}

pub fn exit_code(err: &(dyn Error + 'static)) -> u8 {
    classify(err).map(ErrorClass::exit_code).unwrap_or(EXIT_FAILURE)
}
