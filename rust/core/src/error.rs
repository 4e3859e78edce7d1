// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for OBJ/MTL parsing
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing sketch meshes
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Statement '{keyword}' at line {line} is missing its argument")]
    MissingArgument { keyword: String, line: usize },
}

impl Error {
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}
