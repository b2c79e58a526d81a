// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type for the line-oriented redactor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LineRedactError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("core error: {0}")]
    Core(#[from] redact_core::CoreError),

    #[error("line {line_number} is not valid UTF-8")]
    InvalidUtf8 { line_number: u64 },
}
