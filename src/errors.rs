// Copyright 2025 Cornell University
// released under MIT License
// author: Kevin Laeufer <laeufer@cornell.edu>

use crate::logic::ExprId;
use thiserror::Error;

/// Structural errors raised while registering an action. All of them are
/// fatal to the enclosing module's compilation; none are recovered
/// locally. Protocol misuse (finalizing twice, registering after
/// finalize) is ruled out by the registry's move-based API and has no
/// error variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TheoryError {
    #[error("parameter '{param}' of action '{action}' binds more than one name")]
    GroupedParameter { action: String, param: String },
    #[error(
        "parameter '{param}' of action '{action}' must be typed by a simple signature reference"
    )]
    BadParameterType {
        action: String,
        param: String,
        ty: ExprId,
    },
    #[error("action '{0}' is already registered")]
    DuplicateAction(String),
}

pub type Result<T> = std::result::Result<T, TheoryError>;
