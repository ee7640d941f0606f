use thiserror::Error;

use crate::expression::ExpressionError;
use crate::generator::GeneratorError;
use crate::model::{
    AttemptError, LevelError, ModeParseError, ParseIdError, QuestionError, SessionSummaryError,
    SettingsError, UserError,
};

/// Any domain failure, for callers that do not care which layer raised it.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    #[error(transparent)]
    Generator(#[from] GeneratorError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Mode(#[from] ModeParseError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Summary(#[from] SessionSummaryError),
    #[error(transparent)]
    User(#[from] UserError),
}
