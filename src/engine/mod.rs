pub mod round;
pub mod scheduler;
pub mod sequence;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError
{
    #[error("the question list is empty, nothing to play")]
    EmptyQuestionList,
    #[error("question {index} is malformed: {reason}")]
    MalformedQuestion { index: usize, reason: String },
}
