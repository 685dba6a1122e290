//! Terminal mini-games: a memory-sequence game and a timed trivia quiz.
//!
//! The game rules live in [`engine`] and know nothing about terminals or the
//! network; [`games`] drives them from crossterm, [`opentdb`] supplies quiz
//! questions and [`store`] keeps the trivia high score.

pub mod engine;
pub mod games;
pub mod opentdb;
pub mod store;
