//! Data models for the board.
//!
//! # Wire Types
//!
//! - [`Meal`] - one school's lunch for a date
//! - [`Review`] - generated review with two sub-scores and a like count
//! - [`ReactionCount`], [`VisitCount`], [`DateRange`] - small response bodies
//!
//! # Board Types
//!
//! - [`MealCard`] - the per-school row the store keeps
//! - [`ReviewSection`] - what the review area of a card currently shows
//! - [`HelpGuide`] - title/body split of the help markdown

mod card;
mod guide;
mod meal;

pub use card::{MealCard, ReviewSection, MAX_SCORE};
pub use guide::HelpGuide;
pub use meal::{DateRange, Meal, ReactionCount, ReactionKind, Reactions, Review, VisitCount};
