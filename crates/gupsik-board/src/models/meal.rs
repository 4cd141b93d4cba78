//! Response bodies of the meal backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One school's lunch for a date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meal {
    /// Unique school identifier
    pub school_code: String,

    /// Display name
    pub school_name: String,

    /// Menu text as published by the school
    #[serde(default)]
    pub lunch_menu: String,
}

impl Meal {
    /// Create a meal entry.
    pub fn new(
        school_code: impl Into<String>,
        school_name: impl Into<String>,
        lunch_menu: impl Into<String>,
    ) -> Self {
        Self {
            school_code: school_code.into(),
            school_name: school_name.into(),
            lunch_menu: lunch_menu.into(),
        }
    }
}

/// Reaction totals attached to a review.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reactions {
    #[serde(default)]
    pub likes: u32,
}

/// Generated review for one school on one date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    /// Review text
    #[serde(default)]
    pub review: String,

    /// Nutrition score, 0 to 5
    #[serde(default)]
    pub nutri_score: f64,

    /// Student preference score, 0 to 5
    #[serde(default)]
    pub pref_score: f64,

    /// Authoritative reaction totals
    #[serde(default)]
    pub reactions: Reactions,
}

impl Review {
    /// Create a review with zero likes.
    pub fn new(review: impl Into<String>, nutri_score: f64, pref_score: f64) -> Self {
        Self {
            review: review.into(),
            nutri_score,
            pref_score,
            reactions: Reactions::default(),
        }
    }

    /// Set the like count.
    pub fn with_likes(mut self, likes: u32) -> Self {
        self.reactions.likes = likes;
        self
    }
}

/// Response of a reaction POST.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionCount {
    #[serde(default)]
    pub likes: u32,
}

/// Visitor counter response.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VisitCount {
    pub count: u64,
}

/// Date picker range offered by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub dates: Vec<String>,
    pub selected_date: String,
}

/// Kind of reaction a user can send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    Like,
}

impl ReactionKind {
    /// Path segment used by the reaction endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
