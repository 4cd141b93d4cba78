//! Card state store.
//!
//! Holds one [`MealCard`] per visible school for the active date and is the
//! source of truth for reordering. Every mutation marks the affected row
//! dirty; the board drains dirty rows with [`CardStore::take_dirty`] and
//! re-renders only those.

use crate::models::{Meal, MealCard, Review};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// In-memory mapping from school code to its card row.
#[derive(Debug, Default)]
pub struct CardStore {
    date: Option<String>,
    cards: HashMap<String, MealCard>,
    dirty: BTreeSet<String>,
}

impl CardStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Date the current meal set belongs to.
    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    /// Replace the whole store with the meal set of `date`.
    ///
    /// Entries of the previous date are discarded. Duplicate school codes
    /// keep the last occurrence.
    pub fn set_meal_set(&mut self, date: &str, meals: &[Meal]) {
        self.cards.clear();
        self.dirty.clear();
        for meal in meals {
            self.cards
                .insert(meal.school_code.clone(), MealCard::from_meal(meal));
            self.dirty.insert(meal.school_code.clone());
        }
        self.date = Some(date.to_string());
        debug!(date, schools = self.cards.len(), "Meal set replaced");
    }

    /// Apply a review, `None` meaning no review is available yet.
    ///
    /// Returns false if the school is not part of the current set.
    pub fn apply_review(&mut self, school_code: &str, review: Option<&Review>) -> bool {
        match self.cards.get_mut(school_code) {
            Some(card) => {
                card.apply_review(review);
                self.dirty.insert(school_code.to_string());
                true
            }
            None => false,
        }
    }

    /// Overwrite the like count of a school. The score is untouched.
    ///
    /// Returns false if the school is not part of the current set.
    pub fn apply_reaction_update(&mut self, school_code: &str, likes: u32) -> bool {
        match self.cards.get_mut(school_code) {
            Some(card) => {
                card.likes = likes;
                self.dirty.insert(school_code.to_string());
                true
            }
            None => false,
        }
    }

    /// Get a card by school code.
    pub fn get(&self, school_code: &str) -> Option<&MealCard> {
        self.cards.get(school_code)
    }

    /// Check whether a school is in the current set.
    pub fn contains(&self, school_code: &str) -> bool {
        self.cards.contains_key(school_code)
    }

    /// Iterate all cards in no particular order.
    pub fn cards(&self) -> impl Iterator<Item = &MealCard> {
        self.cards.values()
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the store has no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Drain the set of rows changed since the last call.
    pub fn take_dirty(&mut self) -> Vec<String> {
        std::mem::take(&mut self.dirty).into_iter().collect()
    }
}
