//! Gupsik Board - meal card state for the school-meal review board.
//!
//! Everything in this crate is synchronous and free of I/O. The client
//! crate feeds it meal sets, reviews and reaction counts as they arrive
//! from the network, and reads back card views in display order.
//!
//! # Architecture
//!
//! ```text
//! meals / reviews / likes
//!          │
//!          ▼
//!   ┌─────────────┐   dirty rows   ┌──────────────┐   CardView[]
//!   │  CardStore  │ ─────────────→ │    Board     │ ───────────→ render
//!   │ (scores,    │                │ (order,      │
//!   │  likes)     │ ←───────────── │  sections,   │
//!   └─────────────┘   reconcile    │  highlights) │
//!                                  └──────────────┘
//! ```
//!
//! - **Models**: wire types (`Meal`, `Review`, ...) and the `MealCard` row
//! - **Store**: one `MealCard` per school for the active date
//! - **Board**: on-screen order, review sections and reorder highlights
//! - **View**: immutable card views and their text rendering

pub mod board;
pub mod calendar;
pub mod collation;
pub mod error;
pub mod models;
pub mod store;
pub mod view;

pub use board::{Board, ReorderMode, ReorderPass, HIGHLIGHT_DURATION};
pub use calendar::{format_date, parse_date, selectable_dates};
pub use error::{Error, Result};
pub use models::{
    DateRange, HelpGuide, Meal, MealCard, ReactionCount, ReactionKind, Reactions, Review,
    ReviewSection, VisitCount,
};
pub use store::CardStore;
pub use view::{render_board, stars, BoardHeader, CardView};
