mod client;
mod dto;

pub use client::{MealDbClient, RecipeSearch};
