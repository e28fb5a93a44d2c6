//! API route definitions
//!
//! Plain JSON REST per entity, plus the grid feed at /api/products-data.

pub mod categories;
pub mod health;
pub mod products;
