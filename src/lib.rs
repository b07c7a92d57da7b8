//! **mazecarve** generates perfect mazes with randomized depth first search
//! and solves them with a breadth first search over the carved passages.

pub mod cells;
pub mod generators;
pub mod grid;
pub mod observers;
pub mod pathing;
pub mod units;
