#![no_std]

extern crate alloc;

pub use analysis::*;
pub use board::*;
pub use character::*;
pub use clue::*;
pub use combat::*;
pub use config::*;
pub use effect::*;
pub use engine::*;
pub use error::*;
pub use generator::*;
pub use item::*;
pub use opponent::*;
pub use resolve::*;
pub use run::*;
pub use shop::*;
pub use spell::*;
pub use tile::*;
pub use types::*;
pub use upgrade::*;

mod analysis;
mod board;
mod character;
mod clue;
mod combat;
mod config;
mod effect;
mod engine;
mod error;
mod generator;
mod item;
mod opponent;
mod resolve;
mod run;
mod shop;
mod spell;
mod tile;
mod types;
mod upgrade;
