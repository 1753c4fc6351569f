// src/models/mod.rs

pub mod author;
pub mod stage;
