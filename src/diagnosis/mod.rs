// src/diagnosis/mod.rs

pub mod engine;
pub mod score;
pub mod validation;
