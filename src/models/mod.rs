pub mod fundamentals;
pub mod score;
pub mod settings;
pub mod vault;
