pub mod amount;
pub mod errors;
pub mod models;
