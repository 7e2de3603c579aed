pub mod error;
pub mod evaluate;
pub mod health;
pub mod openapi;
