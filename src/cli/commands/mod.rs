pub mod health;
pub mod token;
pub mod warm;
