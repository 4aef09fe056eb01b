pub mod admin;
pub mod affiliate;
pub mod company;
pub mod error;
pub mod health;
pub mod proxy;
mod session;
