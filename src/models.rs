pub mod admin;
pub mod affiliate;
pub mod company;
pub mod document;
pub mod health;
pub mod session;
