pub mod auth;
pub mod proxy;
pub mod session;
