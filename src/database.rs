pub mod admin;
pub mod affiliate;
pub mod company;
pub mod credentials;
pub mod postgres_repository;
pub mod session;
