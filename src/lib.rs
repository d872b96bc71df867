pub mod audit;
pub mod catalog;
pub mod configs;
pub mod search;
pub mod store;
pub mod user;
