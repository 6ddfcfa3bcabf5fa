// Library exports for CampusFeed
// This allows integration tests and external code to use CampusFeed modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod feed;
pub mod identity;
pub mod media;
pub mod routes;
pub mod seed;
pub mod state;
