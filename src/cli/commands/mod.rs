pub mod auth;
pub mod data;
pub mod personas;
pub mod schema;
pub mod server;
pub mod users;
