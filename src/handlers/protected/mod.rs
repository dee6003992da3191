// handlers/protected - every route here sits behind the API key gate
pub mod association;
pub mod data;
pub mod relay;
pub mod users;
