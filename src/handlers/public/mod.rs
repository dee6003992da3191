// handlers/public - reachable without an Authorization header
pub mod register;
pub mod status;

pub use register::post as register_post;
pub use status::get as status_get;
