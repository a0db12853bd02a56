pub mod downloads;
pub mod handlers;
pub mod middleware;
pub mod monitor;
pub mod routes;

pub use routes::create_router;
