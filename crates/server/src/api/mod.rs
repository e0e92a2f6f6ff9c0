pub mod catalog;
pub mod favourites;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod session;

pub use routes::create_router;
