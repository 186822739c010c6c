//! HTTP API handlers for vdp-vc

pub mod auth;
pub mod books;
pub mod health;
pub mod progress;

pub use auth::{auth_middleware, LearnerId};
pub use books::{get_book_page, get_review_plan, list_books};
pub use health::health_routes;
pub use progress::{get_progress, update_status};
