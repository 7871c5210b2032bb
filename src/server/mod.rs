mod admin;
pub mod dto;
mod login;
mod pages;
pub mod response;
mod router;
mod session;
mod user;
pub mod validation;

pub use admin::admin_router;
pub use login::login_router;
pub use router::{AppState, create_router};
pub use session::session_gate;
pub use user::user_router;
