mod code;
mod gate;
mod middleware;
mod session;
mod token;

pub use code::{exchange_code, start_login};
pub use gate::{Caller, caller_for_identity, resolve_caller};
pub use middleware::{AuthError, OptionalCaller, RequireAdmin, RequireIdentity, RequireSuperAdmin};
pub use session::{
    ResolvedSession, clear_session_cookie, extract_session_token, has_session_credentials,
    is_auth_cookie_name, issue_session, needs_refresh, request_cookies, resolve_session,
    session_cookie,
};
pub use token::{TokenGenerator, digest_auth_code, generate_auth_code, parse_token};
