pub mod current_user;

pub use current_user::{current_actor, get_current_user, CurrentUser, AUTH_COOKIE};
