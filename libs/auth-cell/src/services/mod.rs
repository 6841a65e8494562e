pub mod accounts;
pub mod auth;
pub mod lockout;
pub mod password;

pub use accounts::AccountService;
pub use auth::AuthService;
pub use lockout::{evaluate_login, LoginDecision, LoginPolicy};
pub use password::PasswordService;
