pub mod extractor;

pub use extractor::{issue_token, AuthUser, JwtSecret};
