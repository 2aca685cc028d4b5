pub use self::{auth::AuthExtractor, json::Json};

mod auth;
mod json;
