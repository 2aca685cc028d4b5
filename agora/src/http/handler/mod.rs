use serde::Serialize;

pub mod accounts;
pub mod communities;
pub mod media;
pub mod search;

/// State of a relationship after it has been toggled
#[derive(Serialize)]
pub struct Toggled<T> {
    pub state: T,
}
