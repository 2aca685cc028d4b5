pub mod account;
pub mod community;
pub mod follow;
pub mod membership;
pub mod session;
