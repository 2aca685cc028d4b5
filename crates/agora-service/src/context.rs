use uuid::Uuid;

/// Identity of the caller an operation is executed on behalf of
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Context {
    pub account_id: Uuid,
}

impl Context {
    #[must_use]
    pub fn new(account_id: Uuid) -> Self {
        Self { account_id }
    }
}
