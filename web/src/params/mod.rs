pub(crate) mod oauth;
pub(crate) mod user;
