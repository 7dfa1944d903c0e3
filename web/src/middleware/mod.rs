pub(crate) mod zoom_auth;
