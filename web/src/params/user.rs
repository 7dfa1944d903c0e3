use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct LoginParams {
    pub email: String,
}
