use serde::Deserialize;

/// Query parameters Zoom sends back to the callback path.
///
/// On consent `code` and `state` are present. When the user declines, Zoom sends
/// `error` instead.
#[derive(Debug, Deserialize)]
pub(crate) struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}
