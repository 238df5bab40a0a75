pub mod errors;
pub mod json;

pub use errors::{error_to_response, json_error_response};
pub use json::json_response;

pub use crate::errors::ResultResp;
