use serde::Deserialize;

/// Request body for submitting a return.
#[derive(Debug, Deserialize)]
pub struct CreateReturnRequest {
    pub order_id: String,
    pub reason: String,
}
