use health_report_core::classification::ModelRequest;

/// Synchronous model invocation returning the raw response body.
///
/// An `Err` means the model could not be reached at all; a reachable model
/// returning nonsense is still `Ok`.
pub trait ModelClient {
    fn invoke_model(&self, request: &ModelRequest) -> Result<Vec<u8>, String>;
}
