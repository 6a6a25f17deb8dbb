//! Response sanitization.

use vitrine_core::QueryDataResponse;

/// Strip backend diagnostics from every frame of every response, in place.
///
/// Removes the executed query string and the backend-custom metadata. Data
/// values, field names and per-refId errors are left untouched.
pub fn sanitize_metadata_from_query_data(response: &mut QueryDataResponse) {
    for data in response.responses.values_mut() {
        for frame in &mut data.frames {
            if let Some(meta) = frame.meta.as_mut() {
                meta.executed_query_string = None;
                meta.custom = None;
            }
        }
    }
}
