//! JSON decoding helpers shared by the request pipeline and the stream.

use serde::de::DeserializeOwned;

/// Decodes one streaming record into the target type.
pub(crate) fn decode_record<T: DeserializeOwned>(record: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(record)
}

/// Decodes a response body, treating an empty body as success-with-no-data.
///
/// The API answers some calls with nothing at all (and some error statuses
/// with an unparseable nothing); an empty or whitespace-only body is not a
/// decode failure, it is simply the absence of data.
pub(crate) fn decode_lenient<T: DeserializeOwned>(
    body: &str,
) -> Result<Option<T>, serde_json::Error> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(body).map(Some)
}
