//! Tweet lookup by id.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::client::Client;
use crate::error::Error;
use crate::filtered_stream::FieldSelections;
use crate::request::Endpoint;
use crate::types::{Diagnostic, Includes, NumericId, Tweet};

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TweetLookupOutput {
    pub data: Vec<Tweet>,
    pub includes: Includes,
    pub errors: Vec<Diagnostic>,
}

impl Client {
    /// Fetches tweets by id, up to the API's limit of 100 per call.
    ///
    /// Per-tweet failures (deleted or protected tweets) are reported in the
    /// output's `errors`, not as an `Err`.
    pub async fn lookup_tweets(
        &self,
        ids: &[NumericId],
        selections: &FieldSelections,
    ) -> Result<TweetLookupOutput> {
        if ids.is_empty() {
            return Err(Error::construction("tweet lookup requires at least one id"));
        }

        let joined = ids
            .iter()
            .map(NumericId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let endpoint =
            selections.apply(Endpoint::new("lookupTweets", "GET", "tweets").with_query("ids", joined));
        self.send::<(), _>(&endpoint, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::config::Config;
    use crate::error::Kind;

    #[tokio::test]
    async fn empty_id_list_is_rejected_before_any_call() {
        let client = Client::with_endpoint(Config::new(), "http://127.0.0.1:1");
        let error = client
            .lookup_tweets(&[], &FieldSelections::default())
            .await
            .expect_err("no ids");
        assert_eq!(error.kind(), Kind::Construction);
    }

    #[test]
    fn lookup_output_decodes_partial_errors() {
        let output: TweetLookupOutput = serde_json::from_str(
            r#"{
                "data": [{"id": "1067094924124872705", "text": "hello"}],
                "errors": [{"title": "Not Found Error", "detail": "Could not find tweet", "type": "https://api.twitter.com/2/problems/resource-not-found"}]
            }"#,
        )
        .expect("lookup response");

        assert_eq!(output.data.len(), 1);
        assert_eq!(output.errors.len(), 1);
        assert!(output.errors[0].is_filed());
    }
}
