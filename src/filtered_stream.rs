//! Filtered-stream rule management and the tweet stream itself.
//!
//! Rules are persistent server-side filters; tweets matching any active rule
//! are delivered on the stream, annotated with the rules they matched.

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::client::Client;
use crate::request::Endpoint;
use crate::stream::TweetStream;
use crate::types::{DateTime, Diagnostic, Includes, NumericId, Tweet, Utc};

const RULES_PATH: &str = "tweets/search/stream/rules";
const STREAM_PATH: &str = "tweets/search/stream";

/// One selectable response field or expansion, e.g. `created_at` or
/// `author_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field(String);

impl Field {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Field {
    fn from(field: &str) -> Self {
        Self(field.to_owned())
    }
}

impl From<String> for Field {
    fn from(field: String) -> Self {
        Self(field)
    }
}

fn join(fields: &[Field]) -> String {
    fields
        .iter()
        .map(Field::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Which optional fields and expansions the API should include in tweet
/// payloads. Empty selections request the API's defaults.
#[derive(Debug, Clone, Default)]
pub struct FieldSelections {
    pub expansions: Vec<Field>,
    pub media_fields: Vec<Field>,
    pub place_fields: Vec<Field>,
    pub poll_fields: Vec<Field>,
    pub tweet_fields: Vec<Field>,
    pub user_fields: Vec<Field>,
}

impl FieldSelections {
    /// Attaches the non-empty selections to an endpoint descriptor, each
    /// group comma-joined under its fixed query key.
    pub(crate) fn apply(&self, mut endpoint: Endpoint) -> Endpoint {
        let groups: [(&str, &[Field]); 6] = [
            ("expansions", &self.expansions),
            ("media.fields", &self.media_fields),
            ("place.fields", &self.place_fields),
            ("poll.fields", &self.poll_fields),
            ("tweet.fields", &self.tweet_fields),
            ("user.fields", &self.user_fields),
        ];
        for (key, fields) in groups {
            if !fields.is_empty() {
                endpoint = endpoint.with_query(key, join(fields));
            }
        }
        endpoint
    }
}

/// A rule to be created: the filter expression plus an optional free-form
/// tag echoed back on matching tweets.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSpec {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl RuleSpec {
    #[must_use]
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
            tag: None,
        }
    }

    #[must_use]
    pub fn with_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// An active rule as stored by the API.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Rule {
    pub id: NumericId,
    pub value: String,
    pub tag: Option<String>,
}

/// Per-operation counts reported alongside rule changes.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RuleSummary {
    pub created: u32,
    pub not_created: u32,
    pub valid: u32,
    pub invalid: u32,
    pub deleted: u32,
    pub not_deleted: u32,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RulesMeta {
    pub sent: Option<DateTime<Utc>>,
    pub summary: RuleSummary,
}

/// Response shape shared by every rule operation.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RulesOutput {
    pub data: Vec<Rule>,
    pub meta: RulesMeta,
    pub errors: Vec<Diagnostic>,
}

/// Which rules to fetch; default fetches all active rules.
#[derive(Debug, Clone, Default)]
pub struct RuleLookup {
    pub ids: Vec<NumericId>,
}

/// One tweet delivered on the stream, with the rules it matched.
#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MatchingRule {
    pub id: NumericId,
    pub tag: String,
}

#[non_exhaustive]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamTweetsOutput {
    pub data: Tweet,
    pub includes: Includes,
    pub matching_rules: Vec<MatchingRule>,
    pub errors: Vec<Diagnostic>,
}

#[derive(Serialize)]
struct AddRulesBody<'a> {
    add: &'a [RuleSpec],
}

#[derive(Serialize)]
struct DeleteRulesBody<'a> {
    delete: DeleteIds<'a>,
}

#[derive(Serialize)]
struct DeleteIds<'a> {
    ids: &'a [NumericId],
}

impl Client {
    /// Dry-runs rule creation: the API checks the filter expressions without
    /// persisting anything. Invalid expressions come back in `errors`.
    pub async fn validate_rules(&self, rules: &[RuleSpec]) -> Result<RulesOutput> {
        let endpoint =
            Endpoint::new("validateRules", "POST", RULES_PATH).with_query("dry_run", "true");
        self.send(&endpoint, Some(&AddRulesBody { add: rules }))
            .await
    }

    /// Creates persistent stream rules. Partial failures are reported in the
    /// output's `errors` and `meta.summary`, not as an `Err`.
    pub async fn create_rules(&self, rules: &[RuleSpec]) -> Result<RulesOutput> {
        let endpoint = Endpoint::new("createRules", "POST", RULES_PATH);
        self.send(&endpoint, Some(&AddRulesBody { add: rules }))
            .await
    }

    /// Deletes rules by id.
    pub async fn delete_rules(&self, ids: &[NumericId]) -> Result<RulesOutput> {
        let endpoint = Endpoint::new("deleteRules", "POST", RULES_PATH);
        self.send(&endpoint, Some(&DeleteRulesBody { delete: DeleteIds { ids } }))
            .await
    }

    /// Fetches active rules, all of them or only the ids named in the
    /// lookup.
    pub async fn get_rules(&self, lookup: &RuleLookup) -> Result<RulesOutput> {
        let mut endpoint = Endpoint::new("getRules", "GET", RULES_PATH);
        if !lookup.ids.is_empty() {
            let ids = lookup
                .ids
                .iter()
                .map(NumericId::as_str)
                .collect::<Vec<_>>()
                .join(",");
            endpoint = endpoint.with_query("ids", ids);
        }
        self.send::<(), _>(&endpoint, None).await
    }

    /// Opens the filtered stream, delivering tweets that match the active
    /// rules. Connection and reconnects happen in the background; see
    /// [`TweetStream`].
    pub fn stream_tweets(
        &self,
        selections: &FieldSelections,
    ) -> Result<TweetStream<StreamTweetsOutput>> {
        let endpoint = selections.apply(Endpoint::new("streamTweets", "GET", STREAM_PATH));
        self.stream::<(), _>(&endpoint, None)
    }
}
