use crate::normalizer::is_stable_id;
use crate::types::{FeedViewPost, FetchConfig, ListItemView, Page, ReposterError, Result, SocialClient, StrongRef};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use chrono::{SecondsFormat, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

const MAX_AUTHOR_LIMIT: usize = 100;
const REPOST_COLLECTION: &str = "app.bsky.feed.repost";
const LIKE_COLLECTION: &str = "app.bsky.feed.like";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    access_jwt: String,
    did: String,
    handle: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XrpcErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResolveHandleOutput {
    did: String,
}

/// Output of `getFeed` and `getAuthorFeed`.
#[derive(Debug, Deserialize)]
pub struct FeedOutput {
    #[serde(default, deserialize_with = "lenient_entries")]
    pub feed: Vec<FeedViewPost>,
    pub cursor: Option<String>,
}

impl From<FeedOutput> for Page<FeedViewPost> {
    fn from(output: FeedOutput) -> Self {
        Page {
            items: output.feed,
            cursor: output.cursor,
        }
    }
}

/// Output of `getList`.
#[derive(Debug, Deserialize)]
pub struct ListOutput {
    #[serde(default, deserialize_with = "lenient_entries")]
    pub items: Vec<ListItemView>,
    pub cursor: Option<String>,
}

impl From<ListOutput> for Page<ListItemView> {
    fn from(output: ListOutput) -> Self {
        Page {
            items: output.items,
            cursor: output.cursor,
        }
    }
}

/// Decode a page entry by entry. An entry that does not fit the expected
/// shape becomes an empty default, which the content filter rejects as malformed.
fn lenient_entries<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let values = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .map(|value| {
            serde_json::from_value(value).unwrap_or_else(|e| {
                debug!("Unreadable page entry: {}", e);
                T::default()
            })
        })
        .collect())
}

#[derive(Debug, Serialize)]
struct CreateRecordInput<'a> {
    repo: &'a str,
    collection: &'a str,
    record: SubjectRecord<'a>,
}

#[derive(Debug, Serialize)]
struct SubjectRecord<'a> {
    #[serde(rename = "$type")]
    kind: &'a str,
    subject: &'a StrongRef,
    #[serde(rename = "createdAt")]
    created_at: String,
}

/// Authenticated XRPC client for one account.
pub struct XrpcClient {
    client: Client,
    service: Url,
    config: FetchConfig,
    access_jwt: String,
    did: String,
}

impl XrpcClient {
    /// Open a session on `service` with an identifier (handle or email) and password.
    pub async fn login(service: &str, identifier: &str, password: &str, config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;
        let service = Url::parse(service)?;

        let url = endpoint(&service, "com.atproto.server.createSession")?;
        let response = client
            .post(url)
            .json(&serde_json::json!({ "identifier": identifier, "password": password }))
            .send()
            .await?;
        let session: Session = read_json(response).await?;

        info!("Logged in as {}", session.handle.as_deref().unwrap_or(&session.did));

        Ok(Self {
            client,
            service,
            config,
            access_jwt: session.access_jwt,
            did: session.did,
        })
    }

    /// Read-only call, retried with exponential backoff on transient failures.
    async fn query<T: DeserializeOwned>(&self, nsid: &str, params: &[(&str, String)]) -> Result<T> {
        let url = endpoint(&self.service, nsid)?;
        let retry_delay = self.config.retry_delay_seconds;

        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: Duration::from_secs(retry_delay),
            initial_interval: Duration::from_secs(retry_delay),
            max_interval: Duration::from_secs(retry_delay * 16),
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(retry_delay * 30)),
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            match self.get_once(&url, params).await {
                Ok(output) => return Ok(output),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => match backoff.next_backoff() {
                    Some(delay) => {
                        attempt += 1;
                        warn!("Attempt {} of {} failed ({}), retrying in {:?}", attempt, nsid, e, delay);
                        tokio::time::sleep(delay).await;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }

    async fn get_once<T: DeserializeOwned>(&self, url: &Url, params: &[(&str, String)]) -> Result<T> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.access_jwt)
            .query(params)
            .send()
            .await?;
        read_json(response).await
    }

    /// Write a record referencing `subject`. Never retried: a failed response
    /// does not prove the record was not created.
    async fn create_subject_record(&self, collection: &str, subject: &StrongRef) -> Result<()> {
        let url = endpoint(&self.service, "com.atproto.repo.createRecord")?;
        let input = CreateRecordInput {
            repo: &self.did,
            collection,
            record: SubjectRecord {
                kind: collection,
                subject,
                created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_jwt)
            .json(&input)
            .send()
            .await?;
        let _: serde_json::Value = read_json(response).await.inspect_err(|e| {
            error!("createRecord {} failed for {}: {}", collection, subject.uri, e);
        })?;
        Ok(())
    }
}

#[async_trait]
impl SocialClient for XrpcClient {
    async fn resolve_identity(&self, handle: &str) -> anyhow::Result<String> {
        if is_stable_id(handle) {
            return Ok(handle.to_string());
        }
        let output: ResolveHandleOutput = self
            .query("com.atproto.identity.resolveHandle", &[("handle", handle.to_string())])
            .await?;
        Ok(output.did)
    }

    async fn fetch_feed_page(&self, feed_uri: &str, limit: usize, cursor: Option<&str>) -> anyhow::Result<Page<FeedViewPost>> {
        let mut params = vec![("feed", feed_uri.to_string()), ("limit", limit.to_string())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }
        let output: FeedOutput = self.query("app.bsky.feed.getFeed", &params).await?;
        Ok(output.into())
    }

    async fn fetch_list_page(&self, list_uri: &str, limit: usize, cursor: Option<&str>) -> anyhow::Result<Page<ListItemView>> {
        let mut params = vec![("list", list_uri.to_string()), ("limit", limit.to_string())];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }
        let output: ListOutput = self.query("app.bsky.graph.getList", &params).await?;
        Ok(output.into())
    }

    async fn fetch_author_page(&self, actor: &str, limit: usize) -> anyhow::Result<Vec<FeedViewPost>> {
        let limit = limit.clamp(1, MAX_AUTHOR_LIMIT);
        let output: FeedOutput = self
            .query(
                "app.bsky.feed.getAuthorFeed",
                &[("actor", actor.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(output.feed)
    }

    async fn submit_repost(&self, subject: &StrongRef) -> anyhow::Result<()> {
        Ok(self.create_subject_record(REPOST_COLLECTION, subject).await?)
    }

    async fn submit_like(&self, subject: &StrongRef) -> anyhow::Result<()> {
        Ok(self.create_subject_record(LIKE_COLLECTION, subject).await?)
    }
}

fn endpoint(service: &Url, nsid: &str) -> Result<Url> {
    Ok(service.join(&format!("xrpc/{}", nsid))?)
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<XrpcErrorBody>(&body)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
        return Err(ReposterError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
