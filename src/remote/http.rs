use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::domain::{Entry, Feed, Tagging};
use crate::remote::wire::{
    StarredEntriesBody, UnreadEntriesBody, WireEntry, WireSubscription, WireTagging,
};
use crate::remote::{RemoteClient, RemoteError, RemoteResult};

pub const DEFAULT_BASE_URL: &str = "https://api.feedbin.com/v2/";

/// Feedbin v2 client over reqwest with basic auth.
pub struct HttpRemote {
    client: Client,
    base: Url,
    username: String,
    password: String,
}

impl HttpRemote {
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("feedsync/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // Url::join drops the last path segment unless it ends with '/'
        let base = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        Ok(Self {
            client,
            base,
            username: username.into(),
            password: password.into(),
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> RemoteResult<Url> {
        let mut url = self.base.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> RemoteResult<T> {
        let response = self
            .client
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status,
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| RemoteError::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> RemoteResult<()> {
        let url = self.endpoint(path, &[])?;
        let response = self
            .client
            .request(method, url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status,
                url: url.to_string(),
            });
        }
        Ok(())
    }

    fn join_ids(ids: &[i64]) -> String {
        ids.iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[async_trait]
impl RemoteClient for HttpRemote {
    async fn list_entries(&self, page: u32, per_page: u32) -> RemoteResult<Vec<Entry>> {
        let url = self.endpoint(
            "entries.json",
            &[("page", page.to_string()), ("per_page", per_page.to_string())],
        )?;

        // Feedbin answers 404 once the page is past the end
        let wire: Vec<WireEntry> = match self.get_json(url).await {
            Err(RemoteError::Status {
                status: StatusCode::NOT_FOUND,
                ..
            }) => return Ok(Vec::new()),
            other => other?,
        };

        let fetched_at = Utc::now();
        Ok(wire.into_iter().map(|w| w.into_entry(fetched_at)).collect())
    }

    async fn list_entries_by_ids(&self, ids: &[i64]) -> RemoteResult<Vec<Entry>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.endpoint("entries.json", &[("ids", Self::join_ids(ids))])?;
        let wire: Vec<WireEntry> = self.get_json(url).await?;

        let fetched_at = Utc::now();
        Ok(wire.into_iter().map(|w| w.into_entry(fetched_at)).collect())
    }

    async fn list_subscriptions(&self) -> RemoteResult<Vec<Feed>> {
        let url = self.endpoint("subscriptions.json", &[])?;
        let wire: Vec<WireSubscription> = self.get_json(url).await?;
        Ok(wire.into_iter().map(Feed::from).collect())
    }

    async fn list_taggings(&self) -> RemoteResult<Vec<Tagging>> {
        let url = self.endpoint("taggings.json", &[])?;
        let wire: Vec<WireTagging> = self.get_json(url).await?;
        Ok(wire.into_iter().map(Tagging::from).collect())
    }

    async fn list_unread_entry_ids(&self) -> RemoteResult<Vec<i64>> {
        let url = self.endpoint("unread_entries.json", &[])?;
        self.get_json(url).await
    }

    async fn list_starred_entry_ids(&self) -> RemoteResult<Vec<i64>> {
        let url = self.endpoint("starred_entries.json", &[])?;
        self.get_json(url).await
    }

    async fn list_updated_entry_ids_since(&self, since: DateTime<Utc>) -> RemoteResult<Vec<i64>> {
        let url = self.endpoint(
            "updated_entries.json",
            &[("since", since.to_rfc3339_opts(SecondsFormat::Micros, true))],
        )?;
        self.get_json(url).await
    }

    async fn mark_entries_read(&self, ids: &[i64]) -> RemoteResult<()> {
        let body = UnreadEntriesBody {
            unread_entries: ids,
        };
        self.send_json(Method::DELETE, "unread_entries.json", &body)
            .await
    }

    async fn mark_entries_unread(&self, ids: &[i64]) -> RemoteResult<()> {
        let body = UnreadEntriesBody {
            unread_entries: ids,
        };
        self.send_json(Method::POST, "unread_entries.json", &body)
            .await
    }

    async fn star_entries(&self, ids: &[i64]) -> RemoteResult<()> {
        let body = StarredEntriesBody {
            starred_entries: ids,
        };
        self.send_json(Method::POST, "starred_entries.json", &body)
            .await
    }

    async fn unstar_entries(&self, ids: &[i64]) -> RemoteResult<()> {
        let body = StarredEntriesBody {
            starred_entries: ids,
        };
        self.send_json(Method::DELETE, "starred_entries.json", &body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::MockServer;
    use serde_json::json;

    fn remote(server: &MockServer) -> HttpRemote {
        HttpRemote::new(
            &server.base_url(),
            "reader@example.com",
            "secret",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_entries_sends_paging() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("GET")
                    .path("/entries.json")
                    .query_param("page", "2")
                    .query_param("per_page", "50")
                    .header_exists("authorization");
                then.status(200).json_body(json!([{
                    "id": 7,
                    "feed_id": 3,
                    "title": "Hello",
                    "url": "https://example.com/7",
                    "author": "Ann",
                    "summary": "s",
                    "content": null,
                    "published": "2024-03-01T10:00:00.000000Z"
                }]));
            })
            .await;

        let entries = remote(&server).list_entries(2, 50).await.unwrap();
        mock.assert_async().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, 7);
        assert_eq!(entries[0].content, None);
    }

    #[tokio::test]
    async fn test_list_entries_past_last_page_is_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/entries.json");
                then.status(404);
            })
            .await;

        let entries = remote(&server).list_entries(99, 100).await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_decode_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/unread_entries.json");
                then.status(200).body("{\"not\": \"a list\"}");
            })
            .await;

        let err = remote(&server).list_unread_entry_ids().await.unwrap_err();
        assert!(matches!(err, RemoteError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_server_error_is_status_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("GET").path("/taggings.json");
                then.status(500);
            })
            .await;

        let err = remote(&server).list_taggings().await.unwrap_err();
        assert!(matches!(err, RemoteError::Status { .. }));
    }

    #[tokio::test]
    async fn test_mark_read_deletes_unread_entries() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("DELETE")
                    .path("/unread_entries.json")
                    .json_body(json!({"unread_entries": [42]}));
                then.status(200).json_body(json!([42]));
            })
            .await;

        remote(&server).mark_entries_read(&[42]).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_star_posts_starred_entries() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/starred_entries.json")
                    .json_body(json!({"starred_entries": [1, 2]}));
                then.status(200).json_body(json!([1, 2]));
            })
            .await;

        remote(&server).star_entries(&[1, 2]).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_entries_by_ids_skips_empty_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("GET").path("/entries.json");
                then.status(200).json_body(json!([]));
            })
            .await;

        let entries = remote(&server).list_entries_by_ids(&[]).await.unwrap();
        assert!(entries.is_empty());
        mock.assert_calls_async(0).await;
    }

    #[test]
    fn test_base_url_without_trailing_slash() {
        let remote = HttpRemote::new(
            "https://api.feedbin.com/v2",
            "u",
            "p",
            Duration::from_secs(1),
        )
        .unwrap();
        let url = remote.endpoint("taggings.json", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.feedbin.com/v2/taggings.json");
    }
}
