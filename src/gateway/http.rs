//! Gateway talking to the chat host adapter over HTTP.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    gateway::{ChatGateway, GatewayError, GatewayResult},
    state::roster::{ChannelId, MessageId, UserId},
};

const HOST_TOKEN_HEADER: &str = "x-host-token";

#[derive(Serialize)]
struct SendBody<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl_secs: Option<u64>,
}

#[derive(Serialize)]
struct EditBody<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct ReactionsBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<UserId>,
    emojis: &'a [String],
}

#[derive(Deserialize)]
struct MessageRef {
    message_id: MessageId,
}

#[derive(Deserialize)]
struct SignupRef {
    message_id: Option<MessageId>,
}

/// HTTP client for the host adapter's message API.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
}

impl HttpGateway {
    /// Build a client for the adapter at `base_url`.
    pub fn new(base_url: &str, token: Option<&str>) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| GatewayError::Request {
                path: base_url.to_string(),
                source: Box::new(source),
            })?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: token.map(Arc::from),
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.header(HOST_TOKEN_HEADER, token.as_ref()),
            None => builder,
        }
    }

    async fn send<B>(&self, method: Method, path: String, body: Option<&B>) -> GatewayResult<reqwest::Response>
    where
        B: Serialize + ?Sized,
    {
        let mut builder = self.request(method, &path);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| GatewayError::Request {
                path: path.clone(),
                source: Box::new(source),
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(GatewayError::NotFound(path)),
            status if status.is_success() => Ok(response),
            other => Err(GatewayError::Status {
                path,
                status: other.as_u16(),
            }),
        }
    }

    async fn send_json<B, T>(&self, method: Method, path: String, body: Option<&B>) -> GatewayResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(method, path.clone(), body).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| GatewayError::Decode {
                path,
                source: Box::new(source),
            })
    }
}

impl ChatGateway for HttpGateway {
    fn send_message(
        &self,
        channel: ChannelId,
        text: String,
        ttl: Option<Duration>,
    ) -> BoxFuture<'static, GatewayResult<MessageId>> {
        let gateway = self.clone();
        Box::pin(async move {
            let body = SendBody {
                text: &text,
                ttl_secs: ttl.map(|ttl| ttl.as_secs().max(1)),
            };
            let created: MessageRef = gateway
                .send_json(Method::POST, format!("channels/{channel}/messages"), Some(&body))
                .await?;
            Ok(created.message_id)
        })
    }

    fn edit_message(
        &self,
        channel: ChannelId,
        message: MessageId,
        text: String,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let gateway = self.clone();
        Box::pin(async move {
            gateway
                .send(
                    Method::PATCH,
                    format!("channels/{channel}/messages/{message}"),
                    Some(&EditBody { text: &text }),
                )
                .await
                .map(|_| ())
        })
    }

    fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let gateway = self.clone();
        Box::pin(async move {
            gateway
                .send::<()>(
                    Method::DELETE,
                    format!("channels/{channel}/messages/{message}"),
                    None,
                )
                .await
                .map(|_| ())
        })
    }

    fn add_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
        emojis: Vec<String>,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let gateway = self.clone();
        Box::pin(async move {
            let body = ReactionsBody {
                user_id: None,
                emojis: &emojis,
            };
            gateway
                .send(
                    Method::POST,
                    format!("channels/{channel}/messages/{message}/reactions"),
                    Some(&body),
                )
                .await
                .map(|_| ())
        })
    }

    fn remove_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emojis: Vec<String>,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let gateway = self.clone();
        Box::pin(async move {
            let body = ReactionsBody {
                user_id: Some(user),
                emojis: &emojis,
            };
            gateway
                .send(
                    Method::DELETE,
                    format!("channels/{channel}/messages/{message}/reactions"),
                    Some(&body),
                )
                .await
                .map(|_| ())
        })
    }

    fn clear_reactions(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let gateway = self.clone();
        Box::pin(async move {
            gateway
                .send::<()>(
                    Method::DELETE,
                    format!("channels/{channel}/messages/{message}/reactions/all"),
                    None,
                )
                .await
                .map(|_| ())
        })
    }

    fn current_signup_message(
        &self,
        channel: ChannelId,
    ) -> BoxFuture<'static, GatewayResult<Option<MessageId>>> {
        let gateway = self.clone();
        Box::pin(async move {
            let found: SignupRef = gateway
                .send_json::<(), _>(Method::GET, format!("channels/{channel}/signup-message"), None)
                .await?;
            Ok(found.message_id)
        })
    }
}
