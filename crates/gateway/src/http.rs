//! HTTP implementation of the backend gateway

use async_trait::async_trait;
use lia_config::{constants::endpoints, BackendConfig};
use lia_core::{AudioClip, Transcriber};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::backend::AssistantBackend;
use crate::types::{
    AnalysisReply, ChartReply, ChatReply, ChatRequest, FileUpload, ImageReply, Memory, MemoryList,
    Place, SearchResults, TokenReply, TranscriptionReply,
};
use crate::GatewayError;

/// HTTP client for the assistant backend
///
/// Holds only the origin and a pooled client; all endpoint paths are relative
/// constants.
#[derive(Debug, Clone)]
pub struct BackendGateway {
    client: Client,
    base_url: String,
}

impl BackendGateway {
    /// Create a gateway for the given origin
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, GatewayError> {
        Self::new(config.base_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, GatewayError> {
        let response = self.client.get(self.url(path)).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn post_unit<B>(&self, path: &str, body: &B) -> Result<(), GatewayError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn post_form<R: DeserializeOwned>(&self, path: &str, form: Form) -> Result<R, GatewayError> {
        let response = self
            .client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    fn file_part(data: Vec<u8>, file_name: String, mime_type: &str) -> Result<Part, GatewayError> {
        Part::bytes(data)
            .file_name(file_name)
            .mime_str(mime_type)
            .map_err(|e| GatewayError::InvalidResponse(format!("Invalid MIME type: {}", e)))
    }

    /// Transcription round-trip keeping the error for callers that want it
    pub async fn try_transcribe(&self, clip: &AudioClip) -> Result<String, GatewayError> {
        let part = Self::file_part(
            clip.data.clone(),
            format!("recording.{}", clip.file_extension()),
            &clip.mime_type,
        )?;
        let form = Form::new().part("audio", part);
        let reply: TranscriptionReply = self.post_form(endpoints::TRANSCRIBE, form).await?;
        Ok(reply.text)
    }

    async fn try_analyze(
        &self,
        file: &FileUpload,
        message: Option<&str>,
        conversation_id: Option<&str>,
    ) -> Result<String, GatewayError> {
        let part = Self::file_part(file.data.clone(), file.name.clone(), &file.mime_type)?;
        let mut form = Form::new().part("file", part);
        if let Some(message) = message.filter(|m| !m.trim().is_empty()) {
            form = form.text("message", message.to_string());
        }
        if let Some(id) = conversation_id {
            form = form.text("conversationId", id.to_string());
        }
        let reply: AnalysisReply = self.post_form(endpoints::MULTIMODAL_ANALYZE, form).await?;
        reply
            .into_text()
            .ok_or_else(|| GatewayError::InvalidResponse("no reply or analysis field".to_string()))
    }

    async fn try_delete_memory(&self, id: &str) -> Result<(), GatewayError> {
        let url = self.url(&format!("{}/{}", endpoints::MEMORY_DELETE, id));
        let response = self.client.delete(url).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Log a failed call and collapse it to `None`
fn settle<T>(endpoint: &str, result: Result<T, GatewayError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(endpoint, error = %e, "Backend call failed");
            None
        },
    }
}

#[async_trait]
impl AssistantBackend for BackendGateway {
    async fn chat(&self, request: &ChatRequest) -> Option<ChatReply> {
        tracing::debug!(conversation_id = %request.conversation_id, "Chat turn");
        settle(
            endpoints::CHAT,
            self.post_json(endpoints::CHAT, request).await,
        )
    }

    async fn analyze_file(
        &self,
        file: &FileUpload,
        message: Option<&str>,
        conversation_id: Option<&str>,
    ) -> Option<String> {
        tracing::debug!(file = %file.name, size = file.size(), "Multimodal analysis");
        settle(
            endpoints::MULTIMODAL_ANALYZE,
            self.try_analyze(file, message, conversation_id).await,
        )
    }

    async fn transcribe(&self, clip: &AudioClip) -> Option<String> {
        settle(endpoints::TRANSCRIBE, self.try_transcribe(clip).await)
    }

    async fn load_memories(&self) -> Vec<Memory> {
        settle(
            endpoints::MEMORY_LOAD,
            self.get_json::<MemoryList>(endpoints::MEMORY_LOAD).await,
        )
        .map(MemoryList::into_vec)
        .unwrap_or_default()
    }

    async fn save_memory(&self, content: &str) -> bool {
        settle(
            endpoints::MEMORY_SAVE,
            self.post_unit(endpoints::MEMORY_SAVE, &json!({ "content": content }))
                .await,
        )
        .is_some()
    }

    async fn delete_memory(&self, id: &str) -> bool {
        settle(endpoints::MEMORY_DELETE, self.try_delete_memory(id).await).is_some()
    }

    async fn session(&self) -> Option<Value> {
        settle(endpoints::SESSION, self.get_json(endpoints::SESSION).await)
    }

    async fn reset_session(&self) -> bool {
        settle(
            endpoints::SESSION_RESET,
            self.post_unit(endpoints::SESSION_RESET, &json!({})).await,
        )
        .is_some()
    }

    async fn web_search(&self, query: &str) -> Option<SearchResults> {
        settle(
            endpoints::WEB_SEARCH,
            self.post_json(endpoints::WEB_SEARCH, &json!({ "query": query }))
                .await,
        )
    }

    async fn generate_image(&self, prompt: &str) -> Option<String> {
        settle(
            endpoints::GENERATE_IMAGE,
            self.post_json::<_, ImageReply>(endpoints::GENERATE_IMAGE, &json!({ "prompt": prompt }))
                .await,
        )
        .map(|reply| reply.url)
    }

    async fn generate_chart(&self, prompt: &str) -> Option<Value> {
        settle(
            endpoints::GENERATE_CHART,
            self.post_json::<_, ChartReply>(endpoints::GENERATE_CHART, &json!({ "prompt": prompt }))
                .await,
        )
        .map(|reply| reply.chart)
    }

    async fn generate_table(&self, prompt: &str) -> Option<Value> {
        settle(
            endpoints::GENERATE_TABLE,
            self.post_json::<_, ChartReply>(endpoints::GENERATE_TABLE, &json!({ "prompt": prompt }))
                .await,
        )
        .map(|reply| reply.chart)
    }

    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Option<Place> {
        let body = json!({ "latitude": latitude, "longitude": longitude });
        settle(
            endpoints::LOCATION,
            self.post_json::<_, Place>(endpoints::LOCATION, &body).await,
        )
        .map(|mut place| {
            place.latitude = latitude;
            place.longitude = longitude;
            place
        })
    }

    async fn live_token(&self) -> Option<String> {
        settle(
            endpoints::LIVE_TOKEN,
            self.get_json::<TokenReply>(endpoints::LIVE_TOKEN).await,
        )
        .map(|reply| reply.token)
    }
}

#[async_trait]
impl Transcriber for BackendGateway {
    async fn transcribe(&self, clip: &AudioClip) -> lia_core::Result<String> {
        self.try_transcribe(clip)
            .await
            .map_err(|e| lia_core::Error::Transcription(e.to_string()))
    }

    fn name(&self) -> &str {
        "backend"
    }
}
