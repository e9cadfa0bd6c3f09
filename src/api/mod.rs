//! Typed calls against the AI microservices backend.

use log::debug;

use crate::http::{
    ApiClient, ClientConfig, FormData, NormalizedError, RequestOptions, ReqwestTransport,
    Transport,
};
use crate::models::{
    LearningPathOptions, LearningPathRequest, LearningPathResponse, QaRequest, QaResponse,
    SummarizationRequest, SummarizationResponse,
};

pub const SUMMARIZE_PATH: &str = "/api/summarize";
pub const QA_PATH: &str = "/api/qa";
pub const LEARNING_PATH_PATH: &str = "/api/learning-path";
pub const LEARNING_PATH_OPTIONS_PATH: &str = "/api/learning-path/options";

/// Content type sent for uploaded documents.
pub const DOCUMENT_CONTENT_TYPE: &str = "text/plain";

pub struct ApiService<T = ReqwestTransport> {
    client: ApiClient<T>,
}

impl ApiService<ReqwestTransport> {
    pub fn new(config: ClientConfig) -> Self {
        Self::from_client(ApiClient::new(config))
    }
}

impl<T: Transport> ApiService<T> {
    pub fn from_client(client: ApiClient<T>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient<T> {
        &self.client
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn summarize_text(
        &self,
        request: &SummarizationRequest,
    ) -> Result<SummarizationResponse, NormalizedError> {
        debug!("Summarizing {} characters", request.text.chars().count());
        self.client
            .post(SUMMARIZE_PATH, request, RequestOptions::default())
            .await
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn answer_question(&self, request: &QaRequest) -> Result<QaResponse, NormalizedError> {
        self.client
            .post(QA_PATH, request, RequestOptions::default())
            .await
    }

    /// Asks a question about an uploaded plain-text document.
    #[tracing::instrument(skip(self, question, contents))]
    pub async fn upload_document_question(
        &self,
        question: &str,
        filename: &str,
        contents: Vec<u8>,
    ) -> Result<QaResponse, NormalizedError> {
        debug!("Uploading {} ({} bytes)", filename, contents.len());
        let form = FormData::new().text("question", question).file(
            "file",
            filename,
            DOCUMENT_CONTENT_TYPE,
            contents,
        );
        self.client
            .upload(QA_PATH, form, RequestOptions::default())
            .await
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn generate_learning_path(
        &self,
        request: &LearningPathRequest,
    ) -> Result<LearningPathResponse, NormalizedError> {
        self.client
            .post(LEARNING_PATH_PATH, request, RequestOptions::default())
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn learning_path_options(&self) -> Result<LearningPathOptions, NormalizedError> {
        self.client
            .get(LEARNING_PATH_OPTIONS_PATH, RequestOptions::default())
            .await
    }

    pub async fn health_check(&self) -> bool {
        self.client.health_check().await
    }
}
