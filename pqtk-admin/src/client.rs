//! REST transport for the PQTK backend
//!
//! Every JSON response is run through [`pqtk_common::validate`] before it
//! reaches a caller; a body that does not match its schema surfaces as
//! [`ClientError::InvalidData`] with every field issue logged. Requests are
//! never retried.

use crate::builder::SetupStore;
use crate::error::ClientError;
use crate::session::Session;
use crate::upload::{UploadBatch, UploadCandidate};
use async_trait::async_trait;
use pqtk_common::config::ClientSettings;
use pqtk_common::models::{
    ExperimentName, ExperimentSetup, ExperimentsList, RatedSample, ResultsList, SamplePaths,
    SamplesList, SuccessResponse, TestType, TokenResponse, UserData,
};
use pqtk_common::{validate, Schema, ValidationReport};
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const USER_AGENT: &str = concat!("pqtk-admin/", env!("CARGO_PKG_VERSION"));
const API_PREFIX: [&str; 2] = ["api", "v1"];

/// Fixed OAuth2 password-grant fields the backend expects
const LOGIN_USERNAME: &str = "admin";
const LOGIN_CLIENT_ID: &str = "string";
const LOGIN_CLIENT_SECRET: &str = "string";

/// Backend client; owns the HTTP connection pool and the session token
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    session: Session,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, session: Session) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ClientError::Transport(format!("Invalid base URL {:?}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Transport(format!(
                "Invalid base URL {:?}",
                base_url.as_str()
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    /// Client for resolved settings, loading the session from the token file
    pub fn from_settings(settings: &ClientSettings) -> Result<Self, ClientError> {
        let session = Session::load(&settings.token_file)?;
        Self::new(&settings.api_base_url, settings.request_timeout, session)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/api/v1/{segments...}` with every segment percent-encoded
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(API_PREFIX);
            path.extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send and map non-2xx statuses onto [`ClientError`]
    async fn send(&self, request: RequestBuilder) -> Result<Response, ClientError> {
        let request = request.header(reqwest::header::ACCEPT, "application/json").build()?;
        let label = format!("{} {}", request.method(), request.url().path());
        debug!(request = %label, "Sending request");

        let response = self.http.execute(request).await.map_err(|e| {
            error!(request = %label, "Request failed: {}", e);
            ClientError::from(e)
        })?;

        let status = response.status();
        debug!(request = %label, status = status.as_u16(), "Response received");
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED => {
                if self.session.is_authenticated() {
                    warn!(request = %label, "Token rejected, discarding stored session");
                    if let Err(e) = self.session.discard_file() {
                        warn!("Failed to remove token file: {}", e);
                    }
                }
                Err(ClientError::Unauthorized)
            }
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(label)),
            _ => {
                let body = response.text().await.unwrap_or_default();
                error!(request = %label, status = status.as_u16(), "API error: {}", body);
                Err(ClientError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// Read a JSON body and validate it into `T`
    async fn parse<T: Schema>(&self, response: Response) -> Result<T, ClientError> {
        let endpoint = response.url().path().to_string();
        let bytes = response.bytes().await?;

        let outcome = serde_json::from_slice::<serde_json::Value>(&bytes)
            .map_err(|e| ValidationReport::single("", format!("invalid JSON: {}", e)))
            .and_then(|value| validate::<T>(&value));

        outcome.map_err(|report| {
            error!(endpoint = %endpoint, "Invalid data from API");
            for issue in report.issues() {
                error!(endpoint = %endpoint, "  {}", issue);
            }
            ClientError::InvalidData { endpoint, report }
        })
    }

    /// Send a mutation and require a `{"success": true}` acknowledgement
    async fn acknowledged(&self, request: RequestBuilder) -> Result<(), ClientError> {
        let response = self.send(request).await?;
        let endpoint = response.url().path().to_string();
        let ack: SuccessResponse = self.parse(response).await?;
        if !ack.success {
            error!(endpoint = %endpoint, "Backend reported failure");
            return Err(ClientError::Rejected(endpoint));
        }
        Ok(())
    }

    async fn get_json<T: Schema>(&self, segments: &[&str]) -> Result<T, ClientError> {
        let request = self.authorized(self.http.get(self.endpoint(segments)));
        let response = self.send(request).await?;
        self.parse(response).await
    }

    async fn get_bytes(&self, url: Url) -> Result<Vec<u8>, ClientError> {
        let request = self.authorized(self.http.get(url));
        let response = self.send(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ========================================
    // Auth
    // ========================================

    /// Exchange the admin password for a bearer token and persist it
    pub async fn login(&mut self, password: &str) -> Result<(), ClientError> {
        let form = [
            ("grant_type", "password"),
            ("username", LOGIN_USERNAME),
            ("password", password),
            ("client_id", LOGIN_CLIENT_ID),
            ("client_secret", LOGIN_CLIENT_SECRET),
        ];
        let request = self.http.post(self.endpoint(&["auth", "login"])).form(&form);
        let response = self.send(request).await?;
        let token: TokenResponse = self.parse(response).await?;

        self.session.store(token.access_token)?;
        info!("Logged in");
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.session.clear()?;
        Ok(())
    }

    pub async fn current_user(&self) -> Result<UserData, ClientError> {
        self.get_json(&["auth", "user"]).await
    }

    // ========================================
    // Experiments
    // ========================================

    pub async fn list_experiments(&self) -> Result<Vec<String>, ClientError> {
        let list: ExperimentsList = self.get_json(&["experiments"]).await?;
        Ok(list.experiments)
    }

    pub async fn create_experiment(&self, name: &str) -> Result<(), ClientError> {
        let body = ExperimentName {
            name: name.to_string(),
        };
        let request = self.authorized(self.http.post(self.endpoint(&["experiments"])).json(&body));
        self.acknowledged(request).await?;
        info!(experiment = %name, "Created experiment");
        Ok(())
    }

    pub async fn delete_experiment(&self, name: &str) -> Result<(), ClientError> {
        let body = ExperimentName {
            name: name.to_string(),
        };
        let request = self.authorized(self.http.delete(self.endpoint(&["experiments"])).json(&body));
        self.acknowledged(request).await?;
        info!(experiment = %name, "Deleted experiment");
        Ok(())
    }

    pub async fn fetch_setup(&self, name: &str) -> Result<ExperimentSetup, ClientError> {
        self.get_json(&["experiments", name]).await
    }

    /// Persist the whole setup as a `setup.json` multipart file
    pub async fn save_setup(&self, name: &str, setup: &ExperimentSetup) -> Result<(), ClientError> {
        let json = setup
            .to_json()
            .map_err(|e| ClientError::Local(pqtk_common::Error::Json(e)))?;
        let part = Part::bytes(json.into_bytes())
            .file_name("setup.json")
            .mime_str("application/json")?;
        let form = Form::new().part("file", part);

        let request = self.authorized(self.http.post(self.endpoint(&["experiments", name])).multipart(form));
        self.acknowledged(request).await?;
        info!(experiment = %name, tests = setup.tests.len(), "Saved experiment setup");
        Ok(())
    }

    // ========================================
    // Experiment samples
    // ========================================

    /// Asset paths in the experiment's sample pool
    pub async fn list_experiment_samples(&self, name: &str) -> Result<Vec<String>, ClientError> {
        self.get_json(&["experiments", name, "samples"]).await
    }

    /// Single-file upload into the experiment pool
    pub async fn upload_experiment_sample(
        &self,
        name: &str,
        file: &UploadCandidate,
    ) -> Result<(), ClientError> {
        let form = Form::new().part("file", file_part(file)?);
        let request = self.authorized(
            self.http
                .post(self.endpoint(&["experiments", name, "samples"]))
                .multipart(form),
        );
        self.acknowledged(request).await?;
        Ok(())
    }

    /// Upload new files and copy library samples in one request; returns new asset paths
    pub async fn upload_experiment_samples(
        &self,
        name: &str,
        batch: &UploadBatch,
    ) -> Result<Vec<String>, ClientError> {
        let mut form = Form::new();
        for file in &batch.files {
            form = form
                .part("files", file_part(file)?)
                .text("titles", file.name.clone());
        }
        for id in &batch.sample_ids {
            form = form.text("sample_ids", id.clone());
        }

        let request = self.authorized(
            self.http
                .post(self.endpoint(&["experiments", name, "samples", "v2"]))
                .multipart(form),
        );
        let response = self.send(request).await?;
        let paths: SamplePaths = self.parse(response).await?;
        info!(experiment = %name, added = paths.asset_path.len(), "Uploaded samples");
        Ok(paths.asset_path)
    }

    // ========================================
    // Results
    // ========================================

    pub async fn fetch_results(&self, name: &str) -> Result<ResultsList, ClientError> {
        self.get_json(&["experiments", name, "results"]).await
    }

    pub async fn submit_results(&self, name: &str, results: &ResultsList) -> Result<(), ClientError> {
        let request = self.authorized(
            self.http
                .post(self.endpoint(&["experiments", name, "results"]))
                .json(results),
        );
        self.send(request).await?;
        info!(experiment = %name, results = results.results.len(), "Submitted results");
        Ok(())
    }

    /// CSV export of one test's results
    pub async fn download_test_csv(
        &self,
        name: &str,
        test_number: u32,
        test_type: TestType,
    ) -> Result<Vec<u8>, ClientError> {
        let number = test_number.to_string();
        let mut url = self.endpoint(&["experiments", name, &number, "download_csv"]);
        url.query_pairs_mut().append_pair("test_type", test_type.as_str());
        self.get_bytes(url).await
    }

    /// Zip archive with the CSV of every test
    pub async fn download_all_csv(&self, name: &str) -> Result<Vec<u8>, ClientError> {
        self.get_bytes(self.endpoint(&["experiments", name, "download_csv"]))
            .await
    }

    // ========================================
    // Sample library
    // ========================================

    pub async fn list_library_samples(&self) -> Result<Vec<RatedSample>, ClientError> {
        let list: SamplesList = self.get_json(&["samples"]).await?;
        Ok(list.samples)
    }

    pub async fn upload_library_samples(&self, files: &[UploadCandidate]) -> Result<(), ClientError> {
        let mut form = Form::new();
        for file in files {
            form = form
                .part("files", file_part(file)?)
                .text("titles", file.name.clone());
        }
        let request = self.authorized(self.http.post(self.endpoint(&["samples"])).multipart(form));
        self.send(request).await?;
        info!(count = files.len(), "Uploaded library samples");
        Ok(())
    }

    pub async fn delete_library_sample(&self, sample_id: &str) -> Result<(), ClientError> {
        let request = self.authorized(self.http.delete(self.endpoint(&["samples", sample_id])));
        self.send(request).await?;
        info!(sample_id = %sample_id, "Deleted library sample");
        Ok(())
    }

    pub async fn rate_sample(&self, sample: &RatedSample) -> Result<(), ClientError> {
        let request = self.authorized(self.http.put(self.endpoint(&["samples", "rate"])).json(sample));
        self.send(request).await?;
        Ok(())
    }

    /// URL that streams a library sample's audio
    pub fn sample_stream_url(&self, filename: &str) -> Url {
        let mut url = self.endpoint(&["samples", "stream"]);
        url.query_pairs_mut().append_pair("filename", filename);
        url
    }

    pub async fn download_sample(&self, filename: &str) -> Result<Vec<u8>, ClientError> {
        self.get_bytes(self.sample_stream_url(filename)).await
    }
}

fn file_part(file: &UploadCandidate) -> Result<Part, ClientError> {
    Ok(Part::bytes(file.bytes.clone())
        .file_name(file.name.clone())
        .mime_str(&file.mime_type())?)
}

#[async_trait]
impl SetupStore for ApiClient {
    async fn fetch_setup(&self, name: &str) -> Result<ExperimentSetup, ClientError> {
        ApiClient::fetch_setup(self, name).await
    }

    async fn save_setup(&self, name: &str, setup: &ExperimentSetup) -> Result<(), ClientError> {
        ApiClient::save_setup(self, name, setup).await
    }

    async fn list_samples(&self, name: &str) -> Result<Vec<String>, ClientError> {
        self.list_experiment_samples(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(base, Duration::from_secs(5), Session::ephemeral(None)).unwrap()
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let c = client("http://localhost:8787");
        let url = c.endpoint(&["experiments", "My Test/1"]);
        assert_eq!(url.as_str(), "http://localhost:8787/api/v1/experiments/My%20Test%2F1");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let c = client("https://host.example/pqtk/");
        assert_eq!(
            c.endpoint(&["samples"]).as_str(),
            "https://host.example/pqtk/api/v1/samples"
        );
    }

    #[test]
    fn test_stream_url_query() {
        let c = client("http://localhost:8787");
        assert_eq!(
            c.sample_stream_url("a b.wav").as_str(),
            "http://localhost:8787/api/v1/samples/stream?filename=a+b.wav"
        );
    }

    #[test]
    fn test_rejects_unusable_base() {
        assert!(ApiClient::new("mailto:x@y", Duration::from_secs(1), Session::ephemeral(None)).is_err());
        assert!(ApiClient::new("not a url", Duration::from_secs(1), Session::ephemeral(None)).is_err());
    }
}
