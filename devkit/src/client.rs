/*!
Client HTTP pour le kernel DevWatch

Enveloppe `reqwest` autour des routes du kernel. Chaque appel renvoie le
statut et le corps (JSON si possible, sinon texte brut) sans juger du
résultat : les assertions restent dans les tests.
*/

use anyhow::{Context, Result};
use reqwest::{Client, Response, Url};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct KernelClient {
    base_url: String,
    http: Client,
}

impl KernelClient {
    /// `base_url` sans slash final, ex: `http://127.0.0.1:3000`
    pub fn new<S: Into<String>>(base_url: S) -> Result<Self> {
        env_logger::builder().is_test(true).try_init().ok();
        let http = Client::builder().build().context("build HTTP client")?;
        Ok(Self { base_url: base_url.into(), http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub async fn ingest(&self, payload: &Value) -> Result<ApiResponse> {
        let resp = self.http.post(self.url("/api/device-info")).json(payload).send().await?;
        log::debug!("POST /api/device-info -> {}", resp.status());
        read_response(resp).await
    }

    /// Corps brut avec `Content-Type: application/json`, pour les payloads invalides
    pub async fn ingest_raw(&self, body: &str) -> Result<ApiResponse> {
        let resp = self
            .http
            .post(self.url("/api/device-info"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await?;
        read_response(resp).await
    }

    pub async fn collections(&self) -> Result<ApiResponse> {
        self.get("/getCollections").await
    }

    pub async fn fetch_data(&self, collection: Option<&str>) -> Result<ApiResponse> {
        let url = match collection {
            Some(name) => Url::parse_with_params(&self.url("/fetchData"), &[("collection", name)])?,
            None => Url::parse(&self.url("/fetchData"))?,
        };
        let resp = self.http.get(url).send().await?;
        read_response(resp).await
    }

    pub async fn config(&self) -> Result<ApiResponse> {
        self.get("/config").await
    }

    pub async fn health(&self) -> Result<ApiResponse> {
        self.get("/health").await
    }

    pub async fn system_health(&self) -> Result<ApiResponse> {
        self.get("/system/health").await
    }

    /// Liste des partitions; échoue si le kernel ne répond pas 200
    pub async fn partition_names(&self) -> Result<Vec<String>> {
        let resp = self.collections().await?;
        if resp.status != 200 {
            anyhow::bail!("GET /getCollections returned {}: {}", resp.status, resp.body);
        }
        Ok(serde_json::from_value(resp.body)?)
    }

    async fn get(&self, path: &str) -> Result<ApiResponse> {
        let resp = self.http.get(self.url(path)).send().await?;
        log::debug!("GET {path} -> {}", resp.status());
        read_response(resp).await
    }
}

async fn read_response(resp: Response) -> Result<ApiResponse> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    let body = match serde_json::from_str(&text) {
        Ok(json) => json,
        Err(_) => Value::String(text),
    };
    Ok(ApiResponse { status, body })
}
