//! Client for the remote extraction service

use super::{Extractor, Submission};
use crate::error::IngestError;
use crate::types::{DocumentId, Page, Rect, Size, Word};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const INITIATE_PATH: &str = "iniciar_processamento";
const PAGE_PATH: &str = "obter_dados_pagina";

/// [`Extractor`] backed by the extraction service's HTTP API
pub struct HttpExtractor {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExtractor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[derive(Deserialize)]
struct InitiateResponse {
    status: String,
    id_arquivo: String,
    total_paginas: u32,
    nome_original: String,
}

#[derive(Serialize)]
struct PageRequest<'a> {
    id_arquivo: &'a str,
    numero_pagina: u32,
}

#[derive(Deserialize)]
struct PageResponse {
    status: String,
    dados: Option<PageData>,
}

#[derive(Deserialize)]
struct PageData {
    texto_completo: String,
    #[serde(default)]
    palavras: Vec<WordData>,
    #[serde(default)]
    dimensoes: Option<Dimensions>,
    #[serde(default)]
    extraido_por_ocr: bool,
}

#[derive(Deserialize)]
struct WordData {
    texto: String,
    coords: Coords,
}

#[derive(Deserialize)]
struct Coords {
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
}

#[derive(Deserialize)]
struct Dimensions {
    largura: f64,
    altura: f64,
}

#[derive(Deserialize)]
struct ErrorResponse {
    erro: String,
}

impl From<PageData> for Page {
    fn from(data: PageData) -> Self {
        Page {
            text: data.texto_completo,
            words: data
                .palavras
                .into_iter()
                .map(|w| Word::new(w.texto, Rect::new(w.coords.x0, w.coords.y0, w.coords.x1, w.coords.y1)))
                .collect(),
            dimensions: data
                .dimensoes
                .map(|d| Size::new(d.largura, d.altura))
                .unwrap_or_default(),
            recognized: data.extraido_por_ocr,
        }
    }
}

/// Decode a success body, or turn the service's `erro` message into a request error
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, IngestError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let message = match response.json::<ErrorResponse>().await {
        Ok(body) => body.erro,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    Err(IngestError::Request(format!("HTTP {}: {}", status.as_u16(), message)))
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn initiate(&self, file_name: &str, bytes: Vec<u8>) -> Result<Submission, IngestError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(INITIATE_PATH))
            .multipart(form)
            .send()
            .await?;
        let body: InitiateResponse = read_json(response).await?;

        if body.status != "iniciado" {
            return Err(IngestError::Request(format!(
                "unexpected upload status '{}'",
                body.status
            )));
        }
        let id = DocumentId::parse(body.id_arquivo)
            .map_err(|e| IngestError::Request(e.to_string()))?;

        tracing::debug!(doc_id = %id, total_pages = body.total_paginas, "Upload accepted");
        Ok(Submission {
            id,
            total_pages: body.total_paginas,
            original_name: body.nome_original,
        })
    }

    async fn fetch_page(&self, id: &DocumentId, page_number: u32) -> Result<Page, IngestError> {
        let response = self
            .client
            .post(self.url(PAGE_PATH))
            .json(&PageRequest {
                id_arquivo: id.as_str(),
                numero_pagina: page_number,
            })
            .send()
            .await?;
        let body: PageResponse = read_json(response).await?;

        match body {
            PageResponse {
                status,
                dados: Some(data),
            } if status == "sucesso" => Ok(data.into()),
            PageResponse { status, .. } => Err(IngestError::InvalidPage {
                page: page_number,
                reason: format!("status '{}' without page data", status),
            }),
        }
    }
}
