use crate::core::RegisterConfig;
use crate::edinet::index::{annual_reports, IndexResponse};
use crate::edinet::parsing::format_fragment;
use crate::edinet::FilingDescriptor;
use crate::storage::ObjectStore;
use crate::utils::rate_limit::RateLimiter;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use encoding_rs::{Encoding, UTF_8};
use reqwest::Client;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

/// Number of remote API calls made during a run.
pub type CallCounter = Arc<AtomicUsize>;

/// The XBRL instance of one filing, decoded to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFiling {
    pub doc_id: String,
    pub date_key: String,
    pub file_name: String,
    pub body: String,
}

#[async_trait]
pub trait FilingIndex: Send + Sync {
    /// Annual reports submitted on `date`.
    async fn list(&self, date: NaiveDate) -> Result<Vec<FilingDescriptor>>;
}

#[async_trait]
pub trait FilingSource: Send + Sync {
    async fn fetch(&self, descriptor: &FilingDescriptor) -> Result<RawFiling>;
}

#[async_trait]
impl<T: FilingSource + ?Sized> FilingSource for Arc<T> {
    async fn fetch(&self, descriptor: &FilingDescriptor) -> Result<RawFiling> {
        self.as_ref().fetch(descriptor).await
    }
}

/// Walks the index day by day over an inclusive date range.
pub async fn list_range(
    index: &dyn FilingIndex,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<FilingDescriptor>> {
    let mut descriptors = Vec::new();
    for date in from.iter_days().take_while(|date| *date <= to) {
        let reports = index.list(date).await?;
        log::info!("{}: {} annual reports", date, reports.len());
        descriptors.extend(reports);
    }
    Ok(descriptors)
}

/// Decodes filing bytes, honouring a BOM and falling back to charset
/// detection for the occasional Shift_JIS document.
pub fn decode_body(bytes: &[u8]) -> String {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        return text.into_owned();
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    let (charset, confidence, _) = chardet::detect(bytes);
    let encoding = Encoding::for_label(chardet::charset2encoding(&charset).as_bytes()).unwrap_or(UTF_8);
    log::debug!(
        "Decoding filing as {} (detected {} with confidence {})",
        encoding.name(),
        charset,
        confidence
    );
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Pulls the public XBRL instance out of an EDINET document archive.
pub fn extract_xbrl(archive: &[u8]) -> Result<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive))
        .context("Document response is not a zip archive")?;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();
        if name.contains("PublicDoc") && name.ends_with(".xbrl") {
            let mut body = Vec::new();
            file.read_to_end(&mut body)
                .with_context(|| format!("Failed to read {} from archive", name))?;
            let file_name = name.rsplit('/').next().unwrap_or(&name).to_string();
            return Ok((file_name, body));
        }
    }
    Err(anyhow!("No PublicDoc XBRL instance in archive"))
}

/// Client for the EDINET document API.
pub struct EdinetClient {
    client: Client,
    base_url: Url,
    api_key: String,
    calls: CallCounter,
    limiter: &'static RateLimiter,
}

impl EdinetClient {
    pub fn new(config: &RegisterConfig, calls: CallCounter) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();
        let client = Client::builder()
            .timeout(config.request_timeout)
            .gzip(true)
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            api_key,
            calls,
            limiter: RateLimiter::edinet(config.max_concurrent),
        })
    }

    fn index_url(&self, date: NaiveDate) -> Result<Url> {
        let mut url = self.base_url.join("documents.json")?;
        url.query_pairs_mut()
            .append_pair("date", &date.format("%Y-%m-%d").to_string())
            .append_pair("type", "2")
            .append_pair("Subscription-Key", &self.api_key);
        Ok(url)
    }

    fn document_url(&self, doc_id: &str) -> Result<Url> {
        let mut url = self.base_url.join(&format!("documents/{}", doc_id))?;
        url.query_pairs_mut()
            .append_pair("type", "1")
            .append_pair("Subscription-Key", &self.api_key);
        Ok(url)
    }

    async fn get_bytes(&self, url: Url) -> Result<(Option<String>, Vec<u8>)> {
        let _permit = self.limiter.acquire().await?;
        self.calls.fetch_add(1, Ordering::SeqCst);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("EDINET API returned status {}", status));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;
        Ok((content_type, body.to_vec()))
    }
}

#[async_trait]
impl FilingIndex for EdinetClient {
    async fn list(&self, date: NaiveDate) -> Result<Vec<FilingDescriptor>> {
        let (_, body) = self.get_bytes(self.index_url(date)?).await?;
        let response: IndexResponse = serde_json::from_slice(&body)
            .with_context(|| format!("Failed to parse document index for {}", date))?;
        if !response.metadata.status.is_empty() && response.metadata.status != "200" {
            return Err(anyhow!(
                "Document index for {} failed: {} {}",
                date,
                response.metadata.status,
                response.metadata.message
            ));
        }
        Ok(annual_reports(date, response))
    }
}

#[async_trait]
impl FilingSource for EdinetClient {
    async fn fetch(&self, descriptor: &FilingDescriptor) -> Result<RawFiling> {
        let (content_type, body) = self.get_bytes(self.document_url(&descriptor.doc_id)?).await?;

        // Errors come back as JSON with a 200 status.
        let is_json = content_type
            .as_deref()
            .and_then(|value| value.parse::<mime::Mime>().ok())
            .map(|parsed| parsed.subtype() == mime::JSON)
            .unwrap_or(false);
        if is_json {
            return Err(anyhow!(
                "EDINET refused document {}: {}",
                descriptor.doc_id,
                String::from_utf8_lossy(&body)
            ));
        }

        let (file_name, xbrl) = extract_xbrl(&body)?;
        Ok(RawFiling {
            doc_id: descriptor.doc_id.clone(),
            date_key: descriptor.date_key.clone(),
            file_name,
            body: decode_body(&xbrl),
        })
    }
}

/// Keeps a copy of every downloaded instance, plus a readable HTML rendering,
/// and can serve later runs from that copy.
pub struct CachedSource<S> {
    inner: S,
    raw: Arc<dyn ObjectStore>,
    read_cache: bool,
}

impl<S: FilingSource> CachedSource<S> {
    pub fn new(inner: S, raw: Arc<dyn ObjectStore>, read_cache: bool) -> Self {
        Self {
            inner,
            raw,
            read_cache,
        }
    }

    fn prefix(descriptor: &FilingDescriptor) -> String {
        format!("{}/{}/", descriptor.date_key, descriptor.doc_id)
    }

    async fn cached(&self, descriptor: &FilingDescriptor) -> Result<Option<RawFiling>> {
        let prefix = Self::prefix(descriptor);
        let keys = self.raw.list(&prefix).await?;
        let Some(key) = keys.into_iter().find(|key| key.ends_with(".xbrl")) else {
            return Ok(None);
        };
        let Some(bytes) = self.raw.get(&key).await? else {
            return Ok(None);
        };
        Ok(Some(RawFiling {
            doc_id: descriptor.doc_id.clone(),
            date_key: descriptor.date_key.clone(),
            file_name: key.trim_start_matches(&prefix).to_string(),
            body: decode_body(&bytes),
        }))
    }

    async fn store(&self, filing: &RawFiling, descriptor: &FilingDescriptor) -> Result<()> {
        let prefix = Self::prefix(descriptor);
        let xbrl_key = format!("{}{}", prefix, filing.file_name);
        if !self.raw.exists(&xbrl_key).await? {
            self.raw
                .put(&xbrl_key, filing.body.as_bytes().to_vec(), &mime::TEXT_XML)
                .await?;
        }

        let html_key = match xbrl_key.strip_suffix(".xbrl") {
            Some(stem) => format!("{}.html", stem),
            None => format!("{}.html", xbrl_key),
        };
        if !self.raw.exists(&html_key).await? {
            let html = format_fragment(&filing.body);
            self.raw
                .put(&html_key, html.into_bytes(), &mime::TEXT_HTML_UTF_8)
                .await?;
            log::info!("Stored original HTML {}", html_key);
        }
        Ok(())
    }
}

#[async_trait]
impl<S: FilingSource> FilingSource for CachedSource<S> {
    async fn fetch(&self, descriptor: &FilingDescriptor) -> Result<RawFiling> {
        if self.read_cache {
            if let Some(filing) = self.cached(descriptor).await? {
                log::debug!("Serving {} from raw cache", descriptor.doc_id);
                return Ok(filing);
            }
        }
        let filing = self.inner.fetch(descriptor).await?;
        self.store(&filing, descriptor)
            .await
            .with_context(|| format!("Failed to cache raw filing {}", descriptor.doc_id))?;
        Ok(filing)
    }
}
