//! arXiv Atom API client

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ArxivConfig;
use crate::error::{Error, Result};

/// Paper metadata from one Atom `<entry>`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArxivPaper {
    pub title: String,
    /// Author names joined with ", "
    pub authors: String,
    #[serde(rename = "abstract")]
    pub summary: String,
    pub published: String,
    pub url: Option<String>,
}

/// Client for `export.arxiv.org/api/query`
pub struct ArxivClient {
    client: Client,
    base_url: String,
    max_results_cap: usize,
}

impl ArxivClient {
    pub fn new(config: &ArxivConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            max_results_cap: config.max_results_cap,
        })
    }

    /// Fetch up to `max_results` papers (clamped to the configured cap),
    /// most relevant first
    pub async fn fetch(&self, query: &str, max_results: usize) -> Result<Vec<ArxivPaper>> {
        let max_results = max_results.min(self.max_results_cap);
        tracing::info!("Fetching up to {} papers from arXiv for {:?}", max_results, query);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", query),
                ("start", "0"),
                ("max_results", &max_results.to_string()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|e| Error::External(format!("arXiv request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::External(format!(
                "Failed to fetch data from arXiv: HTTP {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::External(format!("Failed to read arXiv response: {}", e)))?;

        let papers = parse_feed(&body)?;
        tracing::info!("arXiv returned {} papers", papers.len());
        Ok(papers)
    }
}

/// Parse an Atom feed into papers. Whitespace inside fields is collapsed.
pub fn parse_feed(xml: &str) -> Result<Vec<ArxivPaper>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut papers = Vec::new();
    let mut current: Option<ArxivPaper> = None;
    let mut authors: Vec<String> = Vec::new();
    let mut entry_id: Option<String> = None;
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                if name == b"entry" {
                    current = Some(ArxivPaper::default());
                    authors.clear();
                    entry_id = None;
                } else if name == b"link" {
                    take_link(&e, current.as_mut());
                }
                path.push(name);
                text.clear();
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"link" {
                    take_link(&e, current.as_mut());
                }
            }
            Ok(Event::Text(e)) => {
                let chunk = e
                    .unescape()
                    .map_err(|e| Error::External(format!("Malformed arXiv feed: {}", e)))?;
                text.push_str(&chunk);
            }
            Ok(Event::CData(e)) => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::End(_)) => {
                let name = path.pop().unwrap_or_default();
                if name == b"entry" {
                    if let Some(mut paper) = current.take() {
                        paper.authors = authors.join(", ");
                        if paper.url.is_none() {
                            paper.url = entry_id.take();
                        }
                        papers.push(paper);
                    }
                } else if let Some(paper) = current.as_mut() {
                    let parent = path.last().map(|p| p.as_slice());
                    let value = collapse_whitespace(&text);
                    match (name.as_slice(), parent) {
                        (b"title", Some(b"entry")) => paper.title = value,
                        (b"summary", Some(b"entry")) => paper.summary = value,
                        (b"published", Some(b"entry")) => paper.published = value,
                        (b"id", Some(b"entry")) => entry_id = Some(value),
                        (b"name", Some(b"author")) => authors.push(value),
                        _ => {}
                    }
                }
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::External(format!("Malformed arXiv feed: {}", e))),
            _ => {}
        }
    }

    Ok(papers)
}

/// Keep the alternate (HTML) link as the paper URL
fn take_link(e: &BytesStart<'_>, paper: Option<&mut ArxivPaper>) {
    let Some(paper) = paper else {
        return;
    };
    let mut href = None;
    let mut rel = None;
    for attr in e.attributes().flatten() {
        let value = attr.unescape_value().ok().map(|v| v.into_owned());
        match attr.key.local_name().as_ref() {
            b"href" => href = value,
            b"rel" => rel = value,
            _ => {}
        }
    }
    if rel.as_deref().unwrap_or("alternate") == "alternate" && paper.url.is_none() {
        paper.url = href;
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
