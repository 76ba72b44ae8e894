//! Batch orchestrator.
//!
//! Processes an ordered list of (filename, bytes) items with a bounded
//! worker pool. Each item runs the full pipeline independently — parse,
//! classify, wrong-type check, primary-schema validation, extraction,
//! and (for emissora filings) remote link resolution — and writes its
//! result into the slot matching its input index, so output order always
//! matches input order regardless of completion order. No item failure
//! of any kind removes or reorders other items.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::classify::{Role, classify};
use crate::document::ParsedDocument;
use crate::error::ProcessError;
use crate::extract::{
    extract_dates, extract_institution, extract_registered_diplomas, find_diploma_urls,
};
use crate::fields;
use crate::http_client::{AsyncHttpClient, HttpClientConfig};
use crate::model::{BatchResult, FileReport, FileResult};
use crate::resolver::LinkResolver;
use crate::registry::SchemaRegistry;
use crate::validator::validate;

/// One input item of a batch.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Concurrent items processed per batch.
    pub max_concurrent_files: usize,
    /// Concurrent link fetches per emissora file.
    pub max_concurrent_fetches: usize,
    /// Timeout per remote diploma fetch, in seconds.
    pub fetch_timeout_seconds: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_files: num_cpus::get(),
            max_concurrent_fetches: 8,
            fetch_timeout_seconds: 20,
        }
    }
}

/// Stateless batch processor sharing the read-only schema registry.
pub struct BatchProcessor {
    registry: Arc<SchemaRegistry>,
    http: AsyncHttpClient,
    config: BatchConfig,
}

impl BatchProcessor {
    pub fn new(registry: Arc<SchemaRegistry>, config: BatchConfig) -> Result<Self, crate::error::FetchError> {
        let http = AsyncHttpClient::new(HttpClientConfig {
            timeout_seconds: config.fetch_timeout_seconds,
            ..HttpClientConfig::default()
        })?;

        Ok(Self {
            registry,
            http,
            config,
        })
    }

    /// Process every item of a batch, isolating failures per item.
    ///
    /// Always returns exactly one `FileResult` per input item, in input
    /// order.
    pub async fn process_batch(
        &self,
        items: Vec<BatchItem>,
        expected_role: Option<Role>,
    ) -> BatchResult {
        let total = items.len();
        info!(total, expected = ?expected_role, "processing batch");

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_files.max(1)));
        let filenames: Vec<String> = items.iter().map(|i| i.filename.clone()).collect();

        let handles: Vec<_> = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let registry = Arc::clone(&self.registry);
                let http = self.http.clone();
                let semaphore = Arc::clone(&semaphore);
                let max_fetches = self.config.max_concurrent_fetches;

                tokio::spawn(async move {
                    // Closed semaphore is unreachable; treat it as an
                    // unhandled per-item failure rather than a panic.
                    let _permit = match semaphore.acquire().await {
                        Ok(permit) => permit,
                        Err(e) => {
                            return (
                                index,
                                FileResult::unhandled(
                                    item.filename,
                                    ProcessError::Unhandled {
                                        details: e.to_string(),
                                    }
                                    .to_string(),
                                    None,
                                ),
                            );
                        }
                    };

                    let result =
                        Self::process_single(registry, http, max_fetches, item, expected_role)
                            .await;
                    (index, result)
                })
            })
            .collect();

        let mut slots: Vec<Option<FileResult>> = (0..total).map(|_| None).collect();
        for (position, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok((index, result)) => slots[index] = Some(result),
                Err(join_error) => {
                    // A panicked worker still yields a result for its
                    // item; the rest of the batch is unaffected.
                    warn!(file = %filenames[position], error = %join_error, "batch worker panicked");
                    slots[position] = Some(FileResult::unhandled(
                        filenames[position].clone(),
                        ProcessError::Unhandled {
                            details: join_error.to_string(),
                        }
                        .to_string(),
                        Some(join_error.to_string()),
                    ));
                }
            }
        }

        BatchResult {
            files: slots.into_iter().flatten().collect(),
            available_fields: fields::catalog(),
        }
    }

    /// Full pipeline for one item.
    async fn process_single(
        registry: Arc<SchemaRegistry>,
        http: AsyncHttpClient,
        max_fetches: usize,
        item: BatchItem,
        expected_role: Option<Role>,
    ) -> FileResult {
        let BatchItem { filename, data } = item;

        let doc = match ParsedDocument::parse(registry.wrapper(), &data) {
            Ok(doc) => doc,
            Err(e) => {
                let diagnostic = ProcessError::from(e).to_string();
                return FileResult::parse_failure(filename, diagnostic);
            }
        };

        let role = classify(&doc);

        let wrong_type = matches!(
            (expected_role, role),
            (Some(expected), found) if found != expected && found != Role::Desconhecido
        );

        let outcome = validate(registry.wrapper(), registry.fiscal_schema(), &doc);

        let mut errors = outcome.diagnostics.clone();
        if wrong_type {
            // expected_role is always Some here.
            let expected = expected_role.unwrap_or(Role::Desconhecido);
            errors.push(
                ProcessError::WrongRole {
                    expected: expected.to_string(),
                    found: role.to_string(),
                }
                .to_string(),
            );
        }

        let mut report = FileReport {
            ok: outcome.passed && !wrong_type,
            tipo: role,
            errors,
            validation_errors: Vec::new(),
            fetch_errors: Vec::new(),
            wrong_type,
            trace: None,
        };

        // Extraction never runs on invalid or wrong-typed documents.
        if !report.ok {
            return FileResult {
                filename,
                tipo: role,
                ies_info: None,
                dates_info: None,
                diplomas: Vec::new(),
                report,
            };
        }

        // Extraction is skipped entirely for unclassifiable documents.
        let (ies_info, dates_info) = if role == Role::Desconhecido {
            (None, None)
        } else {
            (extract_institution(&doc, role), Some(extract_dates(&doc)))
        };

        let diplomas = match role {
            Role::Emissora => {
                let urls = find_diploma_urls(&doc);
                let resolver = LinkResolver::new(registry, http, max_fetches);
                let resolved = resolver.resolve(&urls).await;
                report.validation_errors = resolved.validation_errors;
                report.fetch_errors = resolved.fetch_errors;
                resolved.records
            }
            Role::Registradora => extract_registered_diplomas(&doc),
            Role::Desconhecido => Vec::new(),
        };

        FileResult {
            filename,
            tipo: role,
            ies_info,
            dates_info,
            diplomas,
            report,
        }
    }
}
