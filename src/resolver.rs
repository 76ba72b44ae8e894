//! Remote link resolver for emissora filings.
//!
//! Fetches each referenced diploma document, parses it, validates it
//! against the secondary schema, and extracts its fields. Each URL is
//! isolated from its siblings: a timeout or bad response on one link
//! neither delays nor cancels the others, and resulting records keep the
//! discovery order of the URLs regardless of completion order.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;
use tracing::debug;

use crate::document::ParsedDocument;
use crate::extract::extract_emitted_fields;
use crate::http_client::AsyncHttpClient;
use crate::model::{DiplomaRecord, LinkFetchError, LinkValidationError, RecordStatus};
use crate::registry::SchemaRegistry;
use crate::validator::validate;

/// Aggregated outcome of resolving one file's links.
#[derive(Debug, Default)]
pub struct ResolvedLinks {
    /// One record per successfully fetched document, in URL discovery
    /// order. Fetch failures produce no record.
    pub records: Vec<DiplomaRecord>,
    /// Validation failures of fetched documents, keyed by URL.
    pub validation_errors: Vec<LinkValidationError>,
    /// Fetch failures (network, timeout, non-success status), keyed by
    /// URL.
    pub fetch_errors: Vec<LinkFetchError>,
}

/// Per-URL outcome, kept indexed so aggregation can restore discovery
/// order after unordered completion.
enum LinkOutcome {
    Resolved {
        record: DiplomaRecord,
        diagnostics: Option<Vec<String>>,
    },
    Failed {
        error: String,
    },
}

/// Resolves one document's diploma links with bounded concurrency.
pub struct LinkResolver {
    registry: Arc<SchemaRegistry>,
    http: AsyncHttpClient,
    max_concurrent: usize,
}

impl LinkResolver {
    pub fn new(registry: Arc<SchemaRegistry>, http: AsyncHttpClient, max_concurrent: usize) -> Self {
        Self {
            registry,
            http,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Fetch, parse, validate, and extract every URL.
    pub async fn resolve(&self, urls: &[String]) -> ResolvedLinks {
        let outcomes: Vec<(usize, String, LinkOutcome)> = stream::iter(urls.iter().cloned().enumerate())
            .map(|(index, url)| async move {
                let outcome = self.resolve_one(&url).await;
                (index, url, outcome)
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        let mut slots: Vec<Option<(String, LinkOutcome)>> =
            (0..urls.len()).map(|_| None).collect();
        for (index, url, outcome) in outcomes {
            slots[index] = Some((url, outcome));
        }

        let mut resolved = ResolvedLinks::default();
        for slot in slots.into_iter().flatten() {
            match slot {
                (url, LinkOutcome::Resolved { record, diagnostics }) => {
                    if let Some(errors) = diagnostics {
                        resolved.validation_errors.push(LinkValidationError {
                            url,
                            errors,
                        });
                    }
                    resolved.records.push(record);
                }
                (url, LinkOutcome::Failed { error }) => {
                    resolved.fetch_errors.push(LinkFetchError { url, error });
                }
            }
        }
        resolved
    }

    async fn resolve_one(&self, url: &str) -> LinkOutcome {
        let body = match self.http.fetch_xml(url).await {
            Ok(body) => body,
            Err(e) => {
                debug!(url, error = %e, "diploma fetch failed");
                return LinkOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        // A response body that is not XML counts as a fetch failure:
        // no document was obtained from that URL.
        let doc = match ParsedDocument::parse(self.registry.wrapper(), &body) {
            Ok(doc) => doc,
            Err(e) => {
                debug!(url, error = %e, "diploma response unparseable");
                return LinkOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        let outcome = validate(
            self.registry.wrapper(),
            self.registry.diploma_schema(),
            &doc,
        );
        let fields = extract_emitted_fields(&doc);

        if outcome.passed {
            LinkOutcome::Resolved {
                record: DiplomaRecord::emitted(fields, RecordStatus::Valid),
                diagnostics: None,
            }
        } else {
            // Best-effort record from the invalid document, tagged and
            // carrying its diagnostics.
            LinkOutcome::Resolved {
                record: DiplomaRecord::emitted(
                    fields,
                    RecordStatus::Invalid {
                        errors: outcome.diagnostics.clone(),
                    },
                ),
                diagnostics: Some(outcome.diagnostics),
            }
        }
    }
}
