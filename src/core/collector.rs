use crate::core::retry::{AttemptOutcome, RetryPolicy};
use crate::domain::model::{Area, ListingRecord};
use crate::domain::ports::{FieldExtractor, SearchTransport};

/// Result of one search request.
#[derive(Debug)]
enum PageOutcome {
    Success {
        status: u16,
        records: Vec<ListingRecord>,
    },
    /// Well-formed but empty. Could be the end of results or throttling;
    /// the two are handled the same way.
    EmptySuccess { status: u16 },
    Failure(AttemptOutcome),
}

/// Walks search result pages for one area until `max_attempts` consecutive
/// requests on the same page fail or come back empty.
pub struct PaginatedCollector<'a> {
    transport: &'a dyn SearchTransport,
    extractor: &'a dyn FieldExtractor,
    policy: &'a RetryPolicy,
}

impl<'a> PaginatedCollector<'a> {
    pub fn new(
        transport: &'a dyn SearchTransport,
        extractor: &'a dyn FieldExtractor,
        policy: &'a RetryPolicy,
    ) -> Self {
        Self {
            transport,
            extractor,
            policy,
        }
    }

    async fn request(&self, area: &Area, page_number: u32) -> PageOutcome {
        match self.transport.fetch_page(area, page_number).await {
            Ok(response) if response.is_success() => {
                let records = self.extractor.extract_listings(&response.body);
                if records.is_empty() {
                    PageOutcome::EmptySuccess {
                        status: response.status,
                    }
                } else {
                    PageOutcome::Success {
                        status: response.status,
                        records,
                    }
                }
            }
            Ok(response) => PageOutcome::Failure(AttemptOutcome::Status {
                status: response.status,
            }),
            Err(e) => PageOutcome::Failure(AttemptOutcome::Error {
                message: e.to_string(),
            }),
        }
    }

    /// Never fails: exhausting the attempts just ends pagination with whatever
    /// was accumulated.
    pub async fn collect(&self, area: &Area) -> Vec<ListingRecord> {
        tracing::info!("Searching {} for listings", area);

        let max_attempts = self.policy.max_attempts();
        let mut page_number = 1u32;
        let mut attempt = 1u32;
        let mut accumulated: Vec<ListingRecord> = Vec::new();

        loop {
            let context = format!("area: {}, page_number: {}", area, page_number);
            let failure = match self.request(area, page_number).await {
                PageOutcome::Success { status, records } => {
                    self.policy
                        .report(&context, attempt, AttemptOutcome::Success { status });
                    let page_records = records.len();
                    accumulated.extend(records);
                    tracing::info!(
                        "{}, records: {}, total_records: {}, message: \"SUCCESS!\"",
                        context,
                        page_records,
                        accumulated.len()
                    );
                    attempt = 1;
                    page_number += 1;
                    continue;
                }
                PageOutcome::EmptySuccess { status } => AttemptOutcome::Empty { status },
                PageOutcome::Failure(outcome) => outcome,
            };

            self.policy.report(&context, attempt, failure);
            if attempt >= max_attempts {
                break;
            }
            self.policy.wait(attempt).await;
            attempt += 1;
        }

        tracing::info!(
            "Finished {} after {} page(s) with {} records",
            area,
            page_number - 1,
            accumulated.len()
        );
        accumulated
    }
}
