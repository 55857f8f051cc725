//! Record enrichment.
//!
//! Combines one raw routing-table record with the ASN description cache and
//! the geo resolver into an enriched document, assigning the enrichment
//! timestamp. Deterministic given identical cache and resolver state (modulo
//! the timestamp).

use std::sync::Arc;

use chrono::Utc;
use log::warn;

use crate::cache::LookupCache;
use crate::error_handling::{EnrichError, ProcessingStats, WarningType};
use crate::geo::GeoLookup;
use crate::models::{EnrichedDocument, RawRecord};

/// Timestamp format for enriched documents (UTC, second precision).
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Shared enrichment context for all producer workers.
pub struct Enricher {
    cache: Arc<LookupCache>,
    geo: Arc<dyn GeoLookup>,
    stats: Arc<ProcessingStats>,
}

impl Enricher {
    pub fn new(
        cache: Arc<LookupCache>,
        geo: Arc<dyn GeoLookup>,
        stats: Arc<ProcessingStats>,
    ) -> Self {
        Enricher { cache, geo, stats }
    }

    /// Enriches one record.
    ///
    /// A cache miss and a missing geo match are expected partial-data
    /// conditions: the field stays empty, a warning is counted, and the
    /// document is still produced. A malformed CIDR is a record-local
    /// error; the caller skips this record and continues with the rest.
    pub async fn enrich(&self, raw: &RawRecord) -> Result<EnrichedDocument, EnrichError> {
        let meta = self.geo.resolve(&raw.cidr)?;

        let as_description = match self.cache.get(raw.asn).await? {
            Some(description) => description,
            None => {
                warn!("no description for AS{} ({})", raw.asn, raw.cidr);
                self.stats
                    .increment_warning(WarningType::AsnDescriptionMissing);
                String::new()
            }
        };

        if meta.country_code.is_none() {
            self.stats.increment_warning(WarningType::CountryCodeMissing);
        }

        Ok(EnrichedDocument {
            as_description,
            asn: raw.asn,
            country_code: meta.country_code.unwrap_or_default(),
            prefix: raw.cidr.clone(),
            prefix_version: meta.version,
            timestamp: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
        })
    }
}
