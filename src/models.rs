//! Core data structures.
//!
//! This module defines the record types flowing through the pipeline:
//! the raw routing-table record as read from chunk files, the enriched
//! document as written to the index, and the batch hand-off unit.

use serde::{Deserialize, Serialize};

/// One routing-table record as parsed from a chunk file line.
///
/// The field names match the upstream chunker's JSON output.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    /// The announced prefix in CIDR notation.
    #[serde(rename = "CIDR")]
    pub cidr: String,
    /// The announcing autonomous system.
    #[serde(rename = "ASN")]
    pub asn: u32,
    /// Observation count from the table dump. Carried through parsing but
    /// not part of the indexed document.
    #[serde(rename = "Hits", default)]
    pub hits: u64,
}

/// One enriched document, the unit persisted to the search backend.
///
/// Field names and order match the index mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedDocument {
    /// Human-readable AS description; empty when the AS number was not in
    /// the lookup cache.
    pub as_description: String,
    /// The announcing autonomous system.
    pub asn: u32,
    /// ISO country code; empty when the geo database had no match.
    pub country_code: String,
    /// The announced prefix in CIDR notation.
    pub prefix: String,
    /// 4 or 6.
    pub prefix_version: u8,
    /// ISO-8601 UTC timestamp assigned at enrichment time.
    pub timestamp: String,
}

/// A batch of enriched documents owned by exactly one stage at a time.
///
/// Batches move producer → delivery → retry → delivery; ownership transfers
/// with each queue hand-off, so no locking is needed on the contents.
#[derive(Debug)]
pub struct Batch {
    /// Documents in input order (within one chunk file).
    pub documents: Vec<EnrichedDocument>,
    /// How many delivery attempts already failed for these documents.
    /// Zero for a batch fresh from a producer.
    pub retry_count: u32,
}

impl Batch {
    /// A fresh batch from a producer.
    pub fn new(documents: Vec<EnrichedDocument>) -> Self {
        Batch {
            documents,
            retry_count: 0,
        }
    }

    /// Builds the follow-up batch from the documents that failed delivery.
    ///
    /// Successful documents from the original batch are never carried over.
    pub fn into_retry(self, failed: Vec<EnrichedDocument>) -> Batch {
        Batch {
            documents: failed,
            retry_count: self.retry_count + 1,
        }
    }

    /// The prefixes in this batch, for retry diagnostics.
    pub fn prefixes(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.prefix.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(prefix: &str) -> EnrichedDocument {
        EnrichedDocument {
            as_description: "Example".into(),
            asn: 64496,
            country_code: "US".into(),
            prefix: prefix.into(),
            prefix_version: 4,
            timestamp: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn test_raw_record_field_names() {
        let raw: RawRecord =
            serde_json::from_str(r#"{"CIDR":"8.8.8.0/24","ASN":15169,"Hits":10}"#).unwrap();
        assert_eq!(raw.cidr, "8.8.8.0/24");
        assert_eq!(raw.asn, 15169);
        assert_eq!(raw.hits, 10);
    }

    #[test]
    fn test_raw_record_hits_optional() {
        let raw: RawRecord = serde_json::from_str(r#"{"CIDR":"2001:db8::/32","ASN":64496}"#)
            .unwrap();
        assert_eq!(raw.hits, 0);
    }

    #[test]
    fn test_document_json_keys() {
        let json = serde_json::to_value(doc("8.8.8.0/24")).unwrap();
        let obj = json.as_object().unwrap();
        for key in [
            "as_description",
            "asn",
            "country_code",
            "prefix",
            "prefix_version",
            "timestamp",
        ] {
            assert!(obj.contains_key(key), "missing key {key}");
        }
        assert_eq!(obj.len(), 6);
    }

    #[test]
    fn test_into_retry_increments_and_narrows() {
        let batch = Batch::new(vec![doc("1.0.0.0/24"), doc("2.0.0.0/24")]);
        let retry = batch.into_retry(vec![doc("2.0.0.0/24")]);
        assert_eq!(retry.retry_count, 1);
        assert_eq!(retry.prefixes(), vec!["2.0.0.0/24"]);

        let again = retry.into_retry(vec![doc("2.0.0.0/24")]);
        assert_eq!(again.retry_count, 2);
    }
}
