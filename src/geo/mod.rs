//! Geo resolution for announced prefixes.
//!
//! This module classifies a CIDR prefix by IP version and looks up its
//! country code in a MaxMind GeoLite2-Country database. The database reader
//! is opened once at startup and shared read-only across all enrichment
//! workers via `Arc`; lookups never reopen the file.

use std::net::IpAddr;
use std::path::Path;

use maxminddb::Reader;

use crate::error_handling::GeoError;

/// Classification of one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMeta {
    /// 4 or 6.
    pub version: u8,
    /// ISO country code; `None` when the database has no match for the
    /// prefix. Callers must tolerate the absence.
    pub country_code: Option<String>,
}

/// Prefix classification seam.
///
/// The pipeline depends on this trait rather than on the MaxMind reader
/// directly, so tests can substitute a table-backed stub.
pub trait GeoLookup: Send + Sync {
    /// Parses `cidr` and classifies it.
    ///
    /// A malformed CIDR yields [`GeoError::InvalidPrefix`], a record-local
    /// condition the caller absorbs; it must never abort the run. A prefix
    /// absent from the database yields an empty country code, not an error.
    fn resolve(&self, cidr: &str) -> Result<PrefixMeta, GeoError>;
}

/// Parses a CIDR string into its address and IP version.
///
/// IPv4 literals and IPv4-mapped IPv6 addresses classify as version 4
/// (and the mapped form is canonicalized to the embedded IPv4 address);
/// everything else is version 6.
pub fn parse_prefix(cidr: &str) -> Result<(IpAddr, u8), GeoError> {
    let invalid = |reason: String| GeoError::InvalidPrefix {
        cidr: cidr.to_string(),
        reason,
    };

    let (addr_part, len_part) = cidr
        .split_once('/')
        .ok_or_else(|| invalid("missing prefix length".to_string()))?;

    let addr: IpAddr = addr_part
        .parse()
        .map_err(|e| invalid(format!("bad address: {e}")))?;
    let len: u8 = len_part
        .parse()
        .map_err(|e| invalid(format!("bad prefix length: {e}")))?;

    let max_len = if addr.is_ipv4() { 32 } else { 128 };
    if len > max_len {
        return Err(invalid(format!("prefix length {len} exceeds {max_len}")));
    }

    let addr = match addr {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        },
        v4 => v4,
    };
    let version = if addr.is_ipv4() { 4 } else { 6 };

    Ok((addr, version))
}

/// Country resolver backed by a MaxMind database.
///
/// Holds a single `Reader` over the whole run; `maxminddb` lookups are
/// lock-free reads, so one instance serves all workers concurrently.
pub struct GeoResolver {
    reader: Reader<Vec<u8>>,
}

impl GeoResolver {
    /// Opens the `.mmdb` file once. Fatal at startup on failure.
    pub fn open(path: &Path) -> Result<Self, GeoError> {
        let reader = Reader::open_readfile(path)?;
        Ok(GeoResolver { reader })
    }

    /// Longest-prefix country lookup. Absence of a match (or of country
    /// data on the matched entry) is `None`.
    fn country(&self, addr: IpAddr) -> Option<String> {
        let lookup = self.reader.lookup(addr).ok()?;
        if !lookup.has_data() {
            return None;
        }
        let record: maxminddb::geoip2::Country = lookup.decode().ok()??;
        record.country.iso_code.map(|s| s.to_string())
    }
}

impl GeoLookup for GeoResolver {
    fn resolve(&self, cidr: &str) -> Result<PrefixMeta, GeoError> {
        let (addr, version) = parse_prefix(cidr)?;
        Ok(PrefixMeta {
            version,
            country_code: self.country(addr),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipv4_classifies_as_4() {
        let (addr, version) = parse_prefix("8.8.8.0/24").unwrap();
        assert_eq!(version, 4);
        assert_eq!(addr, "8.8.8.0".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_ipv6_classifies_as_6() {
        let (_, version) = parse_prefix("2001:db8::/32").unwrap();
        assert_eq!(version, 6);
    }

    #[test]
    fn test_ipv4_mapped_classifies_as_4() {
        let (addr, version) = parse_prefix("::ffff:8.8.8.0/120").unwrap();
        assert_eq!(version, 4);
        assert_eq!(addr, "8.8.8.0".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn test_missing_slash_is_invalid() {
        assert!(matches!(
            parse_prefix("8.8.8.0"),
            Err(GeoError::InvalidPrefix { .. })
        ));
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert!(matches!(
            parse_prefix("not-a-prefix"),
            Err(GeoError::InvalidPrefix { .. })
        ));
    }

    #[test]
    fn test_prefix_length_bounds() {
        assert!(parse_prefix("8.8.8.0/32").is_ok());
        assert!(parse_prefix("8.8.8.0/33").is_err());
        assert!(parse_prefix("2001:db8::/128").is_ok());
        assert!(parse_prefix("2001:db8::/129").is_err());
        assert!(parse_prefix("8.8.8.0/abc").is_err());
    }

    #[test]
    fn test_open_missing_database_is_error() {
        assert!(GeoResolver::open(Path::new("/nonexistent/country.mmdb")).is_err());
    }
}
