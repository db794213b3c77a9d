use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The query was blank after trimming.
    EmptyQuery,
    /// The fetch failed or returned no positive price for the resolved symbol.
    DataUnavailable { symbol: String },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::EmptyQuery => write!(f, "empty query"),
            LookupError::DataUnavailable { symbol } => {
                write!(f, "no data available for '{symbol}'")
            }
        }
    }
}

impl std::error::Error for LookupError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The index membership list could not be retrieved.
    EmptyMembership,
    /// No membership row carries the requested sector.
    UnknownSector(String),
    /// Rows were processed but none produced a usable snapshot.
    NoData,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::EmptyMembership => write!(f, "index membership list unavailable"),
            ScanError::UnknownSector(sector) => write!(f, "unknown sector '{sector}'"),
            ScanError::NoData => write!(f, "no data for any scanned symbol"),
        }
    }
}

impl std::error::Error for ScanError {}
