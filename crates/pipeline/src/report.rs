//! Per-symbol outcome of a pipeline stage.

use forecast_core::Error;
use std::fmt;

/// What happened to one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolReport {
    pub symbol: String,
    /// Rows produced (aggregated bars or examples).
    pub rows: usize,
    /// Failure cause; `None` on success.
    pub error: Option<String>,
}

impl SymbolReport {
    pub fn ok(symbol: impl Into<String>, rows: usize) -> Self {
        Self {
            symbol: symbol.into(),
            rows,
            error: None,
        }
    }

    pub fn failed(symbol: impl Into<String>, error: &Error) -> Self {
        Self {
            symbol: symbol.into(),
            rows: 0,
            error: Some(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for SymbolReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error {
            None => write!(f, "{}: {} rows", self.symbol, self.rows),
            Some(e) => write!(f, "{}: FAILED ({})", self.symbol, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(SymbolReport::ok("SPY", 12).to_string(), "SPY: 12 rows");
        let failed = SymbolReport::failed("QQQ", &Error::data("bad bar"));
        assert!(!failed.is_ok());
        assert_eq!(failed.to_string(), "QQQ: FAILED (Data error: bad bar)");
    }
}
