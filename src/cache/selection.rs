use std::fmt;
use std::str::FromStr;

use crate::data::model::{SampleKey, Truncation};
use crate::error::SelectionSyntaxError;

/// One requested sample: coordinate plus optional truncation percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSelection {
    pub key: SampleKey,
    pub truncation: Truncation,
}

impl SampleSelection {
    pub fn new(batch: u32, subbatch: u32) -> Self {
        Self {
            key: SampleKey::new(batch, subbatch),
            truncation: None,
        }
    }

    pub fn truncated(batch: u32, subbatch: u32, pct: u8) -> Self {
        Self {
            key: SampleKey::new(batch, subbatch),
            truncation: Some(pct),
        }
    }
}

impl fmt::Display for SampleSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.truncation {
            Some(pct) => write!(f, "{}-{pct}", self.key),
            None => write!(f, "{}", self.key),
        }
    }
}

impl FromStr for SampleSelection {
    type Err = SelectionSyntaxError;

    /// `batch-subbatch` or `batch-subbatch-truncation`.
    fn from_str(item: &str) -> Result<Self, Self::Err> {
        let item = item.trim();
        let parts: Vec<&str> = item.split('-').map(str::trim).collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(SelectionSyntaxError::Shape(item.to_string()));
        }

        let number = |value: &str| -> Result<u32, SelectionSyntaxError> {
            value
                .parse::<u32>()
                .map_err(|_| SelectionSyntaxError::NotANumber {
                    item: item.to_string(),
                    value: value.to_string(),
                })
        };

        let batch = number(parts[0])?;
        let subbatch = number(parts[1])?;
        let truncation = match parts.get(2) {
            Some(value) => {
                let pct = number(value)?;
                if pct > 100 {
                    return Err(SelectionSyntaxError::Truncation {
                        item: item.to_string(),
                        value: pct,
                    });
                }
                Some(pct as u8)
            }
            None => None,
        };

        Ok(Self {
            key: SampleKey::new(batch, subbatch),
            truncation,
        })
    }
}

/// Parse a comma separated list such as `"1-2-50,3-1"`.
pub fn parse_selection(text: &str) -> Result<Vec<SampleSelection>, SelectionSyntaxError> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::parse)
        .collect()
}
