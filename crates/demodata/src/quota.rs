//! Reads quota definitions from `.aqu` quota files.
//!
//! Recognised lines, all whitespace separated:
//!
//! - `# name = N` declares a quota with `current` and `total` set to `N`.
//! - `name.t = N` sets the target.
//! - `name.r = N` sets the current count.
//! - `name = N` sets the total.
//!
//! Anything else is ignored. Quotas keep the order of their first mention.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InstallError;

/// One quota as sent to the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaDef {
    pub name: String,
    pub current: i64,
    pub target: i64,
    pub total: i64,
}

impl QuotaDef {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            current: 0,
            target: 0,
            total: 0,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "current": self.current,
            "target": self.target,
            "total": self.total,
        })
    }
}

/// Parses `.aqu` text.
pub fn parse_aqu(text: &str) -> Result<Vec<QuotaDef>, InstallError> {
    let mut quotas: Vec<QuotaDef> = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let words: Vec<&str> = line.split_whitespace().collect();
        let number = |word: &str| {
            word.parse::<i64>().map_err(|_| InstallError::Quota {
                line: idx + 1,
                text: format!("invalid number {word:?}"),
            })
        };

        match words.as_slice() {
            ["#", name, "=", value, ..] => {
                let value = number(*value)?;
                let quota = entry(&mut quotas, name);
                quota.current = value;
                quota.total = value;
                quota.target = 0;
            }
            [key, "=", value] if *key != "#" => {
                let value = number(*value)?;
                if let Some(name) = key.strip_suffix(".t") {
                    entry(&mut quotas, name).target = value;
                } else if let Some(name) = key.strip_suffix(".r") {
                    entry(&mut quotas, name).current = value;
                } else {
                    entry(&mut quotas, key).total = value;
                }
            }
            _ => {}
        }
    }

    Ok(quotas)
}

/// Reads and parses an `.aqu` file.
pub fn from_aqu(path: &Path) -> Result<Vec<QuotaDef>, InstallError> {
    let text = std::fs::read_to_string(path).map_err(|e| InstallError::io(path, e))?;
    parse_aqu(&text)
}

fn entry<'q>(quotas: &'q mut Vec<QuotaDef>, name: &str) -> &'q mut QuotaDef {
    let idx = match quotas.iter().position(|q| q.name == name) {
        Some(idx) => idx,
        None => {
            quotas.push(QuotaDef::named(name));
            quotas.len() - 1
        }
    };
    &mut quotas[idx]
}
