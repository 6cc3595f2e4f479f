use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::dataset::{Field, Record};
use crate::error::Error;

/// Ordered placeholder → replacement pairs. Keys are processed in insertion
/// order by the substitution engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplacementMap {
    entries: Vec<(String, String)>,
}

impl ReplacementMap {
    /// Map every [`Field`] placeholder to its value in `record`. Amount and
    /// share count are rendered as `#,##0.00`; the rest are trimmed.
    pub fn from_record(record: &Record) -> Result<Self, Error> {
        let mut map = ReplacementMap::default();
        for field in Field::ALL {
            let raw = record.field(field);
            let value = if field.is_numeric() {
                format_amount(raw).ok_or_else(|| Error::MalformedNumericField {
                    field: field.column().to_string(),
                    value: raw.to_string(),
                })?
            } else {
                raw.trim().to_string()
            };
            map.insert(field.placeholder(), value);
        }
        Ok(map)
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = ReplacementMap::default();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        map
    }

    /// Insert or overwrite; an overwritten key keeps its original position.
    pub fn insert(&mut self, key: String, value: String) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Format a decimal string with `,` thousands separators and exactly two
/// fraction digits, rounding half to even. Returns `None` when the input is
/// not a decimal number. The grouping and decimal marks are fixed.
pub fn format_amount(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let value = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(&raw.to_ascii_lowercase()))
        .ok()?;
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(2);

    let text = rounded.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    Some(format!("{sign}{grouped}.{frac_part}"))
}
