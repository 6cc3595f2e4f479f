mod xlsx;

use std::collections::HashMap;
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::Error;

/// The columns every dataset must provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    ProductName,
    AccountNumber,
    SecurityCode,
    SecurityName,
    Amount,
    ShareCount,
    NetValue,
}

impl Field {
    /// Placeholder order used when building the replacement map.
    pub const ALL: [Field; 7] = [
        Field::ProductName,
        Field::AccountNumber,
        Field::SecurityCode,
        Field::SecurityName,
        Field::Amount,
        Field::ShareCount,
        Field::NetValue,
    ];

    /// Column header in the spreadsheet.
    pub fn column(self) -> &'static str {
        match self {
            Field::ProductName => "产品名称",
            Field::AccountNumber => "基金账号",
            Field::SecurityCode => "证券代码",
            Field::SecurityName => "证券名称",
            Field::Amount => "金额",
            Field::ShareCount => "份额",
            Field::NetValue => "基金净值",
        }
    }

    /// Token written in templates, e.g. `$金额$`.
    pub fn placeholder(self) -> String {
        format!("${}$", self.column())
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Field::Amount | Field::ShareCount)
    }
}

/// One dataset row keyed by column header. Every value is a string, exactly
/// as it appeared in the source file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    values: HashMap<String, String>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    pub fn field(&self, field: Field) -> &str {
        self.get(field.column()).unwrap_or("")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Dataset {
    headers: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    /// Build a dataset from a header row and data rows. Short rows are padded
    /// with empty strings; fully blank rows are dropped. A required column may
    /// appear only once.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, Error> {
        let headers: Vec<String> = headers.into_iter().map(|h| h.trim().to_string()).collect();
        for field in Field::ALL {
            match headers.iter().filter(|h| *h == field.column()).count() {
                0 => return Err(Error::MissingColumn(field.column().to_string())),
                1 => {}
                n => {
                    return Err(Error::InvalidDataset(format!(
                        "column {:?} appears {n} times",
                        field.column()
                    )));
                }
            }
        }
        for (i, h) in headers.iter().enumerate() {
            if !h.is_empty() && headers[..i].contains(h) {
                log::warn!("Duplicate column {h:?}, keeping the last one");
            }
        }

        let records: Vec<Record> = rows
            .into_iter()
            .filter(|row| row.iter().any(|v| !v.trim().is_empty()))
            .map(|row| {
                headers
                    .iter()
                    .enumerate()
                    .filter(|(_, h)| !h.is_empty())
                    .map(|(i, h)| (h.clone(), row.get(i).cloned().unwrap_or_default()))
                    .collect::<Record>()
            })
            .collect();

        Ok(Dataset { headers, records })
    }

    /// Load `.xlsx`/`.xlsm` (first worksheet) or `.csv`. The first row holds
    /// the column headers.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let mut rows = match ext.as_deref() {
            Some("xlsx") | Some("xlsm") => xlsx::read_first_sheet(path)?,
            Some("csv") => read_csv(path)?,
            _ => return Err(Error::UnsupportedDataset(path.to_path_buf())),
        };
        if rows.is_empty() {
            return Err(Error::InvalidDataset(format!(
                "{} has no header row",
                path.display()
            )));
        }
        let headers = rows.remove(0);
        let dataset = Self::from_rows(headers, rows)?;
        log::info!(
            "Loaded {} rows from {}",
            dataset.len(),
            path.display()
        );
        Ok(dataset)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.records.shuffle(rng);
    }
}

/// Draw one record uniformly at random. Draws are independent, so the same
/// record may come back on later calls.
pub fn select_record<'a, R: Rng + ?Sized>(
    dataset: &'a Dataset,
    rng: &mut R,
) -> Result<&'a Record, Error> {
    if dataset.is_empty() {
        return Err(Error::EmptyDataset);
    }
    let index = rng.random_range(0..dataset.len());
    Ok(&dataset.records[index])
}

fn read_csv(path: &Path) -> Result<Vec<Vec<String>>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}
