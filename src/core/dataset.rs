//! CSV encoding of area and master datasets.
//!
//! Every file starts with an explicit `index` column followed by the listing
//! columns; enriched files append one boolean column per keyword. Telephone
//! values are only ever handled as text.

use crate::config::TelephoneFormat;
use crate::domain::model::{EnrichedRecord, KeywordFlag, ListingRecord};
use crate::utils::error::{HarvestError, Result};
use csv::{ReaderBuilder, StringRecord, Writer};

pub const INDEX_COLUMN: &str = "index";
pub const LISTING_COLUMNS: [&str; 5] = [
    "business_name",
    "address",
    "telephone",
    "website",
    "listing_url",
];

const TELEPHONE_PREFIX: char = '\'';

fn listing_cells(record: &ListingRecord, telephone_format: TelephoneFormat) -> Vec<String> {
    let telephone = match (&record.telephone, telephone_format) {
        (Some(t), TelephoneFormat::Prefixed) => format!("{}{}", TELEPHONE_PREFIX, t),
        (Some(t), TelephoneFormat::Plain) => t.clone(),
        (None, _) => String::new(),
    };
    vec![
        record.business_name.clone().unwrap_or_default(),
        record.address.clone().unwrap_or_default(),
        telephone,
        record.website.clone().unwrap_or_default(),
        record.listing_url.clone().unwrap_or_default(),
    ]
}

fn header(keywords: &[String]) -> Vec<&str> {
    let mut header = vec![INDEX_COLUMN];
    header.extend(LISTING_COLUMNS);
    header.extend(keywords.iter().map(String::as_str));
    header
}

pub fn encode_listings(records: &[ListingRecord]) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(header(&[]))?;
    for (index, record) in records.iter().enumerate() {
        let mut row = vec![index.to_string()];
        row.extend(listing_cells(record, TelephoneFormat::Plain));
        writer.write_record(&row)?;
    }
    into_bytes(writer)
}

/// Writes enriched rows with the given keyword columns. A record lacking a
/// flag for one of the columns gets an empty cell.
pub fn encode_enriched(
    records: &[EnrichedRecord],
    keywords: &[String],
    telephone_format: TelephoneFormat,
) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(header(keywords))?;
    for (index, record) in records.iter().enumerate() {
        let mut row = vec![index.to_string()];
        row.extend(listing_cells(&record.listing, telephone_format));
        for keyword in keywords {
            row.push(match record.flag(keyword) {
                Some(present) => present.to_string(),
                None => String::new(),
            });
        }
        writer.write_record(&row)?;
    }
    into_bytes(writer)
}

fn into_bytes(writer: Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| HarvestError::IoError(e.into_error()))
}

struct Columns {
    index: usize,
    listing: [usize; 5],
    keywords: Vec<(usize, String)>,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Result<Self> {
        let position = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| HarvestError::ProcessingError {
                    message: format!("Dataset is missing the '{}' column", name),
                })
        };

        let index = position(INDEX_COLUMN)?;
        let mut listing = [0; 5];
        for (slot, name) in listing.iter_mut().zip(LISTING_COLUMNS) {
            *slot = position(name)?;
        }
        let keywords = header
            .iter()
            .enumerate()
            .filter(|(_, h)| *h != INDEX_COLUMN && !LISTING_COLUMNS.contains(h))
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        Ok(Self {
            index,
            listing,
            keywords,
        })
    }

    fn listing(&self, row: &StringRecord) -> ListingRecord {
        let cell = |i: usize| {
            row.get(self.listing[i])
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        ListingRecord {
            business_name: cell(0),
            address: cell(1),
            telephone: cell(2).map(|t| {
                t.strip_prefix(TELEPHONE_PREFIX)
                    .map(str::to_string)
                    .unwrap_or(t)
            }),
            website: cell(3),
            listing_url: cell(4),
        }
    }

    fn index(&self, row: &StringRecord) -> Result<usize> {
        let raw = row.get(self.index).unwrap_or_default();
        raw.trim()
            .parse()
            .map_err(|_| HarvestError::ProcessingError {
                message: format!("Invalid index value '{}'", raw),
            })
    }
}

/// Rows are returned in index order regardless of their order in the file.
pub fn decode_listings(data: &[u8]) -> Result<Vec<ListingRecord>> {
    let mut reader = ReaderBuilder::new().from_reader(data);
    let columns = Columns::from_header(reader.headers()?)?;

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row?;
        rows.push((columns.index(&row)?, columns.listing(&row)));
    }
    rows.sort_by_key(|(index, _)| *index);
    Ok(rows.into_iter().map(|(_, record)| record).collect())
}

pub fn decode_enriched(data: &[u8]) -> Result<Vec<EnrichedRecord>> {
    let mut reader = ReaderBuilder::new().from_reader(data);
    let columns = Columns::from_header(reader.headers()?)?;

    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row?;
        let flags = columns
            .keywords
            .iter()
            .filter_map(|(i, keyword)| {
                parse_flag(row.get(*i).unwrap_or_default()).map(|present| KeywordFlag {
                    keyword: keyword.clone(),
                    present,
                })
            })
            .collect();
        rows.push((
            columns.index(&row)?,
            EnrichedRecord {
                listing: columns.listing(&row),
                flags,
            },
        ));
    }
    rows.sort_by_key(|(index, _)| *index);
    Ok(rows.into_iter().map(|(_, record)| record).collect())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
