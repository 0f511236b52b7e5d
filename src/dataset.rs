//! Dataset loading: CSV files and the built-in fallback films.

use std::path::Path;

use crate::error::DatasetError;
use crate::record::RawRecord;

/// Parse CSV text with a header row into raw records.
///
/// Quoted fields may contain commas and doubled quotes. Blank lines are
/// skipped, short rows are padded with empty values and surrounding
/// whitespace is trimmed.
pub fn parse_csv(text: &str) -> Result<Vec<RawRecord>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(DatasetError::MissingHeader);
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.iter().all(|field| field.is_empty()) {
            continue;
        }
        let record = RawRecord::from_pairs(
            headers
                .iter()
                .enumerate()
                .map(|(i, name)| (name, row.get(i).unwrap_or(""))),
        );
        records.push(record);
    }

    log::debug!("Parsed {} CSV rows ({} columns)", records.len(), headers.len());
    Ok(records)
}

pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<RawRecord>, DatasetError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_csv(&text)
}

/// Small built-in dataset used when no usable file is available.
pub fn fallback_records() -> Vec<RawRecord> {
    const FILMS: &[(&str, &str, &str, &str, &str, &str)] = &[
        ("Avatar", "2847246203", "160", "7.8", "2009", "Sci-Fi"),
        ("Avengers: Endgame", "2797800564", "140", "8.4", "2019", "Action"),
        ("Joker", "1074251311", "1000", "8.4", "2019", "Crime"),
        ("Top Gun: Maverick", "1493555028", "220", "8.2", "2022", "Action"),
        ("Oppenheimer", "960000000", "300", "8.3", "2023", "Drama"),
        ("The Dark Knight", "1004000000", "500", "9.0", "2008", "Action"),
        ("Spirited Away", "380000000", "800", "8.6", "2001", "Animation"),
        ("Frozen", "1280000000", "300", "7.4", "2013", "Animation"),
        ("Barbie", "1445834615", "420", "6.8", "2023", "Comedy"),
        ("Inception", "836000000", "350", "8.8", "2010", "Sci-Fi"),
        ("Parasite", "263000000", "600", "8.5", "2019", "Drama"),
        ("Minions", "1160000000", "400", "6.4", "2015", "Animation"),
    ];

    FILMS
        .iter()
        .map(|&(title, gross, roi, rating, year, genre)| {
            RawRecord::from_pairs([
                ("Title", title),
                ("Worldwide_Gross", gross),
                ("Profit_Margin_Pct", roi),
                ("IMDb_Rating", rating),
                ("Year", year),
                ("Main_Genre", genre),
            ])
        })
        .collect()
}

/// Load `path` if given, falling back to the built-in films when the file is
/// missing, unreadable or empty.
pub fn load_or_fallback(path: Option<&Path>) -> Vec<RawRecord> {
    let Some(path) = path else {
        log::info!("No dataset given, using built-in films");
        return fallback_records();
    };

    match load_csv(path) {
        Ok(records) if !records.is_empty() => {
            log::info!("Loaded {} records from {}", records.len(), path.display());
            records
        }
        Ok(_) => {
            log::warn!("{} has no data rows, using built-in films", path.display());
            fallback_records()
        }
        Err(e) => {
            log::warn!("Failed to load {}: {}; using built-in films", path.display(), e);
            fallback_records()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::normalize_records;

    #[test]
    fn test_parse_quoted_fields() {
        let csv = "Title,Worldwide_Gross,Main_Genre\n\
                   \"Crouching Tiger, Hidden Dragon\",\"213,525,736\",Action\n\
                   \"The \"\"Room\"\"\",1800,Drama\n";
        let records = parse_csv(csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Title"), Some("Crouching Tiger, Hidden Dragon"));
        assert_eq!(records[0].get("Worldwide_Gross"), Some("213,525,736"));
        assert_eq!(records[1].get("Title"), Some("The \"Room\""));
    }

    #[test]
    fn test_parse_tolerates_ragged_rows() {
        let csv = "Title , Year\r\n  Short  \r\n\r\nLong,2001,extra\r\n";
        let records = parse_csv(csv).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Title"), Some("Short"));
        assert_eq!(records[0].get("Year"), Some(""));
        assert_eq!(records[1].get("Year"), Some("2001"));
    }

    #[test]
    fn test_header_only() {
        assert!(parse_csv("Title,Year\n").unwrap().is_empty());
    }

    #[test]
    fn test_fallback_records_are_all_valid() {
        let raw = fallback_records();
        assert_eq!(raw.len(), 12);
        assert_eq!(normalize_records(&raw).len(), 12);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let records = load_or_fallback(Some(Path::new("/definitely/not/here.csv")));
        assert_eq!(records.len(), fallback_records().len());
    }
}
