use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::classify;
use crate::utils;

pub const REQUIRED_COLUMNS: [&str; 6] = [
    "Title",
    "Year",
    "Conference",
    "Authors",
    "Author_Countries",
    "Status",
];

/// Review outcome for a paper, classified from the free-text status carried
/// by the per-venue exports ("Poster", "Desk Reject", "Withdraw", ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Accepted,
    Rejected,
    Withdrawn,
    Unknown,
}

impl Status {
    /// Withdraw markers win over reject markers, which win over accept
    /// markers; anything else is unknown.
    pub fn classify(raw: &str) -> Self {
        let lowered = raw.to_lowercase();
        if lowered.contains("withdraw") {
            return Status::Withdrawn;
        }
        if lowered.contains("reject") {
            return Status::Rejected;
        }
        let accept_markers = ["accept", "poster", "oral", "spotlight"];
        if accept_markers.iter().any(|marker| lowered.contains(marker)) {
            return Status::Accepted;
        }
        Status::Unknown
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Accepted => "accepted",
            Status::Rejected => "rejected",
            Status::Withdrawn => "withdrawn",
            Status::Unknown => "unknown",
        }
    }

    /// Parses one of the four canonical labels, as used in query parameters.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "accepted" => Some(Status::Accepted),
            "rejected" => Some(Status::Rejected),
            "withdrawn" => Some(Status::Withdrawn),
            "unknown" => Some(Status::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub authors: Vec<String>,
    pub venue: String,
    pub year: i32,
    pub subfield: String,
    pub countries: Vec<String>,
    pub status: Status,
    pub track: String,
    pub citation_count: Option<i64>,
}

/// The full paper table, loaded once at startup and immutable afterwards.
/// Row order matches the flat file and is preserved by every search.
#[derive(Debug, Clone)]
pub struct PaperCatalog {
    papers: Vec<Paper>,
}

impl PaperCatalog {
    pub fn from_papers(papers: Vec<Paper>) -> Self {
        Self { papers }
    }

    /// Reads the merged CSV table produced by the combine step.
    pub fn load(path: &Path) -> Result<Self, String> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|err| format!("Failed to open paper table {}: {err}", path.display()))?;
        let headers = reader
            .headers()
            .map_err(|err| format!("Failed to read headers of {}: {err}", path.display()))?
            .clone();
        let mut columns = BTreeMap::new();
        for column in REQUIRED_COLUMNS {
            let index = headers.iter().position(|header| header == column).ok_or_else(|| {
                format!("Missing required column \"{column}\" in {}", path.display())
            })?;
            columns.insert(column, index);
        }
        let track_index = headers.iter().position(|header| header == "Track");
        let citations_index = headers.iter().position(|header| header == "Citations");

        let cell = |record: &csv::StringRecord, column: &str| -> String {
            record.get(columns[column]).unwrap_or("").trim().to_string()
        };

        let mut papers = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|err| {
                format!("Failed to read {} row {}: {err}", path.display(), index + 1)
            })?;
            let year_cell = cell(&record, "Year");
            let year = year_cell.parse::<i32>().map_err(|err| {
                format!(
                    "Invalid Year \"{year_cell}\" in {} row {}: {err}",
                    path.display(),
                    index + 1
                )
            })?;
            let venue = cell(&record, "Conference");
            let citation_count = citations_index
                .and_then(|idx| record.get(idx))
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .and_then(|value| value.parse::<i64>().ok())
                .filter(|count| *count >= 0);
            papers.push(Paper {
                title: cell(&record, "Title"),
                authors: utils::split_delimited(&cell(&record, "Authors")),
                subfield: classify::subfield_of(&venue).to_string(),
                venue,
                year,
                countries: utils::split_delimited(&cell(&record, "Author_Countries")),
                status: Status::classify(&cell(&record, "Status")),
                track: track_index
                    .and_then(|idx| record.get(idx))
                    .map(str::trim)
                    .unwrap_or("")
                    .to_string(),
                citation_count,
            });
        }
        Ok(Self { papers })
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    pub fn unique_countries(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self
            .papers
            .iter()
            .flat_map(|paper| paper.countries.iter())
            .collect();
        set.into_iter().cloned().collect()
    }

    pub fn unique_venues(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self.papers.iter().map(|paper| &paper.venue).collect();
        set.into_iter().cloned().collect()
    }

    pub fn venues_by_subfield(&self) -> BTreeMap<String, Vec<String>> {
        let mut grouped: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for paper in &self.papers {
            grouped
                .entry(paper.subfield.clone())
                .or_default()
                .insert(paper.venue.clone());
        }
        grouped
            .into_iter()
            .map(|(subfield, venues)| (subfield, venues.into_iter().collect()))
            .collect()
    }

    pub fn year_range(&self) -> Option<(i32, i32)> {
        let min = self.papers.iter().map(|paper| paper.year).min()?;
        let max = self.papers.iter().map(|paper| paper.year).max()?;
        Some((min, max))
    }
}
