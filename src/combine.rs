use clap::Args;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

use paper_atlas::classify;
use paper_atlas::utils;

use crate::AppConfig;

pub const OUTPUT_COLUMNS: [&str; 10] = [
    "Title",
    "Year",
    "Conference",
    "Subfield",
    "Authors",
    "Author_Institutions",
    "Author_Countries",
    "Status",
    "Track",
    "Citations",
];

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}").expect("valid year regex"));

#[derive(Args, Debug, Clone)]
pub struct CombineArgs {
    #[arg(long, help = "Directory containing per-venue JSON exports")]
    pub data_dir: Option<PathBuf>,
    #[arg(long, help = "Path for the merged CSV table")]
    pub output: Option<PathBuf>,
}

/// Extracts the edition year from a file name like `aistats1997.json`.
fn year_from_filename(name: &str) -> Option<i32> {
    let stem = name.strip_suffix(".json").unwrap_or(name);
    YEAR_RE
        .find_iter(stem)
        .filter_map(|m| m.as_str().parse::<i32>().ok())
        .find(|year| (1900..=2030).contains(year))
}

fn text_field(paper: &Value, key: &str) -> String {
    paper
        .get(key)
        .and_then(Value::as_str)
        .map(utils::clean_text)
        .unwrap_or_default()
}

/// Flattens one export entry into the merged table's column order. The
/// exports use -1 for an unknown citation count; that becomes an empty cell.
fn row_for_paper(paper: &Value, venue: &str, year: i32) -> Vec<String> {
    let citations = paper
        .get("gs_citation")
        .and_then(Value::as_i64)
        .filter(|count| *count >= 0)
        .map(|count| count.to_string())
        .unwrap_or_default();
    vec![
        text_field(paper, "title"),
        year.to_string(),
        venue.to_string(),
        classify::subfield_of(venue).to_string(),
        text_field(paper, "author"),
        text_field(paper, "aff"),
        text_field(paper, "aff_country_unique"),
        text_field(paper, "status"),
        text_field(paper, "track"),
        citations,
    ]
}

pub fn run_combine(args: &CombineArgs, config: &AppConfig) -> Result<(), String> {
    let data_dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.data_dir));
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.csv_path));
    if !data_dir.is_dir() {
        return Err(format!(
            "Data directory {} does not exist",
            data_dir.display()
        ));
    }

    let mut venue_dirs: Vec<PathBuf> = fs::read_dir(&data_dir)
        .map_err(|err| format!("Failed to read data dir {}: {err}", data_dir.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    venue_dirs.sort();

    let mut total_papers = 0usize;
    let mut processed_files = 0usize;

    utils::write_atomic(&output, |temp| {
        let mut writer = csv::Writer::from_writer(temp);
        writer
            .write_record(OUTPUT_COLUMNS)
            .map_err(|err| format!("Failed to write CSV header: {err}"))?;

        for venue_dir in &venue_dirs {
            let venue = venue_dir
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default()
                .to_uppercase();
            if venue.is_empty() {
                continue;
            }
            println!("Processing {venue}...");

            let pattern = venue_dir.join("*.json").to_string_lossy().to_string();
            let mut json_files: Vec<PathBuf> = glob::glob(&pattern)
                .map_err(|err| format!("Failed to read glob {pattern}: {err}"))?
                .filter_map(Result::ok)
                .collect();
            json_files.sort();

            for json_file in json_files {
                let file_name = json_file
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or_default();
                let Some(year) = year_from_filename(file_name) else {
                    eprintln!("Warning: could not extract year from {file_name}");
                    continue;
                };
                let contents = match fs::read_to_string(&json_file) {
                    Ok(contents) => contents,
                    Err(err) => {
                        eprintln!("Error reading {}: {err}", json_file.display());
                        continue;
                    }
                };
                let parsed: Value = match serde_json::from_str(&contents) {
                    Ok(parsed) => parsed,
                    Err(err) => {
                        eprintln!("Error parsing {}: {err}", json_file.display());
                        continue;
                    }
                };
                let Some(papers) = parsed.as_array() else {
                    eprintln!(
                        "Warning: {} does not contain a list of papers",
                        json_file.display()
                    );
                    continue;
                };
                for paper in papers {
                    if !paper.is_object() {
                        continue;
                    }
                    writer
                        .write_record(row_for_paper(paper, &venue, year))
                        .map_err(|err| format!("Failed to write CSV row: {err}"))?;
                    total_papers += 1;
                }
                processed_files += 1;
            }
        }

        writer
            .flush()
            .map_err(|err| format!("Failed to flush CSV output: {err}"))?;
        Ok(())
    })?;

    println!("Processed {processed_files} files");
    println!("Total papers: {total_papers}");
    println!("Output file: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper_atlas::catalog::{PaperCatalog, Status};
    use serde_json::json;

    #[test]
    fn year_extraction_finds_the_edition_year() {
        assert_eq!(year_from_filename("aistats1997.json"), Some(1997));
        assert_eq!(year_from_filename("iclr2024.json"), Some(2024));
        assert_eq!(year_from_filename("neurips.json"), None);
        assert_eq!(year_from_filename("venue9999.json"), None);
    }

    #[test]
    fn rows_flatten_export_entries() {
        let paper = json!({
            "title": "  Deep\n Nets ",
            "author": "Ada Lovelace; Alan Turing",
            "aff": "UCT; Cambridge",
            "aff_country_unique": "South Africa; United Kingdom",
            "status": "Poster",
            "track": "main",
            "gs_citation": 12,
        });
        let row = row_for_paper(&paper, "ICML", 2019);
        assert_eq!(row[0], "Deep Nets");
        assert_eq!(row[1], "2019");
        assert_eq!(row[2], "ICML");
        assert_eq!(row[3], "Artificial Intelligence");
        assert_eq!(row[6], "South Africa; United Kingdom");
        assert_eq!(row[9], "12");
    }

    #[test]
    fn unknown_citation_counts_become_empty_cells() {
        let paper = json!({ "title": "A", "gs_citation": -1 });
        let row = row_for_paper(&paper, "ICML", 2020);
        assert_eq!(row[9], "");
        let paper = json!({ "title": "A" });
        let row = row_for_paper(&paper, "ICML", 2020);
        assert_eq!(row[9], "");
    }

    #[test]
    fn merge_produces_a_loadable_table() {
        let dir = tempfile::tempdir().unwrap();
        let venue_dir = dir.path().join("icml");
        fs::create_dir(&venue_dir).unwrap();
        let papers = json!([
            {
                "title": "Deep Nets",
                "author": "Ada Lovelace",
                "aff_country_unique": "South Africa",
                "status": "Poster",
                "gs_citation": 3,
            },
            {
                "title": "Shallow Nets",
                "author": "Alan Turing",
                "status": "Reject",
            }
        ]);
        fs::write(
            venue_dir.join("icml2019.json"),
            serde_json::to_string(&papers).unwrap(),
        )
        .unwrap();
        fs::write(venue_dir.join("notes.json"), "[]").unwrap();

        let output = dir.path().join("all_papers.csv");
        let args = CombineArgs {
            data_dir: Some(dir.path().to_path_buf()),
            output: Some(output.clone()),
        };
        run_combine(&args, &AppConfig::default()).unwrap();

        let catalog = PaperCatalog::load(&output).unwrap();
        assert_eq!(catalog.len(), 2);
        let first = &catalog.papers()[0];
        assert_eq!(first.venue, "ICML");
        assert_eq!(first.year, 2019);
        assert_eq!(first.subfield, "Artificial Intelligence");
        assert_eq!(first.status, Status::Accepted);
        assert_eq!(first.citation_count, Some(3));
        assert_eq!(catalog.papers()[1].status, Status::Rejected);
    }
}
