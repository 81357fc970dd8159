use serde_json::{json, Value};

use crate::catalog::Paper;

pub const CSV_COLUMNS: [&str; 9] = [
    "Title",
    "Authors",
    "Venue",
    "Year",
    "Countries",
    "Status",
    "Subfield",
    "Track",
    "Citations",
];

/// JSON payload for a search response: the matched rows plus their count.
pub fn encode_results(papers: &[&Paper]) -> Value {
    let results: Vec<Value> = papers.iter().map(|paper| encode_paper(paper)).collect();
    json!({
        "results": results,
        "total": papers.len(),
    })
}

fn encode_paper(paper: &Paper) -> Value {
    json!({
        "title": paper.title,
        "authors": paper.authors,
        "venue": paper.venue,
        "year": paper.year,
        "subfield": paper.subfield,
        "countries": paper.countries,
        "status": paper.status.label(),
        "track": paper.track,
        "citations": paper.citation_count.unwrap_or(0),
    })
}

/// Renders the matched rows as a CSV document with a fixed column order.
/// Authors and countries are flattened back into `;`-delimited cells; no
/// other field is transformed.
pub fn to_csv(papers: &[&Paper]) -> Result<String, String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_COLUMNS)
        .map_err(|err| format!("Failed to write CSV header: {err}"))?;
    for paper in papers {
        let authors = paper.authors.join("; ");
        let countries = paper.countries.join("; ");
        let year = paper.year.to_string();
        let citations = paper
            .citation_count
            .map(|count| count.to_string())
            .unwrap_or_default();
        writer
            .write_record([
                paper.title.as_str(),
                authors.as_str(),
                paper.venue.as_str(),
                year.as_str(),
                countries.as_str(),
                paper.status.label(),
                paper.subfield.as_str(),
                paper.track.as_str(),
                citations.as_str(),
            ])
            .map_err(|err| format!("Failed to write CSV row: {err}"))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| format!("Failed to finish CSV document: {err}"))?;
    String::from_utf8(bytes).map_err(|err| format!("CSV document is not valid UTF-8: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Status;
    use crate::filter::{search, SearchCriteria};

    fn sample() -> Vec<Paper> {
        vec![
            Paper {
                title: "Deep Nets".to_string(),
                authors: vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()],
                venue: "ICML".to_string(),
                year: 2019,
                subfield: "Artificial Intelligence".to_string(),
                countries: vec!["US".to_string()],
                status: Status::Accepted,
                track: "main".to_string(),
                citation_count: Some(12),
            },
            Paper {
                title: "Graph Theory, Applied".to_string(),
                authors: vec!["Paul Erdos".to_string()],
                venue: "NeurIPS".to_string(),
                year: 2021,
                subfield: "Artificial Intelligence".to_string(),
                countries: vec!["ZA".to_string()],
                status: Status::Rejected,
                track: String::new(),
                citation_count: None,
            },
        ]
    }

    #[test]
    fn json_payload_carries_rows_and_total() {
        let papers = sample();
        let matched: Vec<&Paper> = papers.iter().collect();
        let payload = encode_results(&matched);
        assert_eq!(payload["total"], 2);
        assert_eq!(payload["results"][0]["title"], "Deep Nets");
        assert_eq!(payload["results"][0]["citations"], 12);
        assert_eq!(payload["results"][1]["status"], "rejected");
        assert_eq!(payload["results"][1]["citations"], 0);
    }

    #[test]
    fn csv_has_fixed_column_order() {
        let papers = sample();
        let matched: Vec<&Paper> = papers.iter().collect();
        let document = to_csv(&matched).unwrap();
        let first_line = document.lines().next().unwrap();
        assert_eq!(
            first_line,
            "Title,Authors,Venue,Year,Countries,Status,Subfield,Track,Citations"
        );
    }

    #[test]
    fn csv_round_trips_against_the_json_result() {
        let papers = sample();
        let criteria = SearchCriteria::default();
        let matched = search(&papers, &criteria);
        let payload = encode_results(&matched);
        let document = to_csv(&matched).unwrap();

        let mut reader = csv::Reader::from_reader(document.as_bytes());
        let mut csv_tuples = Vec::new();
        for record in reader.records() {
            let record = record.unwrap();
            csv_tuples.push((
                record.get(0).unwrap().to_string(),
                record.get(2).unwrap().to_string(),
                record.get(3).unwrap().parse::<i32>().unwrap(),
            ));
        }
        let json_tuples: Vec<(String, String, i32)> = payload["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| {
                (
                    row["title"].as_str().unwrap().to_string(),
                    row["venue"].as_str().unwrap().to_string(),
                    row["year"].as_i64().unwrap() as i32,
                )
            })
            .collect();
        assert_eq!(csv_tuples, json_tuples);
    }

    #[test]
    fn delimited_cells_are_rebuilt_from_sequences() {
        let papers = sample();
        let matched: Vec<&Paper> = papers.iter().collect();
        let document = to_csv(&matched).unwrap();
        let mut reader = csv::Reader::from_reader(document.as_bytes());
        let first = reader.records().next().unwrap().unwrap();
        assert_eq!(first.get(1).unwrap(), "Ada Lovelace; Alan Turing");
        assert_eq!(first.get(4).unwrap(), "US");
    }
}
