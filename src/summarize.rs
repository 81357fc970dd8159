use std::collections::HashMap;
use std::path::Path;

use paper_atlas::catalog::PaperCatalog;

use crate::AppConfig;

fn format_with_commas<T: ToString>(value: T) -> String {
    let s = value.to_string();
    let (sign, digits) = if let Some(stripped) = s.strip_prefix('-') {
        ("-", stripped)
    } else {
        ("", s.as_str())
    };
    let mut out = String::new();
    let mut count = 0;
    for ch in digits.chars().rev() {
        if count == 3 {
            out.push(',');
            count = 0;
        }
        out.push(ch);
        count += 1;
    }
    let formatted: String = out.chars().rev().collect();
    format!("{}{}", sign, formatted)
}

fn counts_desc(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut pairs: Vec<(String, usize)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs
}

pub fn run_summarize(config: &AppConfig) -> Result<(), String> {
    let csv_path = Path::new(&config.csv_path);
    println!("Loading {}...", csv_path.display());
    let catalog = PaperCatalog::load(csv_path)?;
    let total = catalog.len();
    if total == 0 {
        println!("The paper table is empty.");
        return Ok(());
    }

    println!("\n=== SUMMARY STATISTICS ===");
    println!("Total papers: {}", format_with_commas(total));

    let mut venue_counts: HashMap<String, usize> = HashMap::new();
    let mut year_counts: HashMap<i32, usize> = HashMap::new();
    let mut status_counts: HashMap<String, usize> = HashMap::new();
    let mut subfield_counts: HashMap<String, usize> = HashMap::new();
    let mut country_counts: HashMap<String, usize> = HashMap::new();
    let mut citation_total: i64 = 0;
    let mut citation_max: i64 = 0;
    let mut with_citations = 0usize;
    for paper in catalog.papers() {
        *venue_counts.entry(paper.venue.clone()).or_insert(0) += 1;
        *year_counts.entry(paper.year).or_insert(0) += 1;
        *status_counts
            .entry(paper.status.label().to_string())
            .or_insert(0) += 1;
        *subfield_counts.entry(paper.subfield.clone()).or_insert(0) += 1;
        for country in &paper.countries {
            *country_counts.entry(country.clone()).or_insert(0) += 1;
        }
        if let Some(count) = paper.citation_count {
            citation_total += count;
            citation_max = citation_max.max(count);
            with_citations += 1;
        }
    }

    println!("\n=== VENUES ===");
    println!("Number of unique venues: {}", venue_counts.len());
    println!("Top 10 venues by paper count:");
    for (venue, count) in counts_desc(venue_counts).into_iter().take(10) {
        println!("  {venue}: {} papers", format_with_commas(count));
    }

    println!("\n=== YEARS ===");
    let mut years: Vec<(i32, usize)> = year_counts.into_iter().collect();
    years.sort_by_key(|entry| entry.0);
    if let Some((min, max)) = catalog.year_range() {
        println!("Year range: {min} - {max}");
    }
    println!("Papers per year:");
    for (year, count) in years {
        println!("  {year}: {} papers", format_with_commas(count));
    }

    println!("\n=== STATUS ===");
    for (status, count) in counts_desc(status_counts) {
        println!(
            "  {status}: {} papers ({:.1}%)",
            format_with_commas(count),
            count as f64 / total as f64 * 100.0
        );
    }

    println!("\n=== SUBFIELDS ===");
    for (subfield, count) in counts_desc(subfield_counts) {
        println!(
            "  {subfield}: {} papers ({:.1}%)",
            format_with_commas(count),
            count as f64 / total as f64 * 100.0
        );
    }

    println!("\n=== COUNTRIES ===");
    println!("Number of unique countries: {}", country_counts.len());
    println!("Top 10 countries by author affiliation:");
    for (country, count) in counts_desc(country_counts).into_iter().take(10) {
        println!("  {country}: {} papers", format_with_commas(count));
    }

    println!("\n=== CITATIONS ===");
    println!("Total citations: {}", format_with_commas(citation_total));
    if with_citations > 0 {
        println!(
            "Average citations per paper: {:.2}",
            citation_total as f64 / with_citations as f64
        );
        println!("Max citations: {}", format_with_commas(citation_max));
    }
    println!(
        "Papers without citation data: {}",
        format_with_commas(total - with_citations)
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commas_group_thousands() {
        assert_eq!(format_with_commas(0), "0");
        assert_eq!(format_with_commas(999), "999");
        assert_eq!(format_with_commas(1000), "1,000");
        assert_eq!(format_with_commas(1234567), "1,234,567");
        assert_eq!(format_with_commas(-4200), "-4,200");
    }

    #[test]
    fn counts_sort_by_count_then_name() {
        let counts = HashMap::from([
            ("ICML".to_string(), 3usize),
            ("ACL".to_string(), 5),
            ("KDD".to_string(), 3),
        ]);
        let sorted = counts_desc(counts);
        assert_eq!(sorted[0].0, "ACL");
        assert_eq!(sorted[1].0, "ICML");
        assert_eq!(sorted[2].0, "KDD");
    }
}
