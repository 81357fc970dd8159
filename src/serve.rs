use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use clap::Args;
use minijinja::Environment;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use url::form_urlencoded;

use paper_atlas::catalog::{PaperCatalog, Status};
use paper_atlas::export;
use paper_atlas::filter::{search as run_search, SearchCriteria};

use crate::AppConfig;

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long = "port", default_value_t = 5001, help = "port to serve on")]
    pub port: u16,
    #[arg(long, help = "Path to the merged CSV table")]
    pub csv: Option<PathBuf>,
}

#[derive(Clone)]
struct ServeConfig {
    port: u16,
    csv_path: PathBuf,
    templates_dir: String,
    static_dir: String,
}

impl ServeConfig {
    fn new(args: &ServeArgs, config: &AppConfig) -> Self {
        Self {
            port: args.port,
            csv_path: args
                .csv
                .clone()
                .unwrap_or_else(|| PathBuf::from(&config.csv_path)),
            templates_dir: config.templates_dir.clone(),
            static_dir: config.static_dir.clone(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    catalog: Arc<PaperCatalog>,
    page_context: Arc<Value>,
}

static CONTINENTS: &[(&str, &[&str])] = &[
    (
        "Africa",
        &[
            "Algeria", "Angola", "Benin", "Botswana", "Burkina Faso", "Burundi", "Cameroon",
            "Cape Verde", "Central African Republic", "Chad", "Comoros", "Congo",
            "Democratic Republic of the Congo", "Djibouti", "Egypt", "Equatorial Guinea",
            "Eritrea", "Ethiopia", "Gabon", "Gambia", "Ghana", "Guinea", "Guinea-Bissau",
            "Ivory Coast", "Kenya", "Lesotho", "Liberia", "Libya", "Madagascar", "Malawi",
            "Mali", "Mauritania", "Mauritius", "Morocco", "Mozambique", "Namibia", "Niger",
            "Nigeria", "Rwanda", "São Tomé and Príncipe", "Senegal", "Seychelles",
            "Sierra Leone", "Somalia", "South Africa", "South Sudan", "Sudan", "Tanzania",
            "Togo", "Tunisia", "Uganda", "Zambia", "Zimbabwe",
        ],
    ),
    (
        "Asia",
        &[
            "Afghanistan", "Armenia", "Azerbaijan", "Bahrain", "Bangladesh", "Bhutan",
            "Brunei Darussalam", "Cambodia", "China", "Cyprus", "Georgia", "India",
            "Indonesia", "Iran", "Iraq", "Israel", "Japan", "Jordan", "Kazakhstan", "Kuwait",
            "Kyrgyzstan", "Laos", "Lebanon", "Malaysia", "Maldives", "Mongolia", "Myanmar",
            "Nepal", "North Korea", "Oman", "Pakistan", "Palestine", "Philippines", "Qatar",
            "Saudi Arabia", "Singapore", "South Korea", "Sri Lanka", "Syria", "Taiwan",
            "Tajikistan", "Thailand", "Timor-Leste", "Turkey", "Turkmenistan",
            "United Arab Emirates", "Uzbekistan", "Vietnam", "Yemen",
        ],
    ),
    (
        "Europe",
        &[
            "Albania", "Andorra", "Austria", "Belarus", "Belgium", "Bosnia and Herzegovina",
            "Bulgaria", "Croatia", "Czech Republic", "Czechia", "Denmark", "Estonia",
            "Finland", "France", "Germany", "Greece", "Hungary", "Iceland", "Ireland",
            "Italy", "Latvia", "Liechtenstein", "Lithuania", "Luxembourg", "Malta",
            "Moldova", "Monaco", "Montenegro", "Netherlands", "North Macedonia", "Norway",
            "Poland", "Portugal", "Romania", "Russia", "Russian Federation", "San Marino",
            "Serbia", "Slovakia", "Slovenia", "Spain", "Sweden", "Switzerland", "Ukraine",
            "United Kingdom", "Vatican City",
        ],
    ),
    (
        "North America",
        &[
            "Antigua and Barbuda", "Bahamas", "Barbados", "Belize", "Canada", "Costa Rica",
            "Cuba", "Dominica", "Dominican Republic", "El Salvador", "Grenada", "Guatemala",
            "Haiti", "Honduras", "Jamaica", "Mexico", "Nicaragua", "Panama", "Puerto Rico",
            "Saint Kitts and Nevis", "Saint Lucia", "Saint Vincent and the Grenadines",
            "Trinidad and Tobago", "United States",
        ],
    ),
    (
        "South America",
        &[
            "Argentina", "Bolivia", "Brazil", "Chile", "Colombia", "Ecuador", "Guyana",
            "Paraguay", "Peru", "Suriname", "Uruguay", "Venezuela",
        ],
    ),
    (
        "Oceania",
        &[
            "Australia", "Fiji", "Kiribati", "Marshall Islands", "Micronesia", "Nauru",
            "New Caledonia", "New Zealand", "Palau", "Papua New Guinea", "Samoa",
            "Solomon Islands", "Tonga", "Tuvalu", "Vanuatu",
        ],
    ),
];

pub async fn run_with_args(
    args: ServeArgs,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let serve_config = ServeConfig::new(&args, config);
    println!(
        "loading the paper table from {}",
        serve_config.csv_path.display()
    );
    let catalog = PaperCatalog::load(&serve_config.csv_path)?;
    println!("loaded {} papers", catalog.len());

    let state = AppState {
        page_context: Arc::new(build_page_context(&catalog)),
        catalog: Arc::new(catalog),
    };
    let env = build_template_env(&serve_config.templates_dir);

    let app = Router::new()
        .route("/", get(index))
        .route("/search", get(search))
        .route("/export_csv", get(export_csv))
        .route("/health", get(health_check))
        .nest_service("/static", ServeDir::new(serve_config.static_dir.clone()))
        .with_state((state, Arc::new(env)));

    let addr = format!("0.0.0.0:{}", serve_config.port);
    println!("starting search server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_template_env(templates_dir: &str) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader(templates_dir));
    env
}

/// Template context for the search page: the filter vocabularies derived
/// from the loaded table, computed once at startup.
fn build_page_context(catalog: &PaperCatalog) -> Value {
    let countries = catalog.unique_countries();
    let venues = catalog.unique_venues();
    let venues_by_subfield: Vec<Value> = catalog
        .venues_by_subfield()
        .into_iter()
        .map(|(subfield, venues)| json!({ "subfield": subfield, "venues": venues }))
        .collect();
    let continents = group_countries_by_continent(&countries);
    let (year_min, year_max) = catalog.year_range().unwrap_or((0, 0));
    json!({
        "total_papers": catalog.len(),
        "countries": countries,
        "venues": venues,
        "venues_by_subfield": venues_by_subfield,
        "continents": continents,
        "year_min": year_min,
        "year_max": year_max,
        "statuses": ["accepted", "rejected", "withdrawn", "unknown"],
    })
}

/// Groups the dataset's countries under their continent for the filter UI.
/// Countries outside the fixed continent table land in a trailing "Other"
/// group so nothing disappears from the page.
fn group_countries_by_continent(countries: &[String]) -> Vec<Value> {
    let mut grouped = Vec::new();
    let mut seen: Vec<&String> = Vec::new();
    for (continent, members) in CONTINENTS {
        let present: Vec<&String> = countries
            .iter()
            .filter(|country| members.contains(&country.as_str()))
            .collect();
        if !present.is_empty() {
            seen.extend(present.iter().copied());
            grouped.push(json!({ "name": continent, "countries": present }));
        }
    }
    let leftover: Vec<&String> = countries
        .iter()
        .filter(|country| !seen.contains(country))
        .collect();
    if !leftover.is_empty() {
        grouped.push(json!({ "name": "Other", "countries": leftover }));
    }
    grouped
}

fn parse_query(raw: Option<String>) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    let Some(raw) = raw else { return map };
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        map.entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    map
}

fn first_value(query_map: &HashMap<String, Vec<String>>, key: &str) -> String {
    query_map
        .get(key)
        .and_then(|values| values.first())
        .cloned()
        .unwrap_or_default()
}

/// Collects a multi-valued parameter, accepting both the bare key and the
/// `key[]` spelling, with blanks dropped.
fn list_values(query_map: &HashMap<String, Vec<String>>, key: &str) -> Vec<String> {
    let mut values = Vec::new();
    for spelling in [key.to_string(), format!("{key}[]")] {
        if let Some(list) = query_map.get(&spelling) {
            values.extend(list.iter().filter(|v| !v.trim().is_empty()).cloned());
        }
    }
    values
}

/// Validates the query parameters into an explicit criteria struct. A
/// non-numeric year bound is treated as absent (unbounded); an unknown
/// status label is an error surfaced as a 400 response.
fn criteria_from_query(
    query_map: &HashMap<String, Vec<String>>,
) -> Result<SearchCriteria, String> {
    let mut statuses = Vec::new();
    for label in list_values(query_map, "statuses") {
        let status = Status::parse_label(&label)
            .ok_or_else(|| format!("Unknown status: {label}"))?;
        if !statuses.contains(&status) {
            statuses.push(status);
        }
    }
    Ok(SearchCriteria {
        title_query: first_value(query_map, "title"),
        author_query: first_value(query_map, "author"),
        countries: list_values(query_map, "countries"),
        venues: list_values(query_map, "venues"),
        statuses,
        year_min: first_value(query_map, "year_min").trim().parse::<i32>().ok(),
        year_max: first_value(query_map, "year_max").trim().parse::<i32>().ok(),
    })
}

async fn index(
    State((state, env)): State<(AppState, Arc<Environment<'static>>)>,
) -> axum::response::Response {
    let template = match env.get_template("index.html") {
        Ok(template) => template,
        Err(err) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    };
    match template.render(state.page_context.as_ref()) {
        Ok(rendered) => Html(rendered).into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

async fn search(
    State((state, _env)): State<(AppState, Arc<Environment<'static>>)>,
    RawQuery(query): RawQuery,
) -> axum::response::Response {
    let query_map = parse_query(query);
    let criteria = match criteria_from_query(&query_map) {
        Ok(criteria) => criteria,
        Err(err) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": err }))).into_response()
        }
    };
    let matched = run_search(state.catalog.papers(), &criteria);
    Json(export::encode_results(&matched)).into_response()
}

async fn export_csv(
    State((state, _env)): State<(AppState, Arc<Environment<'static>>)>,
    RawQuery(query): RawQuery,
) -> axum::response::Response {
    let query_map = parse_query(query);
    let criteria = match criteria_from_query(&query_map) {
        Ok(criteria) => criteria,
        Err(err) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": err }))).into_response()
        }
    };
    let matched = run_search(state.catalog.papers(), &criteria);
    let document = match export::to_csv(&matched) {
        Ok(document) => document,
        Err(err) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err })),
            )
                .into_response()
        }
    };
    let filename = format!(
        "papers_export_{}.csv",
        chrono::Utc::now().format("%Y-%m-%d")
    );
    (
        [
            (
                header::CONTENT_TYPE,
                "text/csv; charset=utf-8".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        document,
    )
        .into_response()
}

async fn health_check(
    State((state, _env)): State<(AppState, Arc<Environment<'static>>)>,
) -> impl IntoResponse {
    Json(json!({
        "ok": true,
        "papers": state.catalog.len(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use paper_atlas::catalog::Paper;

    fn query_map(raw: &str) -> HashMap<String, Vec<String>> {
        parse_query(Some(raw.to_string()))
    }

    #[test]
    fn parse_query_builds_a_multimap() {
        let map = query_map("title=deep&countries%5B%5D=Kenya&countries%5B%5D=Ghana");
        assert_eq!(map["title"], vec!["deep"]);
        assert_eq!(map["countries[]"], vec!["Kenya", "Ghana"]);
    }

    #[test]
    fn criteria_accept_both_list_spellings() {
        let criteria =
            criteria_from_query(&query_map("countries=Kenya&countries%5B%5D=Ghana&venues=ICML"))
                .unwrap();
        assert_eq!(criteria.countries, vec!["Kenya", "Ghana"]);
        assert_eq!(criteria.venues, vec!["ICML"]);
    }

    #[test]
    fn invalid_year_bounds_are_treated_as_absent() {
        let criteria =
            criteria_from_query(&query_map("year_min=abc&year_max=2020")).unwrap();
        assert_eq!(criteria.year_min, None);
        assert_eq!(criteria.year_max, Some(2020));
        let criteria = criteria_from_query(&query_map("year_min=&year_max=")).unwrap();
        assert_eq!(criteria.year_min, None);
        assert_eq!(criteria.year_max, None);
    }

    #[test]
    fn unknown_status_labels_are_rejected() {
        let err = criteria_from_query(&query_map("statuses=published")).unwrap_err();
        assert!(err.contains("Unknown status"), "unexpected error: {err}");
        let criteria =
            criteria_from_query(&query_map("statuses=accepted&statuses=withdrawn")).unwrap();
        assert_eq!(criteria.statuses, vec![Status::Accepted, Status::Withdrawn]);
    }

    #[test]
    fn blank_list_entries_are_dropped() {
        let criteria = criteria_from_query(&query_map("countries=&venues=ICML")).unwrap();
        assert!(criteria.countries.is_empty());
        assert_eq!(criteria.venues, vec!["ICML"]);
    }

    #[test]
    fn page_context_carries_filter_vocabularies() {
        let papers = vec![
            Paper {
                title: "A".to_string(),
                authors: vec!["X".to_string()],
                venue: "ICML".to_string(),
                year: 2019,
                subfield: "Artificial Intelligence".to_string(),
                countries: vec!["Kenya".to_string(), "Atlantis".to_string()],
                status: Status::Accepted,
                track: String::new(),
                citation_count: None,
            },
            Paper {
                title: "B".to_string(),
                authors: vec!["Y".to_string()],
                venue: "ACL".to_string(),
                year: 2021,
                subfield: "Computational Linguistics".to_string(),
                countries: vec!["Ghana".to_string()],
                status: Status::Rejected,
                track: String::new(),
                citation_count: None,
            },
        ];
        let catalog = PaperCatalog::from_papers(papers);
        let context = build_page_context(&catalog);
        assert_eq!(context["total_papers"], 2);
        assert_eq!(context["year_min"], 2019);
        assert_eq!(context["year_max"], 2021);
        assert_eq!(context["venues"], json!(["ACL", "ICML"]));
        let continents = context["continents"].as_array().unwrap();
        let africa = &continents[0];
        assert_eq!(africa["name"], "Africa");
        assert_eq!(africa["countries"], json!(["Ghana", "Kenya"]));
        let other = continents.last().unwrap();
        assert_eq!(other["name"], "Other");
        assert_eq!(other["countries"], json!(["Atlantis"]));
    }
}
