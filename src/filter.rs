use crate::catalog::{Paper, Status};

/// One query's worth of search predicates. Every field defaults to "no
/// constraint"; predicates combine with AND semantics.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub title_query: String,
    pub author_query: String,
    pub countries: Vec<String>,
    pub venues: Vec<String>,
    pub statuses: Vec<Status>,
    pub year_min: Option<i32>,
    pub year_max: Option<i32>,
}

/// Single linear pass over the table, preserving load order. Returns an
/// empty vec (never an error) when nothing matches.
pub fn search<'a>(papers: &'a [Paper], criteria: &SearchCriteria) -> Vec<&'a Paper> {
    papers
        .iter()
        .filter(|paper| matches(paper, criteria))
        .collect()
}

fn matches(paper: &Paper, criteria: &SearchCriteria) -> bool {
    if !criteria.title_query.is_empty() && !contains_ci(&paper.title, &criteria.title_query) {
        return false;
    }
    if !criteria.author_query.is_empty()
        && !paper
            .authors
            .iter()
            .any(|author| contains_ci(author, &criteria.author_query))
    {
        return false;
    }
    if !criteria.countries.is_empty()
        && !paper
            .countries
            .iter()
            .any(|country| criteria.countries.contains(country))
    {
        return false;
    }
    if !criteria.venues.is_empty() && !criteria.venues.contains(&paper.venue) {
        return false;
    }
    if !criteria.statuses.is_empty() && !criteria.statuses.contains(&paper.status) {
        return false;
    }
    if let Some(min) = criteria.year_min {
        if paper.year < min {
            return false;
        }
    }
    if let Some(max) = criteria.year_max {
        if paper.year > max {
            return false;
        }
    }
    true
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
