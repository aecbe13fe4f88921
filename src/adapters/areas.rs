use crate::adapters::http::get_page;
use crate::config::AreaSelection;
use crate::core::retry::RetryPolicy;
use crate::domain::model::Area;
use crate::domain::ports::AreaSource;
use crate::utils::error::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};

const AREA_COLUMN: &str = "City/Town";

/// Reads the first `<table>` of a population-ranked page.
pub struct PopulationTableSource {
    client: Client,
    url: String,
    policy: RetryPolicy,
}

impl PopulationTableSource {
    pub fn new(client: Client, url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            client,
            url: url.into(),
            policy,
        }
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| HarvestError::ProcessingError {
        message: format!("Invalid selector '{}': {}", css, e),
    })
}

fn cell_text(cell: scraper::ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

/// Area names from the `City/Town` column, in table order. Names containing
/// `/` are dropped.
pub fn parse_area_table(html: &str) -> Result<Vec<Area>> {
    let document = Html::parse_document(html);
    let table_selector = parse_selector("table")?;
    let row_selector = parse_selector("tr")?;
    let header_selector = parse_selector("th")?;
    let cell_selector = parse_selector("td")?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| HarvestError::ProcessingError {
            message: "No table found on the area source page".to_string(),
        })?;

    let column = table
        .select(&header_selector)
        .position(|th| cell_text(th) == AREA_COLUMN)
        .ok_or_else(|| HarvestError::ProcessingError {
            message: format!("Area table has no '{}' column", AREA_COLUMN),
        })?;

    let areas = table
        .select(&row_selector)
        .filter_map(|row| row.select(&cell_selector).nth(column))
        .map(cell_text)
        .filter(|name| !name.is_empty() && !name.contains('/'))
        .map(Area::new)
        .collect();
    Ok(areas)
}

#[async_trait]
impl AreaSource for PopulationTableSource {
    async fn list_areas(&self) -> Result<Vec<Area>> {
        tracing::info!("Retrieving ranked areas from {}", self.url);
        let context = format!("area source: {}", self.url);
        let response = self
            .policy
            .execute(&context, || get_page(self.client.get(&self.url)))
            .await?;
        let areas = parse_area_table(&response.body)?;
        tracing::info!("Found {} ranked areas", areas.len());
        Ok(areas)
    }
}

/// Configured area names, used as-is without any lookup.
#[derive(Debug, Clone)]
pub struct StaticAreaSource {
    names: Vec<String>,
}

impl StaticAreaSource {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

#[async_trait]
impl AreaSource for StaticAreaSource {
    async fn list_areas(&self) -> Result<Vec<Area>> {
        Ok(self.names.iter().map(Area::new).collect())
    }
}

/// Applies top-N or named filtering while keeping the ranked order.
pub fn select_areas(ranked: Vec<Area>, selection: &AreaSelection) -> Vec<Area> {
    match selection {
        AreaSelection::Top(count) => ranked.into_iter().take(*count).collect(),
        AreaSelection::Named(names) => ranked
            .into_iter()
            .filter(|area| names.iter().any(|n| n == area.name()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;

    const TABLE: &str = r#"
<html><body>
<table>
  <tr><th>Rank</th><th>City/Town</th><th>Population</th></tr>
  <tr><td>1</td><td>London</td><td>8,908,081</td></tr>
  <tr><td>2</td><td>Birmingham</td><td>1,153,717</td></tr>
  <tr><td>3</td><td>Newcastle/Gateshead</td><td>774,891</td></tr>
  <tr><td>4</td><td>Leeds</td><td>455,123</td></tr>
  <tr><td>5</td><td>Edinburgh</td><td>464,990</td></tr>
</table>
<table><tr><th>City/Town</th></tr><tr><td>Ignored</td></tr></table>
</body></html>
"#;

    fn names(areas: &[Area]) -> Vec<&str> {
        areas.iter().map(Area::name).collect()
    }

    #[test]
    fn test_parse_area_table_drops_slashed_names() {
        let areas = parse_area_table(TABLE).unwrap();
        assert_eq!(
            names(&areas),
            vec!["London", "Birmingham", "Leeds", "Edinburgh"]
        );
    }

    #[test]
    fn test_parse_area_table_without_column_fails() {
        let html = "<table><tr><th>Name</th></tr><tr><td>Leeds</td></tr></table>";
        assert!(parse_area_table(html).is_err());
    }

    #[test]
    fn test_select_top_and_named_keep_rank_order() {
        let ranked = parse_area_table(TABLE).unwrap();

        let top = select_areas(ranked.clone(), &AreaSelection::Top(2));
        assert_eq!(names(&top), vec!["London", "Birmingham"]);

        let named = select_areas(
            ranked,
            &AreaSelection::Named(vec!["Edinburgh".to_string(), "London".to_string()]),
        );
        assert_eq!(names(&named), vec!["London", "Edinburgh"]);
    }

    #[tokio::test]
    async fn test_population_table_source_fetches_page() {
        let server = MockServer::start();
        let page_mock = server.mock(|when, then| {
            when.method(GET).path("/uk-cities-population-1000/");
            then.status(200).body(TABLE);
        });

        let source = PopulationTableSource::new(
            Client::new(),
            server.url("/uk-cities-population-1000/"),
            RetryPolicy::fixed(2, Duration::ZERO),
        );
        let areas = source.list_areas().await.unwrap();

        page_mock.assert();
        assert_eq!(areas.len(), 4);
        assert_eq!(areas[0].name(), "London");
    }
}
