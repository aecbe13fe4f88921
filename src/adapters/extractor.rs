//! HTML extraction of listing fields from search result pages and of the
//! content region from listing detail pages.

use crate::domain::model::ListingRecord;
use crate::domain::ports::FieldExtractor;
use crate::utils::error::{HarvestError, Result};
use scraper::{ElementRef, Html, Selector};

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| HarvestError::InvalidConfigValueError {
        field: "selector".to_string(),
        value: css.to_string(),
        reason: e.to_string(),
    })
}

pub struct HtmlListingExtractor {
    listing_base_url: String,
    article: Selector,
    name: Selector,
    address: Selector,
    telephone: Selector,
    link: Selector,
    content: Selector,
}

impl HtmlListingExtractor {
    pub fn new(listing_base_url: &str, content_selector: &str) -> Result<Self> {
        Ok(Self {
            listing_base_url: listing_base_url.trim_end_matches('/').to_string(),
            article: selector("article")?,
            name: selector("span[itemprop='name']")?,
            address: selector("span[itemprop='address']")?,
            telephone: selector("span[itemprop='telephone']")?,
            link: selector("a[href]")?,
            content: selector(content_selector)?,
        })
    }

    fn first_text(article: &ElementRef, selector: &Selector) -> Option<String> {
        article
            .select(selector)
            .next()
            .map(|el| el.text().collect::<String>())
    }

    fn listing(&self, article: &ElementRef) -> ListingRecord {
        let hrefs: Vec<&str> = article
            .select(&self.link)
            .filter_map(|a| a.value().attr("href"))
            .collect();

        let website = hrefs
            .iter()
            .find(|href| href.starts_with("http"))
            .map(|href| href.to_string());
        let listing_url = hrefs
            .iter()
            .find(|href| href.starts_with("/biz") && !href.contains("view=map"))
            .map(|href| format!("{}{}", self.listing_base_url, href));

        ListingRecord {
            business_name: Self::first_text(article, &self.name),
            address: Self::first_text(article, &self.address).map(|a| a.replace('\n', "")),
            telephone: Self::first_text(article, &self.telephone).map(|t| t.replace(' ', "")),
            website,
            listing_url,
        }
    }
}

impl FieldExtractor for HtmlListingExtractor {
    fn extract_listings(&self, body: &str) -> Vec<ListingRecord> {
        let document = Html::parse_document(body);
        document
            .select(&self.article)
            .map(|article| self.listing(&article))
            .collect()
    }

    fn content_text(&self, body: &str) -> String {
        let document = Html::parse_document(body);
        document
            .select(&self.content)
            .map(|region| region.text().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"
<html><body>
  <article>
    <a href="/biz/paws-and-claws-leeds-901/?view=map">Map</a>
    <a href="/biz/paws-and-claws-leeds-901/">More info</a>
    <span itemprop="name">Paws &amp; Claws</span>
    <span itemprop="address">2 Market St,
Leeds</span>
    <span itemprop="telephone">0113 234 5678</span>
    <a href="https://pawsandclaws.example.com">Website</a>
  </article>
  <article>
    <span itemprop="name">Name Only Pets</span>
  </article>
</body></html>
"#;

    fn extractor() -> HtmlListingExtractor {
        HtmlListingExtractor::new("https://www.yell.com/", "div.grid.grid-fluid").unwrap()
    }

    #[test]
    fn test_extracts_fields_per_article() {
        let listings = extractor().extract_listings(SEARCH_PAGE);

        assert_eq!(listings.len(), 2);
        let first = &listings[0];
        assert_eq!(first.business_name.as_deref(), Some("Paws & Claws"));
        assert_eq!(first.address.as_deref(), Some("2 Market St,Leeds"));
        assert_eq!(first.telephone.as_deref(), Some("01132345678"));
        assert_eq!(
            first.website.as_deref(),
            Some("https://pawsandclaws.example.com")
        );
        assert_eq!(
            first.listing_url.as_deref(),
            Some("https://www.yell.com/biz/paws-and-claws-leeds-901/")
        );
    }

    #[test]
    fn test_missing_fields_are_absent() {
        let listings = extractor().extract_listings(SEARCH_PAGE);
        let second = &listings[1];
        assert_eq!(second.business_name.as_deref(), Some("Name Only Pets"));
        assert_eq!(second.address, None);
        assert_eq!(second.telephone, None);
        assert_eq!(second.website, None);
        assert_eq!(second.listing_url, None);
    }

    #[test]
    fn test_page_without_articles_yields_nothing() {
        assert!(extractor()
            .extract_listings("<html><body><p>No results</p></body></html>")
            .is_empty());
    }

    #[test]
    fn test_content_text_only_reads_selected_regions() {
        let page = r#"
<html><body>
  <nav>hamster wheels on sale</nav>
  <div class="grid grid-fluid"><p>Specialists in <b>dog</b> grooming</p></div>
  <div class="grid grid-fluid"><p>Open Sundays</p></div>
</body></html>
"#;
        let text = extractor().content_text(page);
        assert!(text.contains("dog"));
        assert!(text.contains("Open Sundays"));
        assert!(!text.contains("hamster"));
    }
}
