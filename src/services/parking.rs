//src/services/parking.rs
use log::{info, warn};
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::models::{Category, FetchedProduct, RateOption};
use crate::BoxError;

/// Parking accounts are not in the provider API, so they come from a rate
/// comparison page: one table row per account with the cells
/// `bank | product | base rate | top rate`.
pub struct ParkingScraper {
    client: Client,
    url: String,
}

impl ParkingScraper {
    pub fn new(url: String) -> Result<Self, BoxError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;
        Ok(Self { client, url })
    }

    pub async fn fetch_products(&self) -> Result<Vec<FetchedProduct>, BoxError> {
        info!("Fetching parking account rates from URL: {}", self.url);
        let html = self.client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_parking_table(&html)
    }
}

/// Synthesized id for products without a provider code.
pub fn parking_id(bank: &str, name: &str) -> String {
    format!("parking-{}-{}", slug(bank), slug(name))
}

fn slug(s: &str) -> String {
    let mut out = String::new();
    for c in s.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

pub fn parse_parking_table(html: &str) -> Result<Vec<FetchedProduct>, BoxError> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("table tr").map_err(|e| format!("bad selector: {:?}", e))?;
    let cell_selector = Selector::parse("td").map_err(|e| format!("bad selector: {:?}", e))?;
    // cells like "1억원까지 연 2.0%" carry other numbers; the rate is the one
    // marked with %, and a bare number only counts when no % is present
    let percent_re = Regex::new(r"(\d+(?:\.\d+)?)\s*%")?;
    let number_re = Regex::new(r"(\d+(?:\.\d+)?)")?;

    let parse_rate = |cell: &str| -> Option<f64> {
        let re = if cell.contains('%') { &percent_re } else { &number_re };
        re.captures(cell)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    };

    let mut products = Vec::new();
    for row in document.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|td| td.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .collect();

        // header rows use <th>, so they have no cells here
        if cells.len() < 4 {
            continue;
        }

        let (bank, name) = (&cells[0], &cells[1]);
        let (base_rate, top_rate) = match (parse_rate(&cells[2]), parse_rate(&cells[3])) {
            (Some(base), Some(top)) if !bank.is_empty() && !name.is_empty() => (base, top),
            _ => {
                warn!("Dropping parking row with unreadable cells: {:?}", cells);
                continue;
            }
        };

        products.push(FetchedProduct {
            id: parking_id(bank, name),
            bank: bank.clone(),
            name: name.clone(),
            category: Category::Parking,
            term_options: vec![RateOption { term_months: 0, base_rate, top_rate }],
        });
    }

    info!("Parsed {} parking products", products.len());
    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table>
          <tr><th>은행</th><th>상품</th><th>기본</th><th>최고</th></tr>
          <tr><td>토스뱅크</td><td>토스뱅크 통장</td><td>연 1.8%</td><td>연 <b>2.0</b>%</td></tr>
          <tr><td>케이뱅크</td><td>생활통장 플러스</td><td>2.3%</td><td>3.0%</td></tr>
          <tr><td>하나은행</td><td>달달 하나 통장</td><td>연 1.5%</td><td>1억원까지 연 2.5 %</td></tr>
          <tr><td>Broken Bank</td><td>No Rates</td><td>-</td><td>문의</td></tr>
          <tr><td>short row</td></tr>
        </table>
        </body></html>"#;

    #[test]
    fn parses_rows_with_rates() {
        let products = parse_parking_table(PAGE).unwrap();
        assert_eq!(products.len(), 3);

        let toss = &products[0];
        assert_eq!(toss.bank, "토스뱅크");
        assert_eq!(toss.category, Category::Parking);
        assert_eq!(
            toss.term_options,
            vec![RateOption { term_months: 0, base_rate: 1.8, top_rate: 2.0 }]
        );
        assert_eq!(toss.id, "parking-토스뱅크-토스뱅크-통장");
    }

    #[test]
    fn rate_is_the_number_marked_with_percent() {
        let products = parse_parking_table(PAGE).unwrap();
        let hana = products.iter().find(|p| p.bank == "하나은행").unwrap();
        assert_eq!(hana.term_options[0].top_rate, 2.5);
        assert_eq!(hana.term_options[0].base_rate, 1.5);
    }

    #[test]
    fn ids_are_stable_across_spacing_and_case() {
        assert_eq!(parking_id("K Bank", "Plus  Account!"), "parking-k-bank-plus-account");
        assert_eq!(parking_id(" k bank ", "plus account"), parking_id("K Bank", "Plus Account"));
    }
}
