// src/services/term.rs
use log::warn;
use crate::models::{round_rate, Candidate, FetchedProduct, RateOption};

/// Terms tried in order before falling back to the longest one on offer.
/// 12 months is the usual comparison basis for these products.
pub const PREFERRED_TERMS: [u32; 3] = [12, 24, 6];

/// Picks the representative option: the first one matching 12, then 24, then 6
/// months; otherwise the longest term (first of equals).
pub fn select_term(options: &[RateOption]) -> Option<&RateOption> {
    for term in PREFERRED_TERMS {
        if let Some(opt) = options.iter().find(|o| o.term_months == term) {
            return Some(opt);
        }
    }

    options
        .iter()
        .reduce(|best, o| if o.term_months > best.term_months { o } else { best })
}

/// Collapses a fetched product into a candidate. `None` when the provider
/// reported no options at all.
pub fn to_candidate(product: FetchedProduct) -> Option<Candidate> {
    let selected = match select_term(&product.term_options) {
        Some(opt) => *opt,
        None => {
            warn!("Dropping {} ({}): no rate options reported", product.id, product.name);
            return None;
        }
    };

    Some(Candidate {
        id: product.id,
        bank: product.bank,
        name: product.name,
        category: product.category,
        base_rate: round_rate(selected.base_rate),
        top_rate: round_rate(selected.top_rate),
        term_months: selected.term_months,
        rate_options: Some(product.term_options),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn opt(term_months: u32, top_rate: f64) -> RateOption {
        RateOption { term_months, base_rate: top_rate - 0.5, top_rate }
    }

    #[test]
    fn prefers_twelve_months() {
        let options = [opt(6, 3.0), opt(12, 3.5), opt(24, 3.2)];
        assert_eq!(select_term(&options), Some(&options[1]));
    }

    #[test]
    fn falls_through_priority_order() {
        let options = [opt(6, 3.0), opt(36, 3.9), opt(24, 3.2)];
        assert_eq!(select_term(&options).map(|o| o.term_months), Some(24));

        let options = [opt(3, 2.0), opt(6, 3.0), opt(36, 3.9)];
        assert_eq!(select_term(&options).map(|o| o.term_months), Some(6));
    }

    #[test]
    fn falls_back_to_longest_term() {
        let options = [opt(3, 2.0), opt(9, 2.5)];
        assert_eq!(select_term(&options), Some(&options[1]));
    }

    #[test]
    fn first_match_wins_on_duplicate_terms() {
        // simple and compound interest are reported as separate options
        let options = [opt(12, 3.1), opt(12, 3.3)];
        assert_eq!(select_term(&options).map(|o| o.top_rate), Some(3.1));

        let options = [opt(18, 3.1), opt(18, 3.3)];
        assert_eq!(select_term(&options).map(|o| o.top_rate), Some(3.1));
    }

    #[test]
    fn empty_options_select_nothing() {
        assert!(select_term(&[]).is_none());

        let product = FetchedProduct {
            id: "X1".into(),
            bank: "Bank".into(),
            name: "Nothing".into(),
            category: Category::Deposit,
            term_options: vec![],
        };
        assert!(to_candidate(product).is_none());
    }

    #[test]
    fn candidate_keeps_full_option_set() {
        let product = FetchedProduct {
            id: "A001".into(),
            bank: "Bank".into(),
            name: "Deposit".into(),
            category: Category::Deposit,
            term_options: vec![opt(6, 3.0), opt(12, 3.5), opt(24, 3.2)],
        };
        let c = to_candidate(product).unwrap();
        assert_eq!(c.term_months, 12);
        assert_eq!(c.top_rate, 3.5);
        assert_eq!(c.base_rate, 3.0);
        assert_eq!(c.rate_options.map(|o| o.len()), Some(3));
    }
}
