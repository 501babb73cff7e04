//! Client-side filtering and sorting over fetched listings, the way the
//! product pages narrow down what the server returned.

use crate::models::{Listing, ListingStatus, ListingType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BrowseSort {
    #[default]
    Newest,
    PriceLowToHigh,
    PriceHighToLow,
}

#[derive(Debug, Clone, Default)]
pub struct BrowseFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub listing_type: Option<ListingType>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub available_only: bool,
    pub sort: BrowseSort,
}

/// The price a card shows: the sale amount or the daily rental rate.
pub fn display_price(listing: &Listing) -> Option<i64> {
    match listing.listing_type {
        ListingType::Sale => listing.price.amount,
        ListingType::Rental => listing.price.per_day,
    }
}

impl BrowseFilter {
    pub fn matches(&self, listing: &Listing) -> bool {
        if self.available_only && listing.status != ListingStatus::Available {
            return false;
        }
        if let Some(kind) = self.listing_type {
            if listing.listing_type != kind {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            if !listing.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            let hit = listing.title.to_lowercase().contains(&needle)
                || listing.description.to_lowercase().contains(&needle)
                || listing.category.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            let Some(price) = display_price(listing) else {
                return false;
            };
            if self.min_price.is_some_and(|min| price < min)
                || self.max_price.is_some_and(|max| price > max)
            {
                return false;
            }
        }
        true
    }

    pub fn apply(&self, listings: &[Listing]) -> Vec<Listing> {
        let mut out: Vec<Listing> = listings
            .iter()
            .filter(|l| self.matches(l))
            .cloned()
            .collect();
        match self.sort {
            BrowseSort::Newest => out.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            BrowseSort::PriceLowToHigh => {
                out.sort_by_key(|l| display_price(l).unwrap_or(i64::MAX))
            }
            BrowseSort::PriceHighToLow => {
                out.sort_by_key(|l| std::cmp::Reverse(display_price(l).unwrap_or(i64::MIN)))
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::models::{ListingCondition, Price, SellerSummary};

    fn listing(title: &str, kind: ListingType, price: i64, age_days: i64) -> Listing {
        let created = Utc::now() - Duration::days(age_days);
        let price = match kind {
            ListingType::Sale => Price {
                amount: Some(price),
                ..Price::default()
            },
            ListingType::Rental => Price {
                per_day: Some(price),
                per_week: Some(price * 6),
                per_month: Some(price * 20),
                security_deposit: Some(0),
                ..Price::default()
            },
        };
        Listing {
            id: Uuid::new_v4(),
            seller: SellerSummary {
                id: Uuid::new_v4(),
                username: "sam".into(),
            },
            title: title.into(),
            description: format!("{title} in great shape"),
            listing_type: kind,
            price,
            category: "Home".into(),
            condition: ListingCondition::Good,
            images: vec![],
            status: ListingStatus::Available,
            location: "Town".into(),
            delivery_available: false,
            contact_info: "sam@example.com".into(),
            renter_id: None,
            rental_start_date: None,
            rental_end_date: None,
            rental_quantity: None,
            rental_total_amount: None,
            created_at: created,
            updated_at: created,
        }
    }

    fn titles(listings: &[Listing]) -> Vec<&str> {
        listings.iter().map(|l| l.title.as_str()).collect()
    }

    #[test]
    fn search_is_case_insensitive() {
        let all = vec![
            listing("Oak Table", ListingType::Sale, 100, 1),
            listing("Lamp", ListingType::Sale, 20, 2),
        ];
        let filter = BrowseFilter {
            search: Some("oak".into()),
            ..Default::default()
        };
        assert_eq!(titles(&filter.apply(&all)), vec!["Oak Table"]);
    }

    #[test]
    fn price_range_and_type_narrow_results() {
        let all = vec![
            listing("Sofa", ListingType::Sale, 400, 1),
            listing("Ladder", ListingType::Rental, 5, 2),
            listing("Rug", ListingType::Sale, 60, 3),
        ];
        let filter = BrowseFilter {
            listing_type: Some(ListingType::Sale),
            max_price: Some(100),
            ..Default::default()
        };
        assert_eq!(titles(&filter.apply(&all)), vec!["Rug"]);
    }

    #[test]
    fn sorts_by_newest_and_price() {
        let all = vec![
            listing("Old", ListingType::Sale, 10, 9),
            listing("New", ListingType::Sale, 30, 1),
            listing("Mid", ListingType::Sale, 20, 5),
        ];
        assert_eq!(
            titles(&BrowseFilter::default().apply(&all)),
            vec!["New", "Mid", "Old"]
        );
        let cheap_first = BrowseFilter {
            sort: BrowseSort::PriceLowToHigh,
            ..Default::default()
        };
        assert_eq!(titles(&cheap_first.apply(&all)), vec!["Old", "Mid", "New"]);
        let dear_first = BrowseFilter {
            sort: BrowseSort::PriceHighToLow,
            ..Default::default()
        };
        assert_eq!(titles(&dear_first.apply(&all)), vec!["New", "Mid", "Old"]);
    }

    #[test]
    fn available_only_hides_rented() {
        let mut rented = listing("Tent", ListingType::Rental, 10, 1);
        rented.status = ListingStatus::Rented;
        let all = vec![rented, listing("Stove", ListingType::Rental, 4, 2)];
        let filter = BrowseFilter {
            available_only: true,
            ..Default::default()
        };
        assert_eq!(titles(&filter.apply(&all)), vec!["Stove"]);
    }
}
