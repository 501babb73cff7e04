use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{Listing, ListingCondition, ListingStatus, ListingType, Price, RentalPeriod},
};

pub const MAX_IMAGES: usize = 8;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListingEnvelope {
    pub listing: Listing,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ListingList {
    pub listings: Vec<Listing>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentListingRequest {
    pub duration: RentalPeriod,
    pub quantity: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
}

/// Multipart body accepted by create and update. Every field is optional on
/// update; unknown fields are ignored.
#[allow(dead_code)]
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct ListingUploadForm {
    title: String,
    description: String,
    #[schema(rename = "type")]
    listing_type: ListingType,
    /// Sale price; on update a JSON price object is also accepted.
    price: Option<i64>,
    price_per_day: Option<i64>,
    price_per_week: Option<i64>,
    price_per_month: Option<i64>,
    security_deposit: Option<i64>,
    delivery_charges: Option<i64>,
    category: String,
    condition: ListingCondition,
    location: String,
    delivery_available: Option<bool>,
    contact_info: String,
    status: Option<ListingStatus>,
    /// Up to 8 image files, 5 MiB each.
    #[schema(value_type = Vec<String>, format = Binary)]
    images: Vec<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Raw multipart submission: text parts keyed by name, file parts in order.
#[derive(Debug, Default)]
pub struct ListingForm {
    pub fields: HashMap<String, String>,
    pub images: Vec<ImageUpload>,
}

pub fn validate_images(images: &[ImageUpload]) -> AppResult<()> {
    if images.len() > MAX_IMAGES {
        return Err(AppError::bad_request(format!(
            "At most {MAX_IMAGES} images are allowed"
        )));
    }
    for image in images {
        if !image.content_type.starts_with("image/") {
            return Err(AppError::bad_request("Only image files are allowed"));
        }
        if image.bytes.len() > MAX_IMAGE_BYTES {
            return Err(AppError::bad_request(format!(
                "Image {} exceeds the 5MB limit",
                image.filename
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceFields {
    pub amount: Option<i64>,
    pub per_day: Option<i64>,
    pub per_week: Option<i64>,
    pub per_month: Option<i64>,
    pub security_deposit: Option<i64>,
    pub delivery_charges: Option<i64>,
}

impl PriceFields {
    fn merge(&mut self, other: PriceFields) {
        let PriceFields {
            amount,
            per_day,
            per_week,
            per_month,
            security_deposit,
            delivery_charges,
        } = other;
        self.amount = amount.or(self.amount);
        self.per_day = per_day.or(self.per_day);
        self.per_week = per_week.or(self.per_week);
        self.per_month = per_month.or(self.per_month);
        self.security_deposit = security_deposit.or(self.security_deposit);
        self.delivery_charges = delivery_charges.or(self.delivery_charges);
    }

    fn is_empty(&self) -> bool {
        *self == PriceFields::default()
    }

    /// Check the price shape against the listing type and drop the fields
    /// that do not belong to it.
    pub fn normalize(&self, listing_type: ListingType, delivery_available: bool) -> AppResult<Price> {
        let all = [
            self.amount,
            self.per_day,
            self.per_week,
            self.per_month,
            self.security_deposit,
            self.delivery_charges,
        ];
        if all.iter().flatten().any(|v| *v < 0) {
            return Err(AppError::bad_request("Prices must not be negative"));
        }

        let delivery_charges = if delivery_available {
            self.delivery_charges.unwrap_or(0)
        } else {
            0
        };

        match listing_type {
            ListingType::Sale => {
                let amount = self
                    .amount
                    .ok_or_else(|| AppError::bad_request("Price is required for sale listings"))?;
                Ok(Price {
                    amount: Some(amount),
                    delivery_charges,
                    ..Price::default()
                })
            }
            ListingType::Rental => match (
                self.per_day,
                self.per_week,
                self.per_month,
                self.security_deposit,
            ) {
                (Some(per_day), Some(per_week), Some(per_month), Some(deposit)) => Ok(Price {
                    amount: None,
                    per_day: Some(per_day),
                    per_week: Some(per_week),
                    per_month: Some(per_month),
                    security_deposit: Some(deposit),
                    delivery_charges,
                }),
                _ => Err(AppError::bad_request(
                    "Rental listings require pricePerDay, pricePerWeek, pricePerMonth and securityDeposit",
                )),
            },
        }
    }
}

impl From<&Price> for PriceFields {
    fn from(price: &Price) -> Self {
        Self {
            amount: price.amount,
            per_day: price.per_day,
            per_week: price.per_week,
            per_month: price.per_month,
            security_deposit: price.security_deposit,
            delivery_charges: Some(price.delivery_charges),
        }
    }
}

/// Validated payload for a new listing.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub listing_type: ListingType,
    pub price: Price,
    pub category: String,
    pub condition: ListingCondition,
    pub location: String,
    pub delivery_available: bool,
    pub contact_info: String,
}

impl NewListing {
    pub fn from_fields(fields: &HashMap<String, String>) -> AppResult<Self> {
        let listing_type: ListingType = required(fields, "type")?.parse()?;
        let condition: ListingCondition = required(fields, "condition")?.parse()?;
        let delivery_available = match fields.get("deliveryAvailable") {
            Some(raw) => parse_bool("deliveryAvailable", raw)?,
            None => false,
        };
        let price = price_fields(fields)?.normalize(listing_type, delivery_available)?;

        Ok(Self {
            title: required(fields, "title")?,
            description: required(fields, "description")?,
            listing_type,
            price,
            category: required(fields, "category")?,
            condition,
            location: required(fields, "location")?,
            delivery_available,
            contact_info: required(fields, "contactInfo")?,
        })
    }

    /// Multipart text parts understood by [`NewListing::from_fields`].
    pub fn to_form_fields(&self) -> Vec<(&'static str, String)> {
        let mut out = vec![
            ("title", self.title.clone()),
            ("description", self.description.clone()),
            ("type", self.listing_type.to_string()),
            ("category", self.category.clone()),
            ("condition", self.condition.to_string()),
            ("location", self.location.clone()),
            ("deliveryAvailable", self.delivery_available.to_string()),
            ("contactInfo", self.contact_info.clone()),
            ("deliveryCharges", self.price.delivery_charges.to_string()),
        ];
        let optional = [
            ("price", self.price.amount),
            ("pricePerDay", self.price.per_day),
            ("pricePerWeek", self.price.per_week),
            ("pricePerMonth", self.price.per_month),
            ("securityDeposit", self.price.security_deposit),
        ];
        out.extend(
            optional
                .into_iter()
                .filter_map(|(key, value)| value.map(|v| (key, v.to_string()))),
        );
        out
    }
}

/// Allow-listed changes a seller may apply to a listing. Fields absent from
/// the submission stay `None` and leave the listing untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub listing_type: Option<ListingType>,
    pub price: PriceFields,
    pub category: Option<String>,
    pub condition: Option<ListingCondition>,
    pub location: Option<String>,
    pub delivery_available: Option<bool>,
    pub contact_info: Option<String>,
    pub status: Option<ListingStatus>,
}

impl ListingChanges {
    pub fn from_fields(fields: &HashMap<String, String>) -> AppResult<Self> {
        Ok(Self {
            title: non_blank(fields, "title")?,
            description: non_blank(fields, "description")?,
            listing_type: fields.get("type").map(|s| s.trim().parse()).transpose()?,
            price: price_fields(fields)?,
            category: non_blank(fields, "category")?,
            condition: fields.get("condition").map(|s| s.parse()).transpose()?,
            location: non_blank(fields, "location")?,
            delivery_available: fields
                .get("deliveryAvailable")
                .map(|raw| parse_bool("deliveryAvailable", raw))
                .transpose()?,
            contact_info: non_blank(fields, "contactInfo")?,
            status: fields.get("status").map(|s| s.trim().parse()).transpose()?,
        })
    }
}

/// Editable state of a stored listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub listing_type: ListingType,
    pub price: PriceFields,
    pub category: String,
    pub condition: ListingCondition,
    pub location: String,
    pub delivery_available: bool,
    pub contact_info: String,
    pub status: ListingStatus,
}

impl ListingDraft {
    pub fn apply(&mut self, changes: ListingChanges) -> AppResult<()> {
        let rented = self.status == ListingStatus::Rented;

        if let Some(status) = changes.status {
            if status != self.status {
                if rented {
                    return Err(AppError::bad_request(
                        "Status cannot change while the listing is rented",
                    ));
                }
                if !status.is_owner_settable() {
                    return Err(AppError::bad_request(format!(
                        "Status cannot be set to {status}"
                    )));
                }
                self.status = status;
            }
        }
        if let Some(listing_type) = changes.listing_type {
            if rented && listing_type != self.listing_type {
                return Err(AppError::bad_request(
                    "Type cannot change while the listing is rented",
                ));
            }
            self.listing_type = listing_type;
        }
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(category) = changes.category {
            self.category = category;
        }
        if let Some(condition) = changes.condition {
            self.condition = condition;
        }
        if let Some(location) = changes.location {
            self.location = location;
        }
        if let Some(delivery_available) = changes.delivery_available {
            self.delivery_available = delivery_available;
        }
        if let Some(contact_info) = changes.contact_info {
            self.contact_info = contact_info;
        }
        if !changes.price.is_empty() {
            self.price.merge(changes.price);
        }
        Ok(())
    }

    pub fn validated_price(&self) -> AppResult<Price> {
        self.price
            .normalize(self.listing_type, self.delivery_available)
    }
}

fn required(fields: &HashMap<String, String>, key: &str) -> AppResult<String> {
    non_blank(fields, key)?.ok_or_else(|| AppError::bad_request(format!("{key} is required")))
}

fn non_blank(fields: &HashMap<String, String>, key: &str) -> AppResult<Option<String>> {
    match fields.get(key).map(|v| v.trim()) {
        None => Ok(None),
        Some("") => Err(AppError::bad_request(format!("{key} cannot be empty"))),
        Some(v) => Ok(Some(v.to_string())),
    }
}

fn parse_bool(key: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        _ => Err(AppError::bad_request(format!("{key} must be a boolean"))),
    }
}

fn parse_amount(key: &str, raw: &str) -> AppResult<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Ok(v);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v.round() as i64),
        _ => Err(AppError::bad_request(format!("{key} must be a number"))),
    }
}

fn optional_amount(fields: &HashMap<String, String>, key: &str) -> AppResult<Option<i64>> {
    match fields.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(None),
        Some(raw) => parse_amount(key, raw).map(Some),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceObject {
    amount: Option<i64>,
    per_day: Option<i64>,
    per_week: Option<i64>,
    per_month: Option<i64>,
    security_deposit: Option<i64>,
    delivery_charges: Option<i64>,
}

/// Collect price parts from the flat form keys, plus a `price` part that is
/// either a plain sale amount or a JSON price object.
fn price_fields(fields: &HashMap<String, String>) -> AppResult<PriceFields> {
    let mut price = PriceFields {
        amount: optional_amount(fields, "amount")?,
        per_day: optional_amount(fields, "pricePerDay")?,
        per_week: optional_amount(fields, "pricePerWeek")?,
        per_month: optional_amount(fields, "pricePerMonth")?,
        security_deposit: optional_amount(fields, "securityDeposit")?,
        delivery_charges: optional_amount(fields, "deliveryCharges")?,
    };

    if let Some(raw) = fields.get("price").map(|v| v.trim()).filter(|v| !v.is_empty()) {
        if raw.starts_with('{') {
            let object: PriceObject = serde_json::from_str(raw)
                .map_err(|_| AppError::bad_request("price must be a valid price object"))?;
            price.merge(PriceFields {
                amount: object.amount,
                per_day: object.per_day,
                per_week: object.per_week,
                per_month: object.per_month,
                security_deposit: object.security_deposit,
                delivery_charges: object.delivery_charges,
            });
        } else {
            price.amount = Some(parse_amount("price", raw)?);
        }
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn sale_fields() -> HashMap<String, String> {
        fields(&[
            ("title", " Road bike "),
            ("description", "Aluminium frame"),
            ("type", "sale"),
            ("price", "15000"),
            ("category", "Sports"),
            ("condition", "like-new"),
            ("location", "Pune"),
            ("contactInfo", "rider@example.com"),
        ])
    }

    fn draft() -> ListingDraft {
        ListingDraft {
            title: "Tent".into(),
            description: "Four person tent".into(),
            listing_type: ListingType::Rental,
            price: PriceFields {
                per_day: Some(100),
                per_week: Some(600),
                per_month: Some(2000),
                security_deposit: Some(500),
                delivery_charges: Some(0),
                ..PriceFields::default()
            },
            category: "Outdoors".into(),
            condition: ListingCondition::Good,
            location: "Austin".into(),
            delivery_available: false,
            contact_info: "sam@example.com".into(),
            status: ListingStatus::Available,
        }
    }

    #[test]
    fn sale_listing_parses_and_trims() {
        let listing = NewListing::from_fields(&sale_fields()).unwrap();
        assert_eq!(listing.title, "Road bike");
        assert_eq!(listing.listing_type, ListingType::Sale);
        assert_eq!(listing.price.amount, Some(15000));
        assert_eq!(listing.price.per_day, None);
        assert!(!listing.delivery_available);
    }

    #[test]
    fn sale_listing_without_price_is_rejected() {
        let mut f = sale_fields();
        f.remove("price");
        let err = NewListing::from_fields(&f).unwrap_err();
        assert_eq!(err.to_string(), "Price is required for sale listings");
    }

    #[test]
    fn rental_listing_requires_every_tier() {
        let mut f = sale_fields();
        f.insert("type".into(), "rental".into());
        f.insert("pricePerDay".into(), "100".into());
        f.insert("pricePerWeek".into(), "600".into());
        assert!(NewListing::from_fields(&f).is_err());

        f.insert("pricePerMonth".into(), "2000".into());
        f.insert("securityDeposit".into(), "500".into());
        f.insert("deliveryAvailable".into(), "true".into());
        f.insert("deliveryCharges".into(), "50.4".into());
        let listing = NewListing::from_fields(&f).unwrap();
        assert_eq!(listing.price.amount, None);
        assert_eq!(listing.price.per_month, Some(2000));
        assert_eq!(listing.price.delivery_charges, 50);
    }

    #[test]
    fn delivery_charges_are_zero_without_delivery() {
        let mut f = sale_fields();
        f.insert("deliveryCharges".into(), "300".into());
        let listing = NewListing::from_fields(&f).unwrap();
        assert_eq!(listing.price.delivery_charges, 0);
    }

    #[test]
    fn negative_prices_are_rejected() {
        let mut f = sale_fields();
        f.insert("price".into(), "-1".into());
        assert!(NewListing::from_fields(&f).is_err());
    }

    #[test]
    fn form_fields_round_trip_through_parser() {
        let listing = NewListing::from_fields(&sale_fields()).unwrap();
        let encoded: HashMap<String, String> = listing
            .to_form_fields()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        assert_eq!(NewListing::from_fields(&encoded).unwrap(), listing);
    }

    #[test]
    fn changes_ignore_unknown_fields() {
        let changes = ListingChanges::from_fields(&fields(&[
            ("title", "Bigger tent"),
            ("sellerId", "00000000-0000-0000-0000-000000000000"),
            ("renterId", "whatever"),
        ]))
        .unwrap();
        assert_eq!(changes.title.as_deref(), Some("Bigger tent"));
        assert_eq!(
            changes,
            ListingChanges {
                title: Some("Bigger tent".into()),
                ..ListingChanges::default()
            }
        );
    }

    #[test]
    fn json_price_object_merges_into_existing_tiers() {
        let changes =
            ListingChanges::from_fields(&fields(&[("price", r#"{"perDay": 150}"#)])).unwrap();
        let mut d = draft();
        d.apply(changes).unwrap();
        let price = d.validated_price().unwrap();
        assert_eq!(price.per_day, Some(150));
        assert_eq!(price.per_week, Some(600));
    }

    #[test]
    fn switching_to_sale_requires_amount() {
        let mut d = draft();
        d.apply(ListingChanges {
            listing_type: Some(ListingType::Sale),
            ..ListingChanges::default()
        })
        .unwrap();
        assert!(d.validated_price().is_err());

        d.apply(ListingChanges {
            price: PriceFields {
                amount: Some(9000),
                ..PriceFields::default()
            },
            ..ListingChanges::default()
        })
        .unwrap();
        assert_eq!(d.validated_price().unwrap().amount, Some(9000));
    }

    #[test]
    fn rental_statuses_cannot_be_set_directly() {
        let mut d = draft();
        let err = d
            .apply(ListingChanges {
                status: Some(ListingStatus::Rented),
                ..ListingChanges::default()
            })
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        d.apply(ListingChanges {
            status: Some(ListingStatus::Inactive),
            ..ListingChanges::default()
        })
        .unwrap();
        assert_eq!(d.status, ListingStatus::Inactive);
    }

    #[test]
    fn rented_listing_keeps_status_and_type() {
        let mut d = draft();
        d.status = ListingStatus::Rented;
        assert!(
            d.apply(ListingChanges {
                status: Some(ListingStatus::Sold),
                ..ListingChanges::default()
            })
            .is_err()
        );
        assert!(
            d.apply(ListingChanges {
                listing_type: Some(ListingType::Sale),
                ..ListingChanges::default()
            })
            .is_err()
        );
    }

    #[test]
    fn blank_required_update_field_is_rejected() {
        assert!(ListingChanges::from_fields(&fields(&[("title", "  ")])).is_err());
    }

    #[test]
    fn image_limits_are_enforced() {
        let png = |n: usize| ImageUpload {
            filename: format!("{n}.png"),
            content_type: "image/png".into(),
            bytes: vec![0; 16],
        };
        assert!(validate_images(&(0..8).map(png).collect::<Vec<_>>()).is_ok());
        assert!(validate_images(&(0..9).map(png).collect::<Vec<_>>()).is_err());

        let pdf = ImageUpload {
            filename: "doc.pdf".into(),
            content_type: "application/pdf".into(),
            bytes: vec![0; 16],
        };
        assert!(validate_images(&[pdf]).is_err());

        let huge = ImageUpload {
            bytes: vec![0; MAX_IMAGE_BYTES + 1],
            ..png(0)
        };
        assert!(validate_images(&[huge]).is_err());
    }
}
