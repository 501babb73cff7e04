use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "listings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    pub listing_type: String,
    pub price_amount: Option<i64>,
    pub price_per_day: Option<i64>,
    pub price_per_week: Option<i64>,
    pub price_per_month: Option<i64>,
    pub security_deposit: Option<i64>,
    pub delivery_charges: i64,
    pub category: String,
    pub condition: String,
    pub status: String,
    pub location: String,
    pub delivery_available: bool,
    pub contact_info: String,
    pub renter_id: Option<Uuid>,
    pub rental_start_date: Option<DateTimeWithTimeZone>,
    pub rental_end_date: Option<DateTimeWithTimeZone>,
    pub rental_quantity: Option<i32>,
    pub rental_total_amount: Option<i64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::SellerId",
        to = "super::users::Column::Id"
    )]
    Seller,
    #[sea_orm(has_many = "super::listing_images::Entity")]
    ListingImages,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl Related<super::listing_images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ListingImages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
