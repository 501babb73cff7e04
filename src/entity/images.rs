use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "images")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Base64 payload.
    pub data: String,
    pub content_type: String,
    pub filename: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::listing_images::Entity")]
    ListingImages,
}

impl Related<super::listing_images::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ListingImages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
