use sea_orm::entity::prelude::*;
use serde_json::Value;

/// Site-wide settings; the table holds at most one row with id 1.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub site_name: String,
    pub site_description: String,
    pub maintenance_mode: bool,
    pub allow_registration: bool,
    pub email_notifications: bool,
    pub theme: String,
    pub contact_email: String,
    pub social_links: Value,
    pub analytics: Value,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
