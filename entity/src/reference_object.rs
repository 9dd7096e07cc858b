use sea_orm::entity::prelude::*;

/// A known object and its real-world dimensions in centimeters.
///
/// Rows are seeded once and only read afterwards.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "reference_objects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    #[sea_orm(column_type = "Double")]
    pub width_cm: f64,
    #[sea_orm(column_type = "Double")]
    pub height_cm: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
