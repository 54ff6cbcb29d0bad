use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One "component assembled into parent" record. Both ends point at
/// `serialized_parts`; the `(parent_part_id, component_part_id)` pair is unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "part_genealogy")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub parent_part_id: Uuid,
    pub component_part_id: Uuid,
    pub assembly_date: Option<DateTime<Utc>>,
    pub assembly_operator: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::serialized_part::Entity",
        from = "Column::ParentPartId",
        to = "super::serialized_part::Column::Id"
    )]
    Parent,
    #[sea_orm(
        belongs_to = "super::serialized_part::Entity",
        from = "Column::ComponentPartId",
        to = "super::serialized_part::Column::Id"
    )]
    Component,
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if insert {
            if let ActiveValue::NotSet = self.id {
                self.id = ActiveValue::Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = self.created_at {
                self.created_at = ActiveValue::Set(Utc::now());
            }
        }

        Ok(self)
    }
}
