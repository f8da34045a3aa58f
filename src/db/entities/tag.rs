use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tag")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::banner_tag::Entity")]
    BannerTag,
}

impl Related<super::banner_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BannerTag.def()
    }
}

impl Related<super::banner::Entity> for Entity {
    fn to() -> RelationDef {
        super::banner_tag::Relation::Banner.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::banner_tag::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
