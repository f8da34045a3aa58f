use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "banner")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub feature_id: i32,
    #[sea_orm(unique)]
    pub content_id: i32,
    pub is_active: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::feature::Entity",
        from = "Column::FeatureId",
        to = "super::feature::Column::Id",
        on_delete = "Restrict",
        on_update = "Cascade"
    )]
    Feature,
    #[sea_orm(
        belongs_to = "super::content::Entity",
        from = "Column::ContentId",
        to = "super::content::Column::ContentId",
        on_delete = "Cascade", // Dropping the content drops the banner that shows it
        on_update = "Cascade"
    )]
    Content,
    #[sea_orm(has_many = "super::banner_tag::Entity")]
    BannerTag,
}

impl Related<super::feature::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Feature.def()
    }
}

impl Related<super::content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Content.def()
    }
}

impl Related<super::banner_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BannerTag.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::banner_tag::Relation::Tag.def()
    }
    fn via() -> Option<RelationDef> {
        Some(super::banner_tag::Relation::Banner.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
