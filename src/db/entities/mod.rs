//! SeaORM entities mapping the banner schema.
//!
//! `banner` owns its `content` row and its `banner_tag` rows; `tag` and
//! `feature` are catalogs referenced by id only.

pub mod banner;
pub mod banner_tag;
pub mod content;
pub mod feature;
pub mod tag;

pub mod prelude {
    pub use super::banner::Entity as Banner;
    pub use super::banner::Model as BannerModel;
    pub use super::banner::ActiveModel as BannerActiveModel;
    pub use super::banner::Column as BannerColumn;

    pub use super::banner_tag::Entity as BannerTag;
    pub use super::banner_tag::Model as BannerTagModel;
    pub use super::banner_tag::ActiveModel as BannerTagActiveModel;
    pub use super::banner_tag::Column as BannerTagColumn;

    pub use super::content::Entity as Content;
    pub use super::content::Model as ContentModel;
    pub use super::content::ActiveModel as ContentActiveModel;
    pub use super::content::Column as ContentColumn;

    pub use super::feature::Entity as Feature;
    pub use super::feature::Model as FeatureModel;

    pub use super::tag::Entity as Tag;
    pub use super::tag::Model as TagModel;
}
