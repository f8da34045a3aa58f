use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema,
    sea_query::{Index, TableCreateStatement},
};
use tracing::info;

use crate::db::entities::{banner, banner_tag, content, feature, tag};

fn create_table<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    statement
}

/// Creates the banner tables if they do not exist yet.
///
/// Referenced tables come first so foreign keys resolve on backends that
/// check them at creation time.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let tables = [
        create_table(&schema, feature::Entity),
        create_table(&schema, tag::Entity),
        create_table(&schema, content::Entity),
        create_table(&schema, banner::Entity),
        create_table(&schema, banner_tag::Entity),
    ];
    for table in &tables {
        db.execute(backend.build(table)).await?;
    }

    let feature_index = Index::create()
        .if_not_exists()
        .name("idx_banner_feature_id")
        .table(banner::Entity)
        .col(banner::Column::FeatureId)
        .to_owned();
    db.execute(backend.build(&feature_index)).await?;

    info!("Banner schema is in place.");
    Ok(())
}
