pub mod banner_routes;
pub mod user_banner_routes;
