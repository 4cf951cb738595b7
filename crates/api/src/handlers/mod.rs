pub mod admin;
pub mod apps;
pub mod auth;
pub mod flows;
pub mod technos;
