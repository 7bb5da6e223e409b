pub mod auth;
pub mod json;
pub mod post_form;
