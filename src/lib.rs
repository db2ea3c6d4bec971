pub mod db;
pub mod handlers;
pub mod model;
pub mod router;
pub mod settings;
pub mod template;
