pub mod category_handlers;
pub mod category_models;
pub mod category_repository;
pub mod category_seed;
pub mod category_service;
pub mod category_tree;

pub use category_models::Category;
