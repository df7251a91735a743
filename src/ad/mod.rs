pub mod ad_dto;
pub mod ad_handlers;
pub mod ad_models;
pub mod ad_query;
pub mod ad_repository;
pub mod ad_service;
pub mod image_set;
