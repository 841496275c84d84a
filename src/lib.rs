pub mod annotation;
pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod fields;
pub mod filter;
pub mod metaspace;
pub mod molecule;
pub mod output;
pub mod selection;
pub mod staging;
pub mod table;
