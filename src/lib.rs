//! # DuckDB Price List Extension
//!
//! A DuckDB extension that turns semi-structured Ukrainian wholesale/retail price lists
//! into flat, typed records directly in SQL queries.
//!
//! A price-list sheet is a sequence of blocks. Each block starts with a model marker
//! (`Модель: "X"`), has its own header row naming the size and price columns, and is
//! followed by one row per size. Column meanings are inferred from fuzzy header labels,
//! so blocks of the same sheet may lay their columns out differently.
//!
//! ## Features
//!
//! - **Formats**: Excel 2007+ (`.xlsx`, `.xlsm`, `.xlam`) and OpenDocument (`.ods`), from local
//!   paths, local globs or remote URLs
//! - **Label tables**: built-in Ukrainian header variants, extensible per query
//! - **Promo fallback**: percentage promo columns without a value fall back to a share
//!   of the base price
//!
//! ## Table Functions
//!
//! - `read_price_list`: one row per size with the model, the size and four prices
extern crate duckdb;
extern crate duckdb_loadable_macros;
extern crate libduckdb_sys;

mod bridge;
mod error;
mod extension;
mod helpers;
mod pricelist;
mod spreadsheet;

use crate::extension::read_price_list::ReadPriceListTableFunction;
use anyhow::Context;
use anyhow::Result;
use duckdb::Connection;
use duckdb_loadable_macros::duckdb_entrypoint_c_api;
use libduckdb_sys as ffi;

/// Extension entry point for DuckDB.
///
/// # Errors
///
/// Returns an error if the table function fails to register with DuckDB.
#[duckdb_entrypoint_c_api()]
pub unsafe fn extension_entrypoint(connection: Connection) -> Result<()> {
    connection
        .register_table_function::<ReadPriceListTableFunction>("read_price_list")
        .context("Failed to register read_price_list table function")?;
    Ok(())
}
