//! Course enrollment service.
//!
//! Students browse a course catalog, view a weekly calendar and enroll in or
//! drop courses. Identity and persistence live in a hosted backend reached
//! through [`supabase`]; this crate keeps the per-session view state, the
//! enroll/drop workflow and the calendar layout, and serves them over HTTP.

pub mod api;
pub mod calendar;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod schedule;
pub mod services;
pub mod state;
pub mod supabase;
pub mod time_utils;
