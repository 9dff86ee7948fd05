#[cfg(feature = "server")]
pub mod config;

#[cfg(feature = "server")]
pub mod state;

pub mod api;

#[cfg(feature = "server")]
pub mod backend;

#[cfg(feature = "server")]
pub mod roles;

#[cfg(feature = "server")]
pub mod redirect;

#[cfg(feature = "server")]
pub mod auth;

#[cfg(feature = "server")]
pub mod rest;

#[cfg(feature = "server")]
pub mod openapi;

#[cfg(feature = "server")]
pub mod error_convert;

#[cfg(feature = "server")]
pub mod telemetry;

#[cfg(feature = "server")]
pub mod health;
