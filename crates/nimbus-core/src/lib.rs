//! # nimbus-core
//!
//! Foundation types for the Nimbus pub/sub client.
//!
//! This crate provides the shared vocabulary that the other Nimbus crates
//! depend on:
//!
//! - **Envelopes**: [`envelope::Envelope`] / [`envelope::ErrorEnvelope`], the
//!   structured result of one fired event, plus the closed
//!   [`envelope::StatusCategory`] and [`envelope::Operation`] sets
//! - **Configuration**: [`config::ClientConfig`] with named, typed fields and
//!   a validating constructor
//! - **Channels**: [`channel::ChannelSpec`], the canonical channel specifier
//! - **Query assembly**: ordered, percent-encoded query strings in [`query`]
//! - **Errors**: [`errors::EventError`] hierarchy via `thiserror`

#![deny(unsafe_code)]

pub mod channel;
pub mod config;
pub mod envelope;
pub mod errors;
pub mod query;
