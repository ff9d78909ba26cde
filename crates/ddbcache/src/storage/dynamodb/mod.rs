//! DynamoDB item backend.
//!
//! This module provides the DynamoDB implementation of `ItemBackend` using
//! `aws-sdk-dynamodb`.

mod backend;
mod client;
pub mod conversions;
mod error;

pub use backend::DynamoDbBackend;
pub use client::create_client;
