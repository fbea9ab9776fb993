//! AWS API binding
//!
//! The scanner never talks to AWS directly. It goes through [`CloudApi`],
//! which takes a service name, an operation name and JSON request parameters
//! and returns the JSON response body.
//!
//! # Module Structure
//!
//! - [`client`] - the [`CloudApi`] trait and account helpers
//! - [`replay`] - canned responses, in memory or recorded on disk
//!
//! # Example
//!
//! ```ignore
//! use awsweep::aws::{CloudApi, StaticApi};
//! use serde_json::json;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let api = StaticApi::new().respond("ec2", "DescribeVpcs", json!({"Vpcs": []}));
//!     let vpcs = api.invoke("ec2", "DescribeVpcs", &json!({})).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod replay;

pub use client::{account_id, CloudApi};
pub use replay::StaticApi;
