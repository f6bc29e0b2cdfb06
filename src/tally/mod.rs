//! Tally bridge - XML-over-HTTP integration with the locally running Tally server.
//!
//! Requests are fixed XML envelopes built in [`envelope`], responses are parsed into a
//! generic tree and normalised in [`response`], and [`client`] does the HTTP round trip
//! with a fixed timeout per call.

pub mod client;
pub mod envelope;
pub mod response;

pub use client::TallyClient;
pub use envelope::{Voucher, VoucherKind};
pub use response::{ImportResult, TallyCompany};

use crate::errors::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Result of a running-status check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TallyStatus {
    /// Whether Tally answered with its running banner
    pub running: bool,
    /// Banner text or the reason the check failed
    pub detail: String,
}

/// Ledger names and company used when posting vouchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostingLedgers {
    /// Company to post into; Tally uses the loaded company when `None`
    pub company: Option<String>,
    /// Cash or bank ledger credited by payment vouchers
    pub payment_ledger: String,
    /// Purchase ledger credited by debit notes
    pub purchase_ledger: String,
}

/// Operations the rest of the service needs from Tally.
#[async_trait]
pub trait TallyGateway: Send + Sync {
    /// Checks whether the Tally server is up. Never fails on connectivity problems.
    async fn status(&self) -> TallyStatus;

    /// Lists the companies loaded in Tally.
    async fn companies(&self) -> Result<Vec<TallyCompany>>;

    /// Imports vouchers from a ready-made request envelope.
    async fn import_vouchers(&self, request_xml: String) -> Result<ImportResult>;
}
