//! Request envelopes sent to Tally.
//!
//! Tally accepts `<ENVELOPE>` documents with a `HEADER` that selects the request kind
//! and a `BODY` carrying static variables and data. Every piece of caller-supplied
//! text is escaped before it is placed into the document.

use chrono::NaiveDate;
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Voucher types this service posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherKind {
    /// Settlement paid to the supplier
    Payment,
    /// Claim against the supplier for rejected weight
    DebitNote,
}

impl VoucherKind {
    /// Voucher type name as configured in Tally.
    #[must_use]
    pub const fn tally_name(self) -> &'static str {
        match self {
            Self::Payment => "Payment",
            Self::DebitNote => "Debit Note",
        }
    }
}

/// A two-line voucher: the party ledger is debited and the counter ledger credited.
#[derive(Debug, Clone, PartialEq)]
pub struct Voucher {
    pub kind: VoucherKind,
    pub date: NaiveDate,
    pub number: String,
    pub party_ledger: String,
    pub counter_ledger: String,
    /// Positive amount in rupees
    pub amount: f64,
    pub narration: String,
}

/// Formats a date the way Tally expects it (`YYYYMMDD`).
#[must_use]
pub fn tally_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Collection export listing every company loaded in Tally.
#[must_use]
pub fn company_list_request() -> String {
    concat!(
        "<ENVELOPE>",
        "<HEADER>",
        "<VERSION>1</VERSION>",
        "<TALLYREQUEST>Export</TALLYREQUEST>",
        "<TYPE>Collection</TYPE>",
        "<ID>List of Companies</ID>",
        "</HEADER>",
        "<BODY>",
        "<DESC>",
        "<STATICVARIABLES>",
        "<SVEXPORTFORMAT>$$SysName:XML</SVEXPORTFORMAT>",
        "</STATICVARIABLES>",
        "<TDL>",
        "<TDLMESSAGE>",
        "<COLLECTION NAME=\"List of Companies\" ISMODIFY=\"No\">",
        "<TYPE>Company</TYPE>",
        "<FETCH>NAME, GUID, STARTINGFROM</FETCH>",
        "</COLLECTION>",
        "</TDLMESSAGE>",
        "</TDL>",
        "</DESC>",
        "</BODY>",
        "</ENVELOPE>"
    )
    .to_string()
}

fn write_ledger_entry(xml: &mut String, ledger: &str, debit: bool, amount: f64) {
    let (deemed_positive, signed) = if debit {
        ("Yes", -amount)
    } else {
        ("No", amount)
    };
    let _ = write!(
        xml,
        "<ALLLEDGERENTRIES.LIST>\
         <LEDGERNAME>{}</LEDGERNAME>\
         <ISDEEMEDPOSITIVE>{deemed_positive}</ISDEEMEDPOSITIVE>\
         <AMOUNT>{signed:.2}</AMOUNT>\
         </ALLLEDGERENTRIES.LIST>",
        escape(ledger)
    );
}

fn write_voucher(xml: &mut String, voucher: &Voucher) {
    let type_name = voucher.kind.tally_name();
    let _ = write!(
        xml,
        "<TALLYMESSAGE xmlns:UDF=\"TallyUDF\">\
         <VOUCHER VCHTYPE=\"{type_name}\" ACTION=\"Create\">\
         <DATE>{}</DATE>\
         <VOUCHERTYPENAME>{type_name}</VOUCHERTYPENAME>\
         <VOUCHERNUMBER>{}</VOUCHERNUMBER>\
         <PARTYLEDGERNAME>{}</PARTYLEDGERNAME>\
         <NARRATION>{}</NARRATION>",
        tally_date(voucher.date),
        escape(voucher.number.as_str()),
        escape(voucher.party_ledger.as_str()),
        escape(voucher.narration.as_str()),
    );
    write_ledger_entry(xml, &voucher.party_ledger, true, voucher.amount);
    write_ledger_entry(xml, &voucher.counter_ledger, false, voucher.amount);
    xml.push_str("</VOUCHER></TALLYMESSAGE>");
}

/// Data import creating the given vouchers, optionally in a named company.
#[must_use]
pub fn voucher_import_request(company: Option<&str>, vouchers: &[Voucher]) -> String {
    let mut xml = String::from(
        "<ENVELOPE>\
         <HEADER>\
         <VERSION>1</VERSION>\
         <TALLYREQUEST>Import</TALLYREQUEST>\
         <TYPE>Data</TYPE>\
         <ID>Vouchers</ID>\
         </HEADER>\
         <BODY><DESC>",
    );
    if let Some(company) = company.filter(|c| !c.trim().is_empty()) {
        let _ = write!(
            xml,
            "<STATICVARIABLES><SVCURRENTCOMPANY>{}</SVCURRENTCOMPANY></STATICVARIABLES>",
            escape(company)
        );
    }
    xml.push_str("</DESC><DATA>");
    for voucher in vouchers {
        write_voucher(&mut xml, voucher);
    }
    xml.push_str("</DATA></BODY></ENVELOPE>");
    xml
}
