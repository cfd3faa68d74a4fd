//! Request parameter extraction.
//!
//! # Responsibilities
//! - Define the query-string shapes of the data routes
//! - Convert them into upstream query types, rejecting bad values early
//!
//! # Design Decisions
//! - Numeric parsing is left to serde; semantic checks (ranges, sort
//!   order) happen in the upstream request builder so there is one source
//!   of truth for the limits

use serde::Deserialize;

use crate::upstream::error::{ProxyError, ProxyResult};
use crate::upstream::types::{SortOrder, TransferQuery};

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Default, Deserialize)]
pub struct TransfersParams {
    pub address: Option<String>,
    pub contract: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
}

impl TransfersParams {
    pub fn into_query(self) -> ProxyResult<TransferQuery> {
        let defaults = TransferQuery::default();
        let sort = match self.sort.as_deref() {
            Some(raw) => raw.parse::<SortOrder>().map_err(ProxyError::validation)?,
            None => defaults.sort,
        };
        Ok(TransferQuery {
            address: self.address,
            contract_address: self.contract,
            page: self.page.unwrap_or(defaults.page),
            page_size: self.page_size.unwrap_or(defaults.page_size),
            sort,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HoldersParams {
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let query = TransfersParams::default().into_query().unwrap();
        assert_eq!(query, TransferQuery::default());
    }

    #[test]
    fn test_explicit_values() {
        let query = TransfersParams {
            contract: Some("0xabc".into()),
            page: Some(3),
            page_size: Some(100),
            sort: Some("ASC".into()),
            ..Default::default()
        }
        .into_query()
        .unwrap();
        assert_eq!(query.contract_address.as_deref(), Some("0xabc"));
        assert_eq!(query.page, 3);
        assert_eq!(query.page_size, 100);
        assert_eq!(query.sort, SortOrder::Asc);
    }

    #[test]
    fn test_bad_sort() {
        let err = TransfersParams {
            sort: Some("sideways".into()),
            ..Default::default()
        }
        .into_query()
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
