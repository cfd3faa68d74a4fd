//! Per-operation result schemas and conversion into DTOs.
//!
//! Every schema fails closed: unknown shapes and unparseable numbers are
//! `InvalidResult`, never a default value.

use alloy::primitives::U256;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::upstream::envelope::Payload;
use crate::upstream::error::UpstreamFailure;
use crate::upstream::types::{
    NormalizedHolder, NormalizedLog, NormalizedReceipt, NormalizedTransaction, NormalizedTransfer,
};

type NormalizeResult<T> = Result<T, UpstreamFailure>;

fn decode<T: DeserializeOwned>(value: Value) -> NormalizeResult<T> {
    serde_json::from_value(value).map_err(|e| {
        tracing::debug!(error = %e, "upstream result failed schema validation");
        UpstreamFailure::InvalidResult
    })
}

/// Decimal string → u64. Rejects signs, blanks and overflow.
pub fn decimal_u64(raw: &str) -> NormalizeResult<u64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UpstreamFailure::InvalidResult);
    }
    raw.parse().map_err(|_| UpstreamFailure::InvalidResult)
}

/// Decimal string → canonical decimal string, bounded to 256 bits.
pub fn decimal_u256(raw: &str) -> NormalizeResult<String> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UpstreamFailure::InvalidResult);
    }
    U256::from_str_radix(raw, 10)
        .map(|v| v.to_string())
        .map_err(|_| UpstreamFailure::InvalidResult)
}

fn hex_digits(raw: &str) -> NormalizeResult<&str> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .ok_or(UpstreamFailure::InvalidResult)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(UpstreamFailure::InvalidResult);
    }
    Ok(digits)
}

/// Hex quantity → u64.
pub fn hex_u64(raw: &str) -> NormalizeResult<u64> {
    u64::from_str_radix(hex_digits(raw)?, 16).map_err(|_| UpstreamFailure::InvalidResult)
}

/// Hex quantity → decimal string, bounded to 256 bits.
pub fn hex_to_decimal(raw: &str) -> NormalizeResult<String> {
    U256::from_str_radix(hex_digits(raw)?, 16)
        .map(|v| v.to_string())
        .map_err(|_| UpstreamFailure::InvalidResult)
}

fn hex_data(raw: String) -> NormalizeResult<String> {
    if raw == "0x" || raw == "0X" {
        return Ok(raw);
    }
    hex_digits(&raw)?;
    Ok(raw)
}

/// Empty strings from the upstream mean "absent".
fn present(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

fn list(payload: Payload) -> NormalizeResult<Vec<Value>> {
    match payload {
        Payload::Empty => Ok(Vec::new()),
        Payload::Result(Value::Array(items)) => Ok(items),
        Payload::Result(_) => Err(UpstreamFailure::InvalidResult),
    }
}

fn object(payload: Payload) -> NormalizeResult<Value> {
    match payload {
        Payload::Result(value) => Ok(value),
        Payload::Empty => Err(UpstreamFailure::InvalidResult),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransfer {
    hash: String,
    block_number: String,
    time_stamp: String,
    from: String,
    to: String,
    contract_address: String,
    value: String,
    #[serde(default)]
    token_symbol: Option<String>,
    #[serde(default)]
    token_name: Option<String>,
    #[serde(default)]
    token_decimal: Option<String>,
}

impl RawTransfer {
    fn normalize(self) -> NormalizeResult<NormalizedTransfer> {
        let token_decimals = match present(self.token_decimal) {
            Some(d) => Some(
                u32::try_from(decimal_u64(&d)?).map_err(|_| UpstreamFailure::InvalidResult)?,
            ),
            None => None,
        };
        Ok(NormalizedTransfer {
            block_number: decimal_u64(&self.block_number)?,
            timestamp: decimal_u64(&self.time_stamp)?,
            value_raw: decimal_u256(&self.value)?,
            hash: self.hash,
            from: self.from,
            to: self.to,
            contract_address: self.contract_address,
            token_symbol: present(self.token_symbol),
            token_name: present(self.token_name),
            token_decimals,
        })
    }
}

pub fn transfers(payload: Payload) -> NormalizeResult<Vec<NormalizedTransfer>> {
    list(payload)?
        .into_iter()
        .map(|item| decode::<RawTransfer>(item)?.normalize())
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawHolder {
    #[serde(rename = "TokenHolderAddress")]
    address: String,
    #[serde(rename = "TokenHolderQuantity")]
    quantity: String,
    #[serde(rename = "TokenHolderPercentage", alias = "percentage", default)]
    percentage: Option<Value>,
}

impl RawHolder {
    fn normalize(self) -> NormalizeResult<NormalizedHolder> {
        let percent = match self.percentage {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => Some(n.as_f64().ok_or(UpstreamFailure::InvalidResult)?),
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(Value::String(s)) => Some(
                s.trim()
                    .trim_end_matches('%')
                    .parse::<f64>()
                    .map_err(|_| UpstreamFailure::InvalidResult)?,
            ),
            Some(_) => return Err(UpstreamFailure::InvalidResult),
        };
        Ok(NormalizedHolder {
            balance_raw: decimal_u256(&self.quantity)?,
            address: self.address,
            percent,
        })
    }
}

/// Holders keep upstream order; rank is position.
pub fn holders(payload: Payload) -> NormalizeResult<Vec<NormalizedHolder>> {
    list(payload)?
        .into_iter()
        .map(|item| decode::<RawHolder>(item)?.normalize())
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    hash: String,
    block_number: Option<String>,
    from: String,
    to: Option<String>,
    value: String,
    input: String,
}

/// Transaction body without status or receipt; the client fills those.
pub fn transaction(payload: Payload) -> NormalizeResult<NormalizedTransaction> {
    let value = object(payload)?;
    if value.is_null() {
        return Err(UpstreamFailure::NotFound);
    }
    let raw: RawTransaction = decode(value)?;
    let block_number = match raw.block_number {
        Some(b) => Some(hex_u64(&b)?),
        None => None,
    };
    Ok(NormalizedTransaction {
        hash: raw.hash,
        block_number,
        from: raw.from,
        to: raw.to,
        value_wei: hex_to_decimal(&raw.value)?,
        input: hex_data(raw.input)?,
        status: None,
        receipt: None,
    })
}

#[derive(Debug, Deserialize)]
struct RawLog {
    address: String,
    topics: Vec<String>,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    #[serde(default)]
    gas_used: Option<String>,
    #[serde(default)]
    effective_gas_price: Option<String>,
    #[serde(default)]
    logs: Option<Vec<RawLog>>,
}

/// `None` when the upstream has no receipt yet.
pub fn receipt(payload: Payload) -> NormalizeResult<Option<NormalizedReceipt>> {
    let value = object(payload)?;
    if value.is_null() {
        return Ok(None);
    }
    let raw: RawReceipt = decode(value)?;
    let logs = match raw.logs {
        Some(logs) => Some(
            logs.into_iter()
                .map(|log| {
                    Ok(NormalizedLog {
                        address: log.address,
                        topics: log.topics,
                        data: hex_data(log.data)?,
                    })
                })
                .collect::<NormalizeResult<Vec<_>>>()?,
        ),
        None => None,
    };
    Ok(Some(NormalizedReceipt {
        gas_used: raw.gas_used.as_deref().map(hex_to_decimal).transpose()?,
        effective_gas_price: raw
            .effective_gas_price
            .as_deref()
            .map(hex_to_decimal)
            .transpose()?,
        logs,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawExecutionStatus {
    is_error: String,
    #[allow(dead_code)]
    #[serde(default)]
    err_description: Option<String>,
}

/// True when the execution-status call reports no error.
pub fn execution_ok(payload: Payload) -> NormalizeResult<bool> {
    let raw: RawExecutionStatus = decode(object(payload)?)?;
    match raw.is_error.as_str() {
        "0" => Ok(true),
        "1" => Ok(false),
        _ => Err(UpstreamFailure::InvalidResult),
    }
}

pub fn token_supply(payload: Payload) -> NormalizeResult<String> {
    match object(payload)? {
        Value::String(s) => decimal_u256(&s),
        _ => Err(UpstreamFailure::InvalidResult),
    }
}
