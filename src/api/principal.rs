//! Principal claims carried as headers by the upstream auth gateway.

use crate::error::{Error, Result};
use crate::identity::{Claims, Principal};
use axum::http::HeaderMap;

pub const HEADER_ID: &str = "x-principal-id";
pub const HEADER_NAME: &str = "x-principal-name";
pub const HEADER_ROLE: &str = "x-principal-role";
pub const HEADER_STATE: &str = "x-principal-state";
pub const HEADER_DISTRICT: &str = "x-principal-district";
pub const HEADER_BLOCK: &str = "x-principal-block";

fn header(headers: &HeaderMap, name: &str) -> Result<Option<String>> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|v| Some(v.to_string()))
            .map_err(|_| Error::InvalidClaims(format!("Header '{}' is not valid text", name))),
    }
}

pub fn principal_from_headers(headers: &HeaderMap) -> Result<Principal> {
    let id = header(headers, HEADER_ID)?
        .ok_or_else(|| Error::InvalidClaims("Missing principal id".to_string()))?;
    let role = header(headers, HEADER_ROLE)?
        .ok_or_else(|| Error::InvalidClaims("Missing principal role".to_string()))?;

    Principal::from_claims(Claims {
        id,
        name: header(headers, HEADER_NAME)?,
        role,
        state: header(headers, HEADER_STATE)?,
        district: header(headers, HEADER_DISTRICT)?,
        block: header(headers, HEADER_BLOCK)?,
    })
}
