use crate::api::ApiError;
use std::collections::HashMap;

pub const WORKER_NAME_CLAIM: &str = "worker_name";
pub const WORKER_ID_CLAIM: &str = "worker_id";

/// The authenticated worker behind an inbound request. Constructed once at
/// the RPC boundary from the request's identity claims and passed explicitly
/// to everything downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    pub name: String,
    pub id: String,
}

impl WorkerIdentity {
    /// A request missing (or blanking) either claim must never reach
    /// storage.
    pub fn from_claims(claims: &HashMap<String, String>) -> Result<Self, ApiError> {
        let name = claims
            .get(WORKER_NAME_CLAIM)
            .filter(|name| !name.is_empty())
            .ok_or(ApiError::Unauthorized)?;
        let id = claims
            .get(WORKER_ID_CLAIM)
            .filter(|id| !id.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        Ok(Self {
            name: name.clone(),
            id: id.clone(),
        })
    }
}
