use serde::{Deserialize, Serialize};
use crate::{CoreError, CoreResult};

/// A buyer whose token has already been verified upstream.
///
/// The id is opaque (the token subject); the email is only used to address
/// confirmations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerIdentity {
    pub buyer_id: String,
    pub email: Option<String>,
}

impl BuyerIdentity {
    pub fn new(buyer_id: impl Into<String>, email: Option<String>) -> CoreResult<Self> {
        let buyer_id = buyer_id.into().trim().to_string();
        if buyer_id.is_empty() {
            return Err(CoreError::IdentityError("missing buyer id".to_string()));
        }

        let email = email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        if let Some(address) = &email {
            if !address.contains('@') {
                return Err(CoreError::IdentityError(format!("malformed email for buyer {}", buyer_id)));
            }
        }

        Ok(Self { buyer_id, email })
    }
}
