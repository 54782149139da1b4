use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Hex characters kept from the full HMAC digest.
const TOKEN_LEN: usize = 32;

/// Keyed-hash tokens for leave records and approver view links.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC takes keys of any length
        HmacSha256::new_from_slice(&self.secret).expect("hmac key")
    }

    fn sign(&self, message: &str) -> String {
        let mut mac = self.mac();
        mac.update(message.as_bytes());
        let mut token = hex::encode(mac.finalize().into_bytes());
        token.truncate(TOKEN_LEN);
        token
    }

    /// Opaque per-leave token, generated once at creation.
    pub fn approval_token(&self, employee_id: u64, created_at: DateTime<Utc>) -> String {
        self.sign(&format!(
            "{}-{}-{}",
            employee_id,
            created_at.timestamp_micros(),
            Uuid::new_v4()
        ))
    }

    /// Token authorizing the "view requests" page of one approver.
    pub fn view_token(&self, approver_id: u64) -> String {
        self.sign(&view_message(approver_id))
    }

    pub fn verify_view_token(&self, approver_id: u64, token: &str) -> bool {
        let Ok(tag) = hex::decode(token.trim()) else {
            return false;
        };
        if tag.len() != TOKEN_LEN / 2 {
            return false;
        }

        let mut mac = self.mac();
        mac.update(view_message(approver_id).as_bytes());
        mac.verify_truncated_left(&tag).is_ok()
    }
}

fn view_message(approver_id: u64) -> String {
    format!("view-requests:{approver_id}")
}
