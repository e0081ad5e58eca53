use base64::{Engine, engine::general_purpose};
use hmac::{Hmac, Mac, digest::InvalidLength};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Issues an API token of the form `username:signature`.
pub fn issue_token(secret: &str, username: &str) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(username.as_bytes());
    let signature = mac.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);
    Ok(format!("{}:{}", username, signature_b64))
}

/// Returns the username carried by `token` if its signature checks out.
pub fn verify_token(secret: &str, token: &str) -> Option<String> {
    let (username, signature_b64) = token.rsplit_once(':')?;
    if username.is_empty() {
        return None;
    }

    let signature = general_purpose::URL_SAFE_NO_PAD.decode(signature_b64).ok()?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(username.as_bytes());
    mac.verify_slice(&signature).ok()?;

    Some(username.to_string())
}

/// Random hex string suitable for `app.auth_secret`.
pub fn generate_secret() -> String {
    use rand::{Rng, rng};

    rng()
        .random::<[u8; 32]>()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
