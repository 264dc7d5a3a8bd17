use pbkdf2::pbkdf2_hmac;
use rand::Rng;
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;

/// PBKDF2 parameters for new credentials. Stored alongside the hash so that
/// verification keeps working if these constants ever change.
pub const PASS_ITERATIONS: u32 = 200_000;
pub const PASS_KEY_LEN: usize = 32;
pub const PASS_DIGEST: &str = "sha256";

/// Salt + hash + parameters needed to verify a passcode without storing it.
#[derive(Debug, Clone)]
pub struct Credential {
    pub salt: String, // 32 hex chars (16 random bytes)
    pub hash: String, // hex-encoded derived key
    pub iterations: u32,
    pub digest: &'static str,
}

#[derive(Debug)]
pub enum HashError {
    UnsupportedDigest(String),
    TaskFailed(String),
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashError::UnsupportedDigest(d) => write!(f, "unsupported digest: {d}"),
            HashError::TaskFailed(msg) => write!(f, "hash task failed: {msg}"),
        }
    }
}

fn derive_hex(passcode: &str, salt: &str, iterations: u32) -> String {
    let mut key = [0u8; PASS_KEY_LEN];
    pbkdf2_hmac::<Sha256>(passcode.as_bytes(), salt.as_bytes(), iterations, &mut key);
    hex::encode(key)
}

/// Derive a fresh credential for a new passcode: 16 random salt bytes,
/// PBKDF2-HMAC-SHA256 with the current parameters.
pub fn derive_credential(passcode: &str) -> Credential {
    let salt_bytes: [u8; 16] = rand::thread_rng().gen();
    let salt = hex::encode(salt_bytes);
    let hash = derive_hex(passcode, &salt, PASS_ITERATIONS);

    Credential {
        salt,
        hash,
        iterations: PASS_ITERATIONS,
        digest: PASS_DIGEST,
    }
}

/// Verify a supplied passcode against a stored credential, recomputing with
/// the parameters recorded at creation time. Comparison is constant-time.
pub fn verify_passcode(
    passcode: &str,
    salt: &str,
    iterations: u32,
    digest: &str,
    expected_hash: &str,
) -> Result<bool, HashError> {
    if digest != PASS_DIGEST {
        return Err(HashError::UnsupportedDigest(digest.to_string()));
    }

    let computed = derive_hex(passcode, salt, iterations);
    Ok(computed.as_bytes().ct_eq(expected_hash.as_bytes()).into())
}

/// Run `derive_credential` on the blocking pool. 200k PBKDF2 iterations take
/// long enough to stall the async executor otherwise.
pub async fn derive_credential_blocking(passcode: String) -> Result<Credential, HashError> {
    tokio::task::spawn_blocking(move || derive_credential(&passcode))
        .await
        .map_err(|e| HashError::TaskFailed(e.to_string()))
}

/// Run `verify_passcode` on the blocking pool.
pub async fn verify_passcode_blocking(
    passcode: String,
    salt: String,
    iterations: u32,
    digest: String,
    expected_hash: String,
) -> Result<bool, HashError> {
    tokio::task::spawn_blocking(move || {
        verify_passcode(&passcode, &salt, iterations, &digest, &expected_hash)
    })
    .await
    .map_err(|e| HashError::TaskFailed(e.to_string()))?
}
