use std::fmt;

/// Shared secret every upload request must present.
#[derive(Clone)]
pub struct UploadKey(String);

impl UploadKey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// `true` if `presented` equals the configured secret.
    ///
    /// An empty configured secret never matches. The comparison time does
    /// not depend on where the first differing byte is.
    pub fn verify(&self, presented: Option<&str>) -> bool {
        match presented {
            Some(p) if !self.0.is_empty() => constant_time_eq(self.0.as_bytes(), p.as_bytes()),
            _ => false,
        }
    }
}

impl fmt::Debug for UploadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UploadKey(<redacted>)")
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
