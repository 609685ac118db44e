//! Hashing utilities for generated file names.

use sha2::{Digest, Sha256};

/// Compute SHA256 hash of a string.
pub fn sha256_str(s: &str) -> String {
    hex::encode(Sha256::digest(s.as_bytes()))
}

/// Builds a stable identifier from several components.
///
/// Used to name generated runner scripts so that different sysroots or
/// emulator versions never share a script.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self.hasher.update(b"\0");
        self
    }

    pub fn update_opt(&mut self, opt: Option<&str>) -> &mut Self {
        match opt {
            Some(s) => {
                self.hasher.update(b"\x01");
                self.update_str(s);
            }
            None => self.hasher.update(b"\x00"),
        }
        self
    }

    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    /// First 16 hex characters of the digest.
    pub fn finish_short(self) -> String {
        self.finish()[..16].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_str() {
        assert_eq!(
            sha256_str("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_fingerprint() {
        let make = |a: &str, b: Option<&str>| {
            let mut fp = Fingerprint::new();
            fp.update_str(a).update_opt(b);
            fp.finish_short()
        };

        assert_eq!(make("qemu-aarch64", Some("/sysroot")), make("qemu-aarch64", Some("/sysroot")));
        assert_ne!(make("qemu-aarch64", Some("/sysroot")), make("qemu-aarch64", None));
        assert_eq!(make("qemu-arm", None).len(), 16);
    }
}
