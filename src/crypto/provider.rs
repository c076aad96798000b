//! Source of randomness for salts, IVs and local key ids.

use rand_core::{OsRng, RngCore};

use crate::error::{PfxError, Result};

/// Supplies the random bytes used when building archives.
///
/// The default is [`OsRandom`]. Substituting a fixed-output provider makes
/// [`crate::codec::build_with`] deterministic.
pub trait CryptoProvider {
    fn fill_random(&self, buf: &mut [u8]) -> Result<()>;

    fn random_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.fill_random(&mut buf)?;
        Ok(buf)
    }
}

/// The operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl CryptoProvider for OsRandom {
    fn fill_random(&self, buf: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| PfxError::Random(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicU8, Ordering};

    use super::*;

    /// Emits 0, 1, 2, ... across calls.
    #[derive(Default)]
    pub(crate) struct CountingRandom {
        next: AtomicU8,
    }

    impl CryptoProvider for CountingRandom {
        fn fill_random(&self, buf: &mut [u8]) -> Result<()> {
            for byte in buf {
                *byte = self.next.fetch_add(1, Ordering::Relaxed);
            }
            Ok(())
        }
    }

    #[test]
    fn test_os_random_fills() {
        let a = OsRandom.random_bytes(32).unwrap();
        let b = OsRandom.random_bytes(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_counting_random() {
        let provider = CountingRandom::default();
        assert_eq!(provider.random_bytes(3).unwrap(), vec![0, 1, 2]);
        assert_eq!(provider.random_bytes(2).unwrap(), vec![3, 4]);
    }
}
