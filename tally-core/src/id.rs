use curve25519_dalek::edwards::CompressedEdwardsY;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Deref;

// Identity names a protocol participant: a holder, the ledger owner, the
// master actor, or a derived account actor. It is a 32 byte long unique
// identifier, resembling a public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity([u8; 32]);

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format as a hex string with a prefix of the first 6 bytes
        let prefix = hex::encode(&self.0[0..6]);
        write!(f, "id:{}", prefix)
    }
}

impl Ord for Identity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Identity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for Identity {
    fn default() -> Self {
        Identity([0; 32])
    }
}

impl Deref for Identity {
    type Target = [u8; 32];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Identity {
    pub fn new(bytes: [u8; 32]) -> Self {
        Identity(bytes)
    }

    /// Create an Identity from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Identity(bytes)
    }

    /// Get a reference to the internal bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Create a random Identity for testing
    pub fn random() -> Self {
        // Generate a random identity using system time
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
            .to_le_bytes();

        // Use this as a seed to create a unique identity
        let (id, _) = Self::find_identity(&[&now, &[1, 2, 3, 4]]);
        id
    }

    pub fn create_identity(seeds: &[&[u8]], bump: u8) -> [u8; 32] {
        let mut hasher = Sha256::new();

        // Domain separator
        hasher.update(b"TALLY_Identity");

        // Add all seeds
        for seed in seeds {
            hasher.update(seed);
        }

        // Add bump
        hasher.update([bump]);

        hasher.finalize().into()
    }

    /// Verify that a 32-byte array is not a valid point on the ed25519 curve
    ///
    /// Returns true if the bytes do not represent a valid curve point.
    /// Returns false if the bytes do represent a valid curve point.
    pub fn is_off_curve(bytes: &[u8; 32]) -> bool {
        let Ok(compressed_edwards_y) = CompressedEdwardsY::from_slice(bytes.as_ref()) else {
            return true; // Cannot even parse as a point format, so it's off-curve
        };
        compressed_edwards_y.decompress().is_none() // If we can't decompress it, it's off-curve
    }

    /// Try to find an off-curve Identity for given seeds
    pub fn try_find_identity(seeds: &[&[u8]]) -> Option<(Identity, u8)> {
        for bump in 0..255 {
            let id = Identity::create_identity(seeds, bump);
            if Identity::is_off_curve(&id) {
                return Some((Identity(id), bump));
            }
        }
        None
    }

    /// Find an off-curve Identity for given seeds
    pub fn find_identity(seeds: &[&[u8]]) -> (Identity, u8) {
        Identity::try_find_identity(seeds).expect("Failed to find a valid Identity")
    }
}

/// Derive the account actor address for a holder of a given master's token.
///
/// The derivation is deterministic: the same (master, holder) pair always
/// yields the same address, so any actor can compute a peer's address
/// without a registry round-trip. The address is guaranteed off-curve, so
/// it can never collide with a keyed participant identity.
pub fn derive_account_address(master: &Identity, holder: &Identity) -> Identity {
    let (id, _) = Identity::find_identity(&[b"account", master.bytes(), holder.bytes()]);
    id
}

/// Derive the master actor address from the owner identity and token content.
pub fn derive_master_address(owner: &Identity, content: &[u8]) -> Identity {
    let (id, _) = Identity::find_identity(&[b"master", owner.bytes(), content]);
    id
}
