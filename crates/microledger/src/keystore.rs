//! PEM-file key provider.
//!
//! The private key lives in a PKCS#8 PEM file. On first run, when no file
//! exists, a new key pair is generated and written there.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zeroize::Zeroizing;

use microledger_core::{
    CoreError, Fingerprint, KeyProvider, PublicKey, SignatureAlgorithm, SigningKeypair,
};

use crate::config::ClientConfig;
use crate::error::{MicroledgerError, Result};

/// Key provider backed by a PKCS#8 PEM file.
///
/// The key is loaded once and held for the provider's lifetime.
pub struct FileKeyProvider {
    path: PathBuf,
    keypair: SigningKeypair,
}

impl FileKeyProvider {
    /// Load or generate the key named by `config.key_path`, using
    /// `config.algorithm`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::load_or_generate(&config.key_path, config.algorithm)
    }

    /// Load the key at `path`, or generate and persist one if none exists.
    pub fn load_or_generate(path: impl AsRef<Path>, algorithm: SignatureAlgorithm) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path, algorithm);
        }

        let keypair = SigningKeypair::generate(algorithm);
        let pem = keypair.to_pkcs8_pem()?;
        write_private(path, pem.as_bytes())?;

        info!(
            path = %path.display(),
            %algorithm,
            public_key = %keypair.public_key().to_hex(),
            "generated signing key"
        );

        Ok(Self {
            path: path.to_path_buf(),
            keypair,
        })
    }

    /// Load an existing key. Fails if the file is missing or holds a key of
    /// another algorithm.
    pub fn load(path: impl AsRef<Path>, algorithm: SignatureAlgorithm) -> Result<Self> {
        let path = path.as_ref();
        let pem = Zeroizing::new(fs::read_to_string(path)?);
        let keypair = SigningKeypair::from_pkcs8_pem(algorithm, &pem).map_err(|e| {
            MicroledgerError::KeyStore(format!(
                "{} does not hold a usable {} key: {}",
                path.display(),
                algorithm,
                e
            ))
        })?;

        debug!(
            path = %path.display(),
            %algorithm,
            public_key = %keypair.public_key().to_hex(),
            "loaded signing key"
        );

        Ok(Self {
            path: path.to_path_buf(),
            keypair,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for FileKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKeyProvider")
            .field("path", &self.path)
            .field("keypair", &self.keypair)
            .finish()
    }
}

impl KeyProvider for FileKeyProvider {
    fn algorithm(&self) -> SignatureAlgorithm {
        self.keypair.algorithm()
    }

    fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    fn sign_fingerprint(&self, fingerprint: &Fingerprint) -> std::result::Result<Vec<u8>, CoreError> {
        self.keypair.sign(fingerprint)
    }
}

/// Create `path` readable only by its owner and write `contents`.
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    Ok(())
}
