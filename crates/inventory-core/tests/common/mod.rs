#![allow(dead_code)]

use inventory_core::keystore::{KeyEntry, KeyGenSpec, KeyPairInfo, KeyStore, MemoryKeyStore};
use inventory_core::KeystoreError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// How a `TestKeyStore` misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// `load()` fails until `recover()` is called.
    Unavailable,
    /// `generate_key_pair` reports success but stores nothing.
    DropsGeneratedKey,
    /// `generate_key_pair` fails.
    GenerationFails,
    /// `generate_key_pair` leaves a secret entry, not a key pair, under the
    /// alias.
    GeneratesSecret,
}

/// Memory-backed keystore that counts calls and can inject faults.
pub struct TestKeyStore {
    inner: MemoryKeyStore,
    fault: Fault,
    recovered: AtomicBool,
    pub loads: AtomicUsize,
    pub lookups: AtomicUsize,
    pub generations: AtomicUsize,
}

impl TestKeyStore {
    pub fn new() -> Arc<Self> {
        Self::with_fault(Fault::None)
    }

    pub fn with_fault(fault: Fault) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryKeyStore::new(),
            fault,
            recovered: AtomicBool::new(false),
            loads: AtomicUsize::new(0),
            lookups: AtomicUsize::new(0),
            generations: AtomicUsize::new(0),
        })
    }

    pub fn inner(&self) -> &MemoryKeyStore {
        &self.inner
    }

    pub fn recover(&self) {
        self.recovered.store(true, Ordering::SeqCst);
    }

    /// (loads, lookups, generations)
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.loads.load(Ordering::SeqCst),
            self.lookups.load(Ordering::SeqCst),
            self.generations.load(Ordering::SeqCst),
        )
    }
}

impl KeyStore for TestKeyStore {
    fn name(&self) -> &'static str {
        "test"
    }

    fn load(&self) -> Result<(), KeystoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fault == Fault::Unavailable && !self.recovered.load(Ordering::SeqCst) {
            return Err(KeystoreError::Unavailable("locked".into()));
        }
        self.inner.load()
    }

    fn get_entry(&self, alias: &str) -> Result<Option<KeyEntry>, KeystoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get_entry(alias)
    }

    fn generate_key_pair(&self, spec: &KeyGenSpec) -> Result<KeyPairInfo, KeystoreError> {
        self.generations.fetch_add(1, Ordering::SeqCst);
        match self.fault {
            Fault::GenerationFails => Err(KeystoreError::Generation("hardware refused".into())),
            Fault::DropsGeneratedKey => MemoryKeyStore::new().generate_key_pair(spec),
            Fault::GeneratesSecret => {
                self.inner.insert_secret(&spec.alias, b"not a key pair")?;
                MemoryKeyStore::new().generate_key_pair(spec)
            }
            _ => self.inner.generate_key_pair(spec),
        }
    }
}
