// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use dimp_core::crypto::Provider;
use dimp_core::test_utils::Account;

use crate::Transceiver;
use crate::config::Config;
use crate::memory::MemoryDataSource;
use crate::traits::EntityDataSource;

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// Data source holding the keys of `local` and the metas and visas of everyone.
pub fn data_source(local: &Account, peers: &[&Account]) -> MemoryDataSource {
    let data_source = MemoryDataSource::new();
    data_source.add_local_user(
        &local.id,
        local.sign_key.clone(),
        vec![local.decrypt_key.clone()],
    );
    for account in std::iter::once(local).chain(peers.iter().copied()) {
        data_source.save_meta(&account.meta, &account.id);
        data_source.save_document(&account.visa);
    }
    data_source
}

/// Transceiver of `local` knowing about all `peers`, with a deterministic crypto provider.
pub fn transceiver(
    local: &Account,
    peers: &[&Account],
    seed: u8,
    config: Config,
) -> Transceiver<MemoryDataSource> {
    Transceiver::builder(data_source(local, peers))
        .provider(Arc::new(Provider::from_seed([seed; 32])))
        .config(config)
        .build()
}
