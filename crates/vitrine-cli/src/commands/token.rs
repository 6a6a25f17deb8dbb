//! `vitrine token` - generate public dashboard identifiers.

use serde::Serialize;
use vitrine_core::VitrineConfig;
use vitrine_service::{AccessTokenGenerator, IdGenerator, ShortUidGenerator};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identifiers {
    pub uid: String,
    pub access_token: String,
}

pub fn generate(config: &VitrineConfig, count: usize) -> Vec<Identifiers> {
    let uids = ShortUidGenerator::new(config.tokens.uid_length);
    let tokens = AccessTokenGenerator;
    (0..count)
        .map(|_| Identifiers {
            uid: uids.new_random_id(),
            access_token: tokens.new_random_id(),
        })
        .collect()
}

pub fn run(config: &VitrineConfig, count: usize) -> anyhow::Result<()> {
    for identifiers in generate(config, count) {
        println!("{}", serde_json::to_string(&identifiers)?);
    }
    Ok(())
}
