//! Sending prepared writes.

use crate::client::Client;
use crate::error::Error;
use crate::hooks::PreparedConfig;
use crate::types::TxHash;

use super::prepare::PrepareMode;

/// Send a prepared contract write through the connected signer.
///
/// Fails with [`Error::NotPrepared`] unless `config` carries a prepared
/// request, with [`Error::NotConnected`] when no wallet is connected, and
/// with [`Error::ChainMismatch`] when the request names a chain other than
/// the signer's.
pub async fn write_contract(client: &Client, config: &PreparedConfig) -> Result<TxHash, Error> {
    let request = match (&config.request, config.mode) {
        (Some(request), PrepareMode::Prepared) => request,
        _ => return Err(Error::NotPrepared),
    };

    let signer = client
        .fetch_signer(request.chain_id)
        .await?
        .ok_or(Error::NotConnected)?;

    if let Some(expected) = request.chain_id {
        let actual = signer.chain_id().await?;
        if actual != expected {
            return Err(Error::ChainMismatch { expected, actual });
        }
    }

    tracing::debug!(
        to = %config.address_or_name,
        function = %config.function_name,
        "sending prepared write"
    );
    signer.send_transaction(request.clone()).await
}
