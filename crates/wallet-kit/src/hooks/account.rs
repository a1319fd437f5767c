//! Account change notifications.

use tokio::sync::watch;

use crate::actions::Account;
use crate::client::{Client, ClientState};

/// Yields the account each time it changes.
///
/// A change is a different address or a different connector instance.
/// State updates that leave both unchanged are skipped.
#[derive(Debug)]
pub struct AccountWatcher {
    rx: watch::Receiver<ClientState>,
    last: Account,
}

impl AccountWatcher {
    /// The account as of the last change seen.
    pub fn current(&self) -> &Account {
        &self.last
    }

    /// Wait for the next account change.
    ///
    /// Returns `None` once the client is gone.
    pub async fn changed(&mut self) -> Option<Account> {
        loop {
            self.rx.changed().await.ok()?;
            let account = Account::from_state(&self.rx.borrow_and_update());
            if !account.same_as(&self.last) {
                self.last = account.clone();
                return Some(account);
            }
        }
    }
}

/// Watch the connected account of `client`.
pub fn watch_account(client: &Client) -> AccountWatcher {
    let mut rx = client.subscribe();
    let last = Account::from_state(&rx.borrow_and_update());
    AccountWatcher { rx, last }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::client::{JsonRpcSigner, MockConnector, RpcClient, Signer};
    use crate::types::Address;

    fn signer(address: Address) -> Arc<dyn Signer> {
        let rpc = Arc::new(RpcClient::new("http://127.0.0.1:1"));
        Arc::new(JsonRpcSigner::new(address, rpc))
    }

    #[tokio::test]
    async fn test_watch_connect_and_disconnect() {
        let client = Client::mainnet().build().unwrap();
        let mut watcher = watch_account(&client);
        assert!(!watcher.current().is_connected());

        let address: Address = "0xbeefbeefbeefbeefbeefbeefbeefbeefbeefbeef".parse().unwrap();
        let connector = Arc::new(MockConnector::new(signer(address), 1));
        client.connect(connector).await.unwrap();

        let account = watcher.changed().await.unwrap();
        assert_eq!(account.address, Some(address));

        client.disconnect().await;
        let account = watcher.changed().await.unwrap();
        assert!(account.address.is_none());
        assert!(account.connector.is_none());
    }

    #[tokio::test]
    async fn test_watch_ends_with_client() {
        let client = Client::mainnet().build().unwrap();
        let mut watcher = watch_account(&client);
        drop(client);
        assert!(watcher.changed().await.is_none());
    }
}
