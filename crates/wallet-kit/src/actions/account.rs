//! Account accessor.

use std::sync::Arc;

use crate::client::{Client, ClientState, Connector};
use crate::types::Address;

/// The connected account, as seen by the client right now.
///
/// Both fields are `None` when no wallet is connected.
#[derive(Clone, Debug, Default)]
pub struct Account {
    pub address: Option<Address>,
    pub connector: Option<Arc<dyn Connector>>,
}

impl Account {
    pub(crate) fn from_state(state: &ClientState) -> Self {
        Self {
            address: state.data.as_ref().and_then(|data| data.account),
            connector: state.connector.clone(),
        }
    }

    /// Whether an address is available.
    pub fn is_connected(&self) -> bool {
        self.address.is_some()
    }

    /// Same address and same connector instance.
    pub(crate) fn same_as(&self, other: &Account) -> bool {
        let same_connector = match (&self.connector, &other.connector) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        self.address == other.address && same_connector
    }
}

/// Read the current account from `client`.
///
/// Never fails and never waits.
pub fn get_account(client: &Client) -> Account {
    Account::from_state(&client.state())
}
