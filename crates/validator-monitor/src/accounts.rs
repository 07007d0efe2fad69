//! Account registry: the static list of validators to monitor.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AccountsError;

/// A validator to monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: u64,
    pub address: String,
    pub ip: String,
    pub port: u16,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub note: Option<String>,
}

impl Account {
    /// Label used in alert head lines: `ip | note`.
    pub fn label(&self) -> String {
        match &self.note {
            Some(note) => format!("{} | {note}", self.ip),
            None => self.ip.clone(),
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Loaded, validated accounts. Immutable for the life of the process.
#[derive(Debug, Clone)]
pub struct AccountRegistry {
    accounts: Arc<[Account]>,
}

impl AccountRegistry {
    /// Read accounts from a CSV file with header `id,address,ip,port,note`.
    pub fn load(path: &Path) -> Result<Self, AccountsError> {
        let read_err = |source| AccountsError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)
            .map_err(read_err)?;

        let accounts = reader
            .deserialize::<Account>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?;

        if accounts.is_empty() {
            return Err(AccountsError::Empty {
                path: path.to_path_buf(),
            });
        }

        let registry = Self::from_accounts(accounts)?;
        info!(
            path = %path.display(),
            count = registry.len(),
            "Loaded accounts"
        );
        Ok(registry)
    }

    /// Validate an in-memory account list.
    pub fn from_accounts(accounts: Vec<Account>) -> Result<Self, AccountsError> {
        let mut seen = HashSet::new();
        for account in &accounts {
            if !seen.insert(account.id) {
                return Err(AccountsError::DuplicateId(account.id));
            }
            let invalid = |reason: &str| AccountsError::InvalidRow {
                id: account.id,
                reason: reason.to_string(),
            };
            if account.address.trim().is_empty() {
                return Err(invalid("address is empty"));
            }
            if account.ip.trim().is_empty() {
                return Err(invalid("ip is empty"));
            }
            if account.port == 0 {
                return Err(invalid("port must be non-zero"));
            }
        }

        Ok(Self {
            accounts: accounts.into(),
        })
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Shared handle for worker tasks.
    pub fn shared(&self) -> Arc<[Account]> {
        Arc::clone(&self.accounts)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
