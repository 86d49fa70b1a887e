//! Directory Service adapter — spec §6.3. Outbound HTTP calls for token
//! verification, wallet debit/credit, unseat, cleanup checks, and
//! hand-history recording.
//!
//! No teacher counterpart (the Solana program has no external directory);
//! grounded on the `reqwest` dependency carried by `other_examples/manifests/
//! mentalcardgames-mcg`'s Cargo.toml for a native game server binary.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{GameError, GameResult};

#[derive(Debug, Deserialize)]
pub struct VerifiedToken {
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct WalletResult {
    pub success: bool,
    pub new_balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct CleanupResult {
    pub deleted: bool,
}

/// Table parameters the Directory considers authoritative, sourced once at
/// table creation (SPEC_FULL.md §4.4) — any field left `None` falls back to
/// whatever the triggering `seatPlayer`/websocket-join call supplied.
#[derive(Debug, Default, Deserialize)]
pub struct TableConfig {
    pub small_blind: Option<u64>,
    pub big_blind: Option<u64>,
    pub initial_stack: Option<u64>,
    pub ante: Option<u64>,
    pub action_timeout_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
struct HandHistoryBody<'a> {
    community_id: &'a str,
    table_id: &'a str,
    name: &'a str,
    hand_data: serde_json::Value,
}

#[async_trait::async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn verify_token(&self, token: &str) -> GameResult<VerifiedToken>;
    async fn debit_wallet(&self, user_id: &str, community_id: &str, amount: u64, memo: &str) -> GameResult<WalletResult>;
    async fn credit_wallet(&self, user_id: &str, community_id: &str, amount: u64, memo: &str) -> GameResult<WalletResult>;
    async fn unseat_player(&self, table_id: &str, user_id: &str) -> GameResult<()>;
    async fn check_cleanup(&self, table_id: &str) -> GameResult<CleanupResult>;
    async fn get_table_config(&self, table_id: &str) -> GameResult<TableConfig>;
    async fn record_hand_history(&self, community_id: &str, table_id: &str, name: &str, hand_data: serde_json::Value) -> GameResult<()>;
}

pub struct HttpDirectoryClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpDirectoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpDirectoryClient { base_url: base_url.into(), http: reqwest::Client::new() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait::async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn verify_token(&self, token: &str) -> GameResult<VerifiedToken> {
        let response = self
            .http
            .post(self.url("/verify-token"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| GameError::External(format!("verify_token request failed: {err}")))?;
        if !response.status().is_success() {
            return Err(GameError::Authentication(format!("token rejected with status {}", response.status())));
        }
        response.json().await.map_err(|err| GameError::External(format!("verify_token decode failed: {err}")))
    }

    async fn debit_wallet(&self, user_id: &str, community_id: &str, amount: u64, memo: &str) -> GameResult<WalletResult> {
        self.wallet_call("/wallet/debit", user_id, community_id, amount, memo).await
    }

    async fn credit_wallet(&self, user_id: &str, community_id: &str, amount: u64, memo: &str) -> GameResult<WalletResult> {
        self.wallet_call("/wallet/credit", user_id, community_id, amount, memo).await
    }

    async fn unseat_player(&self, table_id: &str, user_id: &str) -> GameResult<()> {
        self.http
            .post(self.url("/unseat"))
            .json(&json!({ "tableId": table_id, "userId": user_id }))
            .send()
            .await
            .map_err(|err| GameError::External(format!("unseat_player request failed: {err}")))?;
        Ok(())
    }

    async fn check_cleanup(&self, table_id: &str) -> GameResult<CleanupResult> {
        let response = self
            .http
            .get(self.url(&format!("/cleanup/{table_id}")))
            .send()
            .await
            .map_err(|err| GameError::External(format!("check_cleanup request failed: {err}")))?;
        response.json().await.map_err(|err| GameError::External(format!("check_cleanup decode failed: {err}")))
    }

    async fn get_table_config(&self, table_id: &str) -> GameResult<TableConfig> {
        let response = self
            .http
            .get(self.url(&format!("/table-config/{table_id}")))
            .send()
            .await
            .map_err(|err| GameError::External(format!("get_table_config request failed: {err}")))?;
        response.json().await.map_err(|err| GameError::External(format!("get_table_config decode failed: {err}")))
    }

    async fn record_hand_history(&self, community_id: &str, table_id: &str, name: &str, hand_data: serde_json::Value) -> GameResult<()> {
        let body = HandHistoryBody { community_id, table_id, name, hand_data };
        self.http
            .post(self.url("/hand-history"))
            .json(&body)
            .send()
            .await
            .map_err(|err| GameError::External(format!("record_hand_history request failed: {err}")))?;
        Ok(())
    }
}

impl HttpDirectoryClient {
    async fn wallet_call(&self, path: &str, user_id: &str, community_id: &str, amount: u64, memo: &str) -> GameResult<WalletResult> {
        let response = self
            .http
            .post(self.url(path))
            .json(&json!({ "userId": user_id, "communityId": community_id, "amount": amount, "memo": memo }))
            .send()
            .await
            .map_err(|err| GameError::External(format!("wallet call to {path} failed: {err}")))?;
        response.json().await.map_err(|err| GameError::External(format!("wallet call to {path} decode failed: {err}")))
    }
}

/// `MODE=test` stand-in (spec §6.5 `MODE`): verifies bearer tokens locally
/// against `AUTH_TOKEN_SECRET` instead of calling a live Directory Service
/// (spec §6.5 "AUTH_TOKEN_SECRET: used only in test mode where tokens are
/// verified locally"), and treats every wallet/unseat/cleanup call as a
/// no-op success.
pub struct StubDirectoryClient {
    auth_token_secret: String,
}

impl StubDirectoryClient {
    pub fn new(auth_token_secret: impl Into<String>) -> Self {
        StubDirectoryClient { auth_token_secret: auth_token_secret.into() }
    }
}

#[async_trait::async_trait]
impl DirectoryClient for StubDirectoryClient {
    async fn verify_token(&self, token: &str) -> GameResult<VerifiedToken> {
        let mut parts = token.splitn(4, ':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("test"), Some(secret), Some(user_id), Some(display_name))
                if secret == self.auth_token_secret && !user_id.is_empty() && !display_name.is_empty() =>
            {
                Ok(VerifiedToken { user_id: user_id.to_string(), username: display_name.to_string() })
            }
            _ => Err(GameError::Authentication(format!(
                "malformed or mismatched test token {token:?}, expected test:<authTokenSecret>:<userId>:<displayName>"
            ))),
        }
    }

    async fn debit_wallet(&self, _user_id: &str, _community_id: &str, amount: u64, _memo: &str) -> GameResult<WalletResult> {
        Ok(WalletResult { success: true, new_balance: amount as i64 })
    }

    async fn credit_wallet(&self, _user_id: &str, _community_id: &str, amount: u64, _memo: &str) -> GameResult<WalletResult> {
        Ok(WalletResult { success: true, new_balance: amount as i64 })
    }

    async fn unseat_player(&self, _table_id: &str, _user_id: &str) -> GameResult<()> {
        Ok(())
    }

    async fn check_cleanup(&self, _table_id: &str) -> GameResult<CleanupResult> {
        Ok(CleanupResult { deleted: false })
    }

    async fn get_table_config(&self, _table_id: &str) -> GameResult<TableConfig> {
        Ok(TableConfig::default())
    }

    async fn record_hand_history(&self, _community_id: &str, _table_id: &str, _name: &str, _hand_data: serde_json::Value) -> GameResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_rejects_a_malformed_token() {
        let client = StubDirectoryClient::new("shh");
        let err = client.verify_token("").await.unwrap_err();
        assert_eq!(err.reason(), "Authentication");
        let err = client.verify_token("user-42").await.unwrap_err();
        assert_eq!(err.reason(), "Authentication");
    }

    #[tokio::test]
    async fn stub_rejects_a_token_with_the_wrong_secret() {
        let client = StubDirectoryClient::new("shh");
        let err = client.verify_token("test:wrong:user-42:Alice").await.unwrap_err();
        assert_eq!(err.reason(), "Authentication");
    }

    #[tokio::test]
    async fn stub_accepts_a_well_formed_test_token() {
        let client = StubDirectoryClient::new("shh");
        let verified = client.verify_token("test:shh:user-42:Alice").await.unwrap();
        assert_eq!(verified.user_id, "user-42");
        assert_eq!(verified.username, "Alice");
    }
}
