//! Replaying adapters that serve recorded interactions.

pub mod assistant;

pub use assistant::ReplayingAssistant;

use serde::de::DeserializeOwned;

/// Decodes a recorded `{"ok": ..}` / `{"err": ..}` output back into a `Result`.
///
/// # Panics
///
/// Panics if the recorded value does not match either shape; a corrupt
/// cassette is a test setup bug, not a runtime condition.
pub(crate) fn replay_result<T, E>(output: &serde_json::Value, context: &str) -> Result<T, E>
where
    T: DeserializeOwned,
    E: DeserializeOwned,
{
    if let Some(err) = output.get("err") {
        let err = serde_json::from_value(err.clone())
            .unwrap_or_else(|e| panic!("{context}: recorded error does not decode: {e}"));
        return Err(err);
    }
    let value = output
        .get("ok")
        .unwrap_or_else(|| panic!("{context}: recorded output has neither ok nor err"));
    Ok(serde_json::from_value(value.clone())
        .unwrap_or_else(|e| panic!("{context}: recorded value does not decode: {e}")))
}
