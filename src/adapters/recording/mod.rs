//! Recording adapters that capture interactions to cassettes.

pub mod assistant;

pub use assistant::RecordingAssistant;

use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::warn;

use crate::cassette::recorder::CassetteRecorder;

/// Record a `Result<T, E>` interaction using the ok/err JSON convention.
///
/// Mirror of `replaying::replay_result`:
/// - `Ok(v)` is serialized as `{"ok": v}`
/// - `Err(e)` is serialized as `{"err": e}`
pub(crate) fn record_result<T, E, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: Serialize,
    I: Serialize,
{
    let encoded = serde_json::to_value(input).and_then(|input_json| {
        let output_json = match result {
            Ok(v) => serde_json::json!({ "ok": serde_json::to_value(v)? }),
            Err(e) => serde_json::json!({ "err": serde_json::to_value(e)? }),
        };
        Ok((input_json, output_json))
    });

    match encoded {
        Ok((input_json, output_json)) => {
            let mut guard = recorder.lock().expect("recorder lock poisoned");
            guard.record(port, method, input_json, output_json);
        }
        Err(e) => warn!(port, method, error = %e, "interaction could not be recorded"),
    }
}
