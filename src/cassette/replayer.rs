//! Replays recorded interactions from a cassette.

use std::path::Path;

use super::format::{Cassette, Interaction};

/// Serves a cassette's interactions back in the order they were recorded.
///
/// Replay is strict: the next call must be for the same port and method as
/// the next recorded interaction, otherwise the run has diverged from the
/// recording and the replayer panics.
pub struct CassetteReplayer {
    name: String,
    interactions: Vec<Interaction>,
    cursor: usize,
}

impl CassetteReplayer {
    /// Loads a cassette file and creates a replayer for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
        let cassette = Cassette::from_yaml(&content)
            .map_err(|e| format!("{e} ({})", path.display()))?;
        Ok(Self::new(&cassette))
    }

    /// Creates a replayer positioned at the first interaction.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut interactions = cassette.interactions.clone();
        interactions.sort_by_key(|i| i.seq);
        Self { name: cassette.name.clone(), interactions, cursor: 0 }
    }

    /// Number of interactions not yet served.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.interactions.len() - self.cursor
    }

    /// Returns the next interaction, which must be for `port::method`.
    ///
    /// # Panics
    ///
    /// Panics when the cassette is exhausted or when the next recorded
    /// interaction is for a different port or method.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> &Interaction {
        let Some(interaction) = self.interactions.get(self.cursor) else {
            panic!(
                "Cassette exhausted: {port}::{method} requested after all {count} \
                 interactions of cassette {name:?} were served",
                count = self.interactions.len(),
                name = self.name,
            );
        };
        assert!(
            interaction.port == port && interaction.method == method,
            "Cassette mismatch: {port}::{method} requested but interaction seq={seq} \
             of cassette {name:?} is {recorded_port}::{recorded_method}",
            seq = interaction.seq,
            name = self.name,
            recorded_port = interaction.port,
            recorded_method = interaction.method,
        );
        self.cursor += 1;
        interaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::{Cassette, Interaction};
    use chrono::Utc;
    use serde_json::json;

    fn invoke(seq: u64, text: &str) -> Interaction {
        Interaction {
            seq,
            port: "assistant".into(),
            method: "invoke".into(),
            input: json!({"instruction": format!("step {seq}")}),
            output: json!({"ok": {"text": text}}),
        }
    }

    fn make_cassette(interactions: Vec<Interaction>) -> Cassette {
        Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            outer_version: "0.1.0".into(),
            interactions,
        }
    }

    #[test]
    fn serves_invocations_in_recorded_order() {
        let cassette = make_cassette(vec![invoke(0, "architecture"), invoke(1, "roadmap")]);
        let mut replayer = CassetteReplayer::new(&cassette);

        assert_eq!(replayer.next_interaction("assistant", "invoke").output["ok"]["text"], "architecture");
        assert_eq!(replayer.next_interaction("assistant", "invoke").output["ok"]["text"], "roadmap");
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.cassette.yaml");
        std::fs::write(&path, serde_yaml::to_string(&make_cassette(vec![invoke(0, "x")])).unwrap())
            .unwrap();

        let mut replayer = CassetteReplayer::from_file(&path).unwrap();
        assert_eq!(replayer.next_interaction("assistant", "invoke").seq, 0);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = CassetteReplayer::from_file(std::path::Path::new("/nonexistent/c.yaml"))
            .err()
            .unwrap();
        assert!(err.contains("Failed to read cassette file"));
    }

    #[test]
    #[should_panic(expected = "Cassette exhausted")]
    fn exhausted_replayer_panics_with_descriptive_message() {
        let cassette = make_cassette(vec![invoke(0, "only")]);
        let mut replayer = CassetteReplayer::new(&cassette);
        let _ = replayer.next_interaction("assistant", "invoke");
        let _ = replayer.next_interaction("assistant", "invoke");
    }

    #[test]
    #[should_panic(expected = "Cassette exhausted")]
    fn empty_cassette_panics() {
        let mut replayer = CassetteReplayer::new(&make_cassette(vec![]));
        let _ = replayer.next_interaction("assistant", "invoke");
    }

    #[test]
    #[should_panic(expected = "Cassette mismatch")]
    fn diverging_call_panics() {
        let mut recorded = invoke(0, "x");
        recorded.method = "stream".into();
        let mut replayer = CassetteReplayer::new(&make_cassette(vec![recorded]));
        let _ = replayer.next_interaction("assistant", "invoke");
    }

    #[test]
    fn serves_by_sequence_number_and_counts_down() {
        let mut replayer =
            CassetteReplayer::new(&make_cassette(vec![invoke(1, "second"), invoke(0, "first")]));
        assert_eq!(replayer.remaining(), 2);
        assert_eq!(replayer.next_interaction("assistant", "invoke").output["ok"]["text"], "first");
        assert_eq!(replayer.remaining(), 1);
    }
}
