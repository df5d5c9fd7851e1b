//! Serves stored interactions, each at most once per session.

use super::format::{Cassette, Interaction};
use super::matcher::{MatchPolicy, RequestView};

/// Request attributes of one stored interaction, decoded once.
#[derive(Debug, Clone)]
struct StoredRequest {
    method: String,
    uri: String,
    body: Vec<u8>,
}

impl StoredRequest {
    fn view(&self) -> RequestView<'_> {
        RequestView { method: &self.method, uri: &self.uri, body: &self.body }
    }
}

/// Tracks which stored interactions this session has already served.
///
/// The first unconsumed match in stored order wins, so repeated identical
/// requests are answered by successive recordings. A fresh replayer starts
/// with nothing consumed.
#[derive(Debug, Clone, Default)]
pub struct CassetteReplayer {
    stored: Vec<StoredRequest>,
    consumed: Vec<bool>,
}

impl CassetteReplayer {
    /// Indexes every interaction of `cassette`.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored request body cannot be decoded.
    pub fn new(cassette: &Cassette) -> Result<Self, String> {
        let mut replayer = Self::default();
        for interaction in &cassette.interactions {
            replayer.push(interaction, false)?;
        }
        Ok(replayer)
    }

    /// Finds and consumes the first unconsumed match for `incoming`.
    ///
    /// Returns the index of the stored interaction, or `None` on a miss.
    pub fn take_match(
        &mut self,
        policy: &MatchPolicy,
        incoming: &RequestView<'_>,
    ) -> Option<usize> {
        let index = self
            .stored
            .iter()
            .enumerate()
            .find(|(i, stored)| !self.consumed[*i] && policy.matches(incoming, &stored.view()))
            .map(|(i, _)| i)?;
        self.consumed[index] = true;
        Some(index)
    }

    /// Appends a freshly recorded interaction, already marked consumed so it
    /// is not replayed in the session that recorded it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request body cannot be decoded.
    pub fn push_recorded(&mut self, interaction: &Interaction) -> Result<(), String> {
        self.push(interaction, true)
    }

    fn push(&mut self, interaction: &Interaction, consumed: bool) -> Result<(), String> {
        self.stored.push(StoredRequest {
            method: interaction.request.method.clone(),
            uri: interaction.request.uri.clone(),
            body: interaction.request.body.to_bytes()?,
        });
        self.consumed.push(consumed);
        Ok(())
    }

    /// Number of indexed interactions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stored.len()
    }

    /// Returns `true` if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }

    /// Number of interactions not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.consumed.iter().filter(|c| !**c).count()
    }

    /// Returns `true` once every indexed interaction has been consumed.
    #[must_use]
    pub fn all_consumed(&self) -> bool {
        self.remaining() == 0
    }
}
