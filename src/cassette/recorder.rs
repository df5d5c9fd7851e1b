//! Records HTTP exchanges into a cassette file.

use std::path::{Path, PathBuf};

use chrono::Utc;

use super::filter::FilterPolicy;
use super::format::{
    group_headers, Body, Cassette, Interaction, RecordedRequest, RecordedResponse, Status,
};
use super::store;
use crate::error::VcrError;
use crate::ports::http::{HttpRequest, HttpResponse};

/// Holds the working copy of a cassette and writes it back to disk.
///
/// Every captured exchange passes through the filter policy before it is
/// kept, so nothing filtered ever reaches the file.
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    cassette: Cassette,
    filter: FilterPolicy,
}

impl CassetteRecorder {
    /// Create a recorder that extends `cassette` and writes to `path`.
    pub fn new(path: impl Into<PathBuf>, cassette: Cassette, filter: FilterPolicy) -> Self {
        Self { path: path.into(), cassette, filter }
    }

    /// Builds the stored form of an exchange with the filter policy applied.
    #[must_use]
    pub fn capture(&self, request: &HttpRequest, response: &HttpResponse) -> Interaction {
        Interaction {
            request: RecordedRequest {
                uri: self.filter.filter_uri(&request.uri),
                method: request.method.clone(),
                body: Body::from_bytes(&request.body),
                headers: group_headers(&self.filter.filter_headers(&request.headers)),
            },
            response: RecordedResponse {
                status: Status { code: response.status, message: response.message.clone() },
                headers: group_headers(&self.filter.filter_headers(&response.headers)),
                body: Body::from_bytes(&response.body),
            },
            recorded_at: Some(Utc::now()),
        }
    }

    /// Appends `interaction` and rewrites the file.
    ///
    /// If the write fails the interaction is dropped again, so memory and
    /// disk never disagree.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn append(&mut self, interaction: Interaction) -> Result<(), VcrError> {
        self.cassette.interactions.push(interaction);
        if let Err(e) = self.persist() {
            self.cassette.interactions.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Write the whole cassette to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn persist(&self) -> Result<(), VcrError> {
        store::save(&self.path, &self.cassette)
    }

    /// The stored interactions, in order.
    #[must_use]
    pub fn interactions(&self) -> &[Interaction] {
        &self.cassette.interactions
    }

    /// The cassette file this recorder writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
