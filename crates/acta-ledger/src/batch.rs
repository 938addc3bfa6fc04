//! Batch seeding of tally sheets.

use acta_store::EntryStore;
use acta_types::{id as acta_id, ActaTemplate};
use tracing::{debug, info, warn};

use crate::error::{ActaError, ActaResult};
use crate::lifecycle::TallyLedger;

impl<S: EntryStore> TallyLedger<S> {
    /// Create one acta per template under freshly generated ids.
    ///
    /// Returns the ids in template order. Actas are committed one at a
    /// time: if entry *k* fails, the first *k - 1* stay written and the
    /// error is [`ActaError::BatchIncomplete`] carrying their ids.
    pub fn create_batch(&self, templates: &[ActaTemplate]) -> ActaResult<Vec<String>> {
        self.create_batch_with(templates, acta_id::generate)
    }

    /// [`create_batch`](Self::create_batch) into a store that must hold no
    /// actas yet.
    pub fn seed(&self, templates: &[ActaTemplate]) -> ActaResult<Vec<String>> {
        let existing = self.store().range_scan("", "")?.len();
        if existing > 0 {
            warn!(existing, "seed rejected: store already holds actas");
            return Err(ActaError::AlreadySeeded { existing });
        }
        self.create_batch(templates)
    }

    pub(crate) fn create_batch_with<F>(
        &self,
        templates: &[ActaTemplate],
        mut next_id: F,
    ) -> ActaResult<Vec<String>>
    where
        F: FnMut() -> String,
    {
        let mut ids = Vec::with_capacity(templates.len());
        for template in templates {
            let result = self
                .fresh_id(&mut next_id)
                .and_then(|id| self.create(&id, template).map(|_| id));
            match result {
                Ok(id) => ids.push(id),
                Err(source) => {
                    warn!(committed = ids.len(), error = %source, "batch stopped");
                    return Err(ActaError::BatchIncomplete {
                        committed: ids.len(),
                        ids,
                        source: Box::new(source),
                    });
                }
            }
        }
        info!(count = ids.len(), "batch committed");
        Ok(ids)
    }

    fn fresh_id<F>(&self, next_id: &mut F) -> ActaResult<String>
    where
        F: FnMut() -> String,
    {
        let attempts = self.config().max_id_attempts;
        for attempt in 1..=attempts {
            let id = next_id();
            if !self.exists(&id)? {
                return Ok(id);
            }
            debug!(id, attempt, "generated id collides; drawing another");
        }
        Err(ActaError::IdExhausted { attempts })
    }
}
