use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::status::ActaStatus;

/// A tally sheet as stored in the ledger.
///
/// Field declaration order is the canonical key order of the stored JSON,
/// and the serde names are the keys every other ledger writer uses. Do not
/// reorder or rename fields: identical content must encode to identical
/// bytes across implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acta {
    pub id: String,
    pub cda: u32,
    pub cargo: u32,
    pub provincia: u32,
    pub canton: u32,
    pub parroquia: u32,
    pub junta: u32,
    pub status: ActaStatus,
    /// Content reference of the scanned sheet image; empty when unset.
    #[serde(rename = "cid")]
    pub image_ref: String,
    /// Electoral-roll size of the junta.
    #[serde(rename = "electores")]
    pub registered_voters: u32,
    #[serde(rename = "blancos")]
    pub blank_votes: u32,
    #[serde(rename = "nulos")]
    pub spoiled_votes: u32,
    #[serde(rename = "candidato1")]
    pub candidate1_votes: u32,
    #[serde(rename = "candidato2")]
    pub candidate2_votes: u32,
    #[serde(rename = "votos")]
    pub total_votes: u32,
}

impl Acta {
    /// A freshly created acta: template fields, `Created`, no image, no votes.
    pub fn new(id: impl Into<String>, template: &ActaTemplate) -> Self {
        Self {
            id: id.into(),
            cda: template.cda,
            cargo: template.cargo,
            provincia: template.provincia,
            canton: template.canton,
            parroquia: template.parroquia,
            junta: template.junta,
            status: ActaStatus::Created,
            image_ref: String::new(),
            registered_voters: template.registered_voters,
            blank_votes: 0,
            spoiled_votes: 0,
            candidate1_votes: 0,
            candidate2_votes: 0,
            total_votes: 0,
        }
    }

    /// Stand-in for a deleted version: only `id` is meaningful.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self::new(id, &ActaTemplate::default())
    }

    /// Identity fields of this acta, as they were seeded.
    pub fn template(&self) -> ActaTemplate {
        ActaTemplate {
            cda: self.cda,
            cargo: self.cargo,
            provincia: self.provincia,
            canton: self.canton,
            parroquia: self.parroquia,
            junta: self.junta,
            registered_voters: self.registered_voters,
        }
    }

    /// `true` if both actas share id and every immutable field.
    pub fn same_identity(&self, other: &Acta) -> bool {
        self.id == other.id && self.template() == other.template()
    }

    pub fn votes(&self) -> VoteCounts {
        VoteCounts {
            blank: self.blank_votes,
            spoiled: self.spoiled_votes,
            candidate1: self.candidate1_votes,
            candidate2: self.candidate2_votes,
            total: self.total_votes,
        }
    }

    pub fn set_votes(&mut self, votes: VoteCounts) {
        self.blank_votes = votes.blank;
        self.spoiled_votes = votes.spoiled;
        self.candidate1_votes = votes.candidate1;
        self.candidate2_votes = votes.candidate2;
        self.total_votes = votes.total;
    }

    /// Reset the image reference and every cast-vote field.
    pub fn clear_results(&mut self) {
        self.image_ref.clear();
        self.set_votes(VoteCounts::ZERO);
    }

    /// Vote fields are zero unless the status carries results.
    pub fn votes_consistent_with_status(&self) -> bool {
        self.status.carries_results() || self.votes().is_zero()
    }

    /// Canonical stored representation: compact JSON in field order.
    pub fn to_canonical_bytes(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(bytes).map_err(|e| TypeError::Decode(e.to_string()))
    }
}

/// Identity fields used to seed an acta.
///
/// Deserializes from the same keys as [`Acta`]; any other keys in a seed
/// file (id, status, counts) are ignored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActaTemplate {
    pub cda: u32,
    pub cargo: u32,
    pub provincia: u32,
    pub canton: u32,
    pub parroquia: u32,
    pub junta: u32,
    #[serde(rename = "electores", default)]
    pub registered_voters: u32,
}

/// The five cast-vote fields recorded with results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCounts {
    pub blank: u32,
    pub spoiled: u32,
    pub candidate1: u32,
    pub candidate2: u32,
    pub total: u32,
}

impl VoteCounts {
    pub const ZERO: VoteCounts = VoteCounts {
        blank: 0,
        spoiled: 0,
        candidate1: 0,
        candidate2: 0,
        total: 0,
    };

    pub fn new(blank: u32, spoiled: u32, candidate1: u32, candidate2: u32, total: u32) -> Self {
        Self {
            blank,
            spoiled,
            candidate1,
            candidate2,
            total,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Sum of the four ballot categories, widened to avoid overflow.
    pub fn ballots_cast(&self) -> u64 {
        u64::from(self.blank)
            + u64::from(self.spoiled)
            + u64::from(self.candidate1)
            + u64::from(self.candidate2)
    }
}
