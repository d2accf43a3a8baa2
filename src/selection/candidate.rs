use crate::package::PackMetadata;

/// One pack offered to the model during a single selection call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionCandidate {
    pub pack_id: String,
    pub name: String,
    pub description: String,
    pub signature: String,
    pub categories: Vec<String>,
}

impl From<&PackMetadata> for SelectionCandidate {
    fn from(metadata: &PackMetadata) -> Self {
        Self {
            pack_id: metadata.pack_id.clone(),
            name: metadata.name.clone(),
            description: metadata.description.clone(),
            signature: metadata.signature(),
            categories: metadata.categories.iter().cloned().collect(),
        }
    }
}

/// How candidates are referred to in the prompt and in the model's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// By pack identifier.
    RealId,
    /// By 1-based position, which models echo back more reliably.
    PseudoId,
}

/// The candidates of one selection call and the keys they are shown under.
#[derive(Debug, Clone)]
pub struct CandidateTable {
    addressing: Addressing,
    candidates: Vec<SelectionCandidate>,
}

impl CandidateTable {
    /// Later duplicates of an identifier are dropped.
    pub fn new(candidates: Vec<SelectionCandidate>, addressing: Addressing) -> Self {
        let mut unique: Vec<SelectionCandidate> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !unique.iter().any(|c| c.pack_id == candidate.pack_id) {
                unique.push(candidate);
            }
        }
        Self {
            addressing,
            candidates: unique,
        }
    }

    pub fn addressing(&self) -> Addressing {
        self.addressing
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates with the key each is shown under.
    pub fn entries(&self) -> impl Iterator<Item = (String, &SelectionCandidate)> {
        self.candidates
            .iter()
            .enumerate()
            .map(move |(i, candidate)| (self.key_at(i, candidate), candidate))
    }

    fn key_at(&self, index: usize, candidate: &SelectionCandidate) -> String {
        match self.addressing {
            Addressing::RealId => candidate.pack_id.clone(),
            Addressing::PseudoId => (index + 1).to_string(),
        }
    }

    /// The identifier a key refers to.
    ///
    /// With pseudo-ids a number is tried first; an exact identifier is accepted
    /// in both modes. Nothing else matches.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        if self.addressing == Addressing::PseudoId
            && let Ok(n) = key.parse::<usize>()
        {
            return n
                .checked_sub(1)
                .and_then(|i| self.candidates.get(i))
                .map(|c| c.pack_id.as_str());
        }
        self.candidates
            .iter()
            .find(|c| c.pack_id == key)
            .map(|c| c.pack_id.as_str())
    }
}
