use indexmap::IndexMap;
use indexmap::map::Entry;
use wordmine_types::{Evidence, EvidenceList};

/// First-seen ordered token set with capped, de-duplicated evidence per token.
///
/// Every reader feeds one of these; the run owns it exclusively until the
/// dictionary join turns it into entries.
#[derive(Clone, Debug, Default)]
pub struct EvidenceAggregator {
    tokens: IndexMap<String, EvidenceList>,
}

impl EvidenceAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a token without evidence (document sources).
    pub fn record_token(&mut self, token: &str) {
        if !self.tokens.contains_key(token) {
            self.tokens.insert(token.to_string(), EvidenceList::new());
        }
    }

    /// Record a token seen inside `evidence`.
    pub fn record(&mut self, token: &str, evidence: &Evidence) {
        match self.tokens.get_mut(token) {
            Some(list) => {
                if !list.is_full() {
                    list.push(evidence.clone());
                }
            }
            None => {
                let mut list = EvidenceList::new();
                list.push(evidence.clone());
                self.tokens.insert(token.to_string(), list);
            }
        }
    }

    /// Fold another aggregator in; its new tokens go after ours.
    pub fn absorb(&mut self, other: EvidenceAggregator) {
        for (token, evidence) in other.tokens {
            match self.tokens.entry(token) {
                Entry::Occupied(mut slot) => slot.get_mut().merge(&evidence),
                Entry::Vacant(slot) => {
                    slot.insert(evidence);
                }
            }
        }
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> + '_ {
        self.tokens.keys().map(String::as_str)
    }

    pub fn evidence(&self, token: &str) -> Option<&EvidenceList> {
        self.tokens.get(token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub(crate) fn take_evidence(&mut self, token: &str) -> Option<EvidenceList> {
        self.tokens.get_mut(token).map(std::mem::take)
    }
}
