//! Tier 1: internal lookup.
//!
//! Checks the local store for an already-known answer before tier 2 spends
//! an external API call: an existing artist-label association, or a mashup
//! whose components are already in the catalog. Grounded on
//! `identity_resolver.rs`'s `check_existing_mapping` — same "is this already
//! recorded locally" shape, applied to labels and mashup components instead
//! of platform ids.

use std::collections::HashMap;

use uuid::Uuid;

use super::tier0_label_hunter::{LabelHint, LabelHintSource};

/// In-memory view of what persistence already knows, handed to the resolver
/// per run. A real deployment loads this from the `artists`/`track_artists`
/// tables; kept as a plain map here so this tier has no direct database
/// dependency.
#[derive(Debug, Default, Clone)]
pub struct InternalCatalogSnapshot {
    /// artist normalized_name -> known label
    pub artist_labels: HashMap<String, String>,
    /// mashup component artist normalized_name -> artist id, for names the
    /// citation parser has already split out as mashup components
    pub known_mashup_components: HashMap<String, Uuid>,
}

/// Looks up a label for `artist_normalized_name` from prior resolutions.
/// Confidence is 1.0 — this isn't a fuzzy match, it's a record of a
/// decision this system already made.
pub fn lookup_label(
    snapshot: &InternalCatalogSnapshot,
    artist_normalized_name: &str,
) -> Option<LabelHint> {
    snapshot
        .artist_labels
        .get(artist_normalized_name)
        .map(|label| LabelHint {
            label: label.clone(),
            confidence: 1.0,
            source: LabelHintSource::BracketParse,
        })
}

/// Resolves a mashup component name to an artist id already in the catalog,
/// if this tier has seen it before.
pub fn resolve_known_mashup_component(
    snapshot: &InternalCatalogSnapshot,
    component_normalized_name: &str,
) -> Option<Uuid> {
    snapshot
        .known_mashup_components
        .get(component_normalized_name)
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_label_resolves_with_full_confidence() {
        let mut snapshot = InternalCatalogSnapshot::default();
        snapshot
            .artist_labels
            .insert("above & beyond".to_string(), "Anjunabeats".to_string());

        let hint = lookup_label(&snapshot, "above & beyond").unwrap();
        assert_eq!(hint.label, "Anjunabeats");
        assert_eq!(hint.confidence, 1.0);
    }

    #[test]
    fn unknown_artist_yields_no_hint() {
        let snapshot = InternalCatalogSnapshot::default();
        assert!(lookup_label(&snapshot, "unknown artist").is_none());
    }

    #[test]
    fn known_mashup_component_resolves_to_its_artist_id() {
        let mut snapshot = InternalCatalogSnapshot::default();
        let id = Uuid::new_v4();
        snapshot.known_mashup_components.insert("swedish house mafia".to_string(), id);

        assert_eq!(
            resolve_known_mashup_component(&snapshot, "swedish house mafia"),
            Some(id)
        );
        assert_eq!(resolve_known_mashup_component(&snapshot, "nobody"), None);
    }
}
