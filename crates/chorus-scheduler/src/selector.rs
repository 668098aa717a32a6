//! Responder selection: who replies to a trigger message.

use chorus_core::{
    context::ContextEntry,
    message::{Message, SenderKind},
    participant::Participant,
};
use rand::seq::SliceRandom;
use rand::Rng;

/// What started a scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// A human message arrived.
    Human,
    /// Autonomous chatter or an agent-to-agent follow-up.
    Background,
}

/// The message that starts a scheduling pass, reduced to what the pass reads.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub sender: String,
    pub sender_id: Option<String>,
    pub kind: SenderKind,
    pub mentions: Vec<String>,
}

impl From<&Message> for Trigger {
    fn from(msg: &Message) -> Self {
        Self {
            sender: msg.sender.clone(),
            sender_id: msg.sender_id.clone(),
            kind: msg.kind,
            mentions: msg.mentions.clone(),
        }
    }
}

impl From<&ContextEntry> for Trigger {
    fn from(entry: &ContextEntry) -> Self {
        Self {
            sender: entry.sender.clone(),
            sender_id: entry.sender_id.clone(),
            kind: entry.role,
            mentions: entry.mentions.clone(),
        }
    }
}

/// One participant chosen to reply in a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponderDecision {
    pub participant_id: String,
    /// Ordinal position within this pass (drives the stagger).
    pub index: usize,
    pub mentioned: bool,
}

/// Active, not generating, and not flagged just-responded in a background pass.
pub fn is_eligible(p: &Participant, kind: PassKind) -> bool {
    p.active && !p.generating && !(kind == PassKind::Background && p.just_responded)
}

/// `(final_min, final_max)` responder counts for a pass.
pub fn bounds(eligible: usize, mentioned: usize, kind: PassKind) -> (usize, usize) {
    let (base_min, base_max) = match kind {
        // ceil(0.45 * n), at least 2
        PassKind::Human => (1, ((eligible * 45).div_ceil(100)).max(2)),
        // ceil(0.25 * n), at least 1
        PassKind::Background => (0, eligible.div_ceil(4).max(1)),
    };
    let final_min = if mentioned == 0 {
        base_min
    } else {
        base_min.max(mentioned)
    };
    (final_min, base_max.max(final_min))
}

/// Choose who replies: every eligible mentioned participant first, in
/// discovery order, then a random sample of the rest.
///
/// An empty eligible set yields an empty result.
pub fn select_responders<R: Rng>(
    eligible: &[&Participant],
    mentions: &[String],
    kind: PassKind,
    rng: &mut R,
) -> Vec<ResponderDecision> {
    if eligible.is_empty() {
        return Vec::new();
    }

    let mut mentioned: Vec<&Participant> = Vec::new();
    for p in eligible.iter().copied() {
        if mentions.contains(&p.normalized_alias) && !mentioned.iter().any(|m| m.id == p.id) {
            mentioned.push(p);
        }
    }

    let (final_min, final_max) = bounds(eligible.len(), mentioned.len(), kind);

    let mut pool: Vec<&Participant> = eligible
        .iter()
        .copied()
        .filter(|p| !mentioned.iter().any(|m| m.id == p.id))
        .collect();

    let lo = final_min.saturating_sub(mentioned.len());
    let hi = final_max.saturating_sub(mentioned.len());
    let additional_count = rng.gen_range(lo..=hi).min(pool.len());

    pool.shuffle(rng);

    mentioned
        .iter()
        .map(|p| (*p, true))
        .chain(pool.into_iter().take(additional_count).map(|p| (p, false)))
        .enumerate()
        .map(|(index, (p, was_mentioned))| ResponderDecision {
            participant_id: p.id.clone(),
            index,
            mentioned: was_mentioned,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn roster(n: usize) -> Vec<Participant> {
        (0..n)
            .map(|i| Participant::new(format!("p{i}"), format!("agent{i}")))
            .collect()
    }

    #[test]
    fn test_bounds() {
        assert_eq!(bounds(3, 0, PassKind::Human), (1, 2));
        assert_eq!(bounds(10, 0, PassKind::Human), (1, 5));
        assert_eq!(bounds(10, 0, PassKind::Background), (0, 3));
        assert_eq!(bounds(2, 0, PassKind::Background), (0, 1));
        assert_eq!(bounds(3, 3, PassKind::Human), (3, 3));
        assert_eq!(bounds(8, 1, PassKind::Background), (1, 2));
    }

    #[test]
    fn test_empty_eligible_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = select_responders(&[], &["x".into()], PassKind::Human, &mut rng);
        assert!(out.is_empty());
    }

    #[test]
    fn test_single_mention_comes_first() {
        let ps = roster(3);
        let eligible: Vec<&Participant> = ps.iter().collect();
        let mentions = vec!["agent1".to_string()];
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = select_responders(&eligible, &mentions, PassKind::Human, &mut rng);
            assert_eq!(out[0].participant_id, "p1");
            assert!(out[0].mentioned);
            assert!(out.len() >= 1 && out.len() <= 3);
            assert!(out[1..].iter().all(|d| !d.mentioned));
        }
    }

    #[test]
    fn test_no_duplicates_and_size_within_bounds() {
        let ps = roster(9);
        let eligible: Vec<&Participant> = ps.iter().collect();
        let mentions = vec!["agent4".to_string(), "agent2".to_string(), "agent4".to_string()];
        for kind in [PassKind::Human, PassKind::Background] {
            for seed in 0..200 {
                let mut rng = StdRng::seed_from_u64(seed);
                let out = select_responders(&eligible, &mentions, kind, &mut rng);
                let ids: HashSet<_> = out.iter().map(|d| d.participant_id.clone()).collect();
                assert_eq!(ids.len(), out.len(), "no duplicate responders");
                assert!(ids.contains("p4") && ids.contains("p2"));
                // Discovery order follows the eligible list, not the mention text.
                assert_eq!(out[0].participant_id, "p2");
                assert_eq!(out[1].participant_id, "p4");
                let (min, max) = bounds(9, 2, kind);
                assert!(out.len() >= min && out.len() <= max);
                for (i, d) in out.iter().enumerate() {
                    assert_eq!(d.index, i);
                }
            }
        }
    }

    #[test]
    fn test_human_pass_always_has_a_responder() {
        let ps = roster(4);
        let eligible: Vec<&Participant> = ps.iter().collect();
        for seed in 0..100 {
            let mut rng = StdRng::seed_from_u64(seed);
            let out = select_responders(&eligible, &[], PassKind::Human, &mut rng);
            assert!(!out.is_empty());
            assert!(out.len() <= 2);
        }
    }

    #[test]
    fn test_eligibility() {
        let mut p = Participant::new("p", "a");
        assert!(is_eligible(&p, PassKind::Human));
        p.just_responded = true;
        assert!(is_eligible(&p, PassKind::Human));
        assert!(!is_eligible(&p, PassKind::Background));
        p.just_responded = false;
        p.generating = true;
        assert!(!is_eligible(&p, PassKind::Human));
        p.generating = false;
        p.active = false;
        assert!(!is_eligible(&p, PassKind::Human));
    }
}
