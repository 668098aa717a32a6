//! Interaction strategy: the stance a responder takes and whom it addresses.
//!
//! Stances are drawn from a weighted distribution that is nudged by context.
//! Weights are adjusted additively and NOT renormalized; when boosts push the
//! total above 1.0, the walk simply stops earlier and the later stances in
//! declaration order lose probability mass.

use chorus_core::{context::ContextEntry, message::SenderKind, participant::Participant};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::selector::{PassKind, Trigger};

/// How many recent context entries the strategy looks at.
pub const RECENT_WINDOW: usize = 8;

/// Chance of mentioning a recent participant when no rule forces a mention.
pub const MENTION_PROBABILITY: f64 = 0.35;

/// Distinct recent authors considered for an unprompted mention.
const MAX_RECENT_AUTHORS: usize = 3;

/// Agent-authored entries among the recent window that count as "busy".
const BUSY_AGENT_ENTRIES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stance {
    AgreeExpand,
    Challenge,
    Redirect,
    Question,
    Direct,
}

impl Stance {
    /// Declaration order; the weighted walk follows it.
    pub const ALL: [Stance; 5] = [
        Stance::AgreeExpand,
        Stance::Challenge,
        Stance::Redirect,
        Stance::Question,
        Stance::Direct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgreeExpand => "agree-expand",
            Self::Challenge => "challenge",
            Self::Redirect => "redirect",
            Self::Question => "question",
            Self::Direct => "direct",
        }
    }

    fn instruction(&self) -> &'static str {
        match self {
            Self::AgreeExpand => {
                "Build on the previous point: agree with it and extend it with a new idea, example, or detail."
            }
            Self::Challenge => {
                "Offer a respectful counterpoint: politely push back on an assumption or point out a weakness in what was just said."
            }
            Self::Redirect => {
                "Pivot the conversation: connect what was said to a related but different angle or topic."
            }
            Self::Question => {
                "Ask one probing, specific question that digs deeper into what was just said."
            }
            Self::Direct => "Reply plainly and naturally to the latest message.",
        }
    }
}

impl std::fmt::Display for Stance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weights indexed in [`Stance::ALL`] order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StanceWeights([f64; 5]);

impl Default for StanceWeights {
    fn default() -> Self {
        Self([0.30, 0.25, 0.15, 0.20, 0.10])
    }
}

impl StanceWeights {
    pub fn get(&self, stance: Stance) -> f64 {
        self.0[Self::slot(stance)]
    }

    pub fn add(&mut self, stance: Stance, delta: f64) {
        self.0[Self::slot(stance)] += delta;
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }

    fn slot(stance: Stance) -> usize {
        Stance::ALL.iter().position(|s| *s == stance).unwrap_or(4)
    }

    /// Base weights adjusted for the trigger and the recent conversation.
    pub fn contextual(trigger_kind: SenderKind, pass: PassKind, recent: &[&ContextEntry]) -> Self {
        let mut weights = Self::default();
        if trigger_kind == SenderKind::Agent && pass == PassKind::Background {
            weights.add(Stance::Challenge, 0.20);
            weights.add(Stance::AgreeExpand, 0.15);
        }
        let agent_entries = recent
            .iter()
            .rev()
            .take(RECENT_WINDOW)
            .filter(|e| e.role == SenderKind::Agent)
            .count();
        if agent_entries >= BUSY_AGENT_ENTRIES {
            weights.add(Stance::Redirect, 0.10);
            weights.add(Stance::Question, 0.10);
        }
        weights
    }

    /// Walk the stances in declaration order; the first whose cumulative
    /// weight reaches `r` wins. Falls back to `Direct`.
    pub fn pick(&self, r: f64) -> Stance {
        let mut cumulative = 0.0;
        for stance in Stance::ALL {
            cumulative += self.get(stance);
            if cumulative >= r {
                return stance;
            }
        }
        Stance::Direct
    }
}

/// Whom a reply addresses by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MentionTarget {
    Human { label: String },
    Participant { id: String, alias: String },
}

impl MentionTarget {
    /// `@handle` form used in directives.
    pub fn handle(&self) -> String {
        match self {
            Self::Human { label } => format!("@{label}"),
            Self::Participant { alias, .. } => format!("@{alias}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StrategyDecision {
    pub stance: Stance,
    pub should_mention: bool,
    pub target: Option<MentionTarget>,
    pub directive: String,
}

/// Inputs for one responder's strategy.
pub struct StrategyInput<'a> {
    pub responder: &'a Participant,
    /// The responder was mentioned by the trigger.
    pub mentioned: bool,
    pub trigger: &'a Trigger,
    pub pass: PassKind,
    /// Recent context, oldest first; only the last [`RECENT_WINDOW`] are read.
    pub recent: &'a [&'a ContextEntry],
    pub participants: &'a [Participant],
}

/// Choose a stance and an optional mention target for one responder.
pub fn decide<R: Rng>(input: &StrategyInput<'_>, rng: &mut R) -> StrategyDecision {
    let stance = if input.mentioned {
        Stance::Direct
    } else {
        let weights = StanceWeights::contextual(input.trigger.kind, input.pass, input.recent);
        weights.pick(rng.gen::<f64>())
    };

    let target = mention_target(input, rng);
    let directive = build_directive(stance, input.mentioned, &input.trigger.sender, target.as_ref());

    StrategyDecision {
        stance,
        should_mention: target.is_some(),
        target,
        directive,
    }
}

fn mention_target<R: Rng>(input: &StrategyInput<'_>, rng: &mut R) -> Option<MentionTarget> {
    let trigger = input.trigger;

    if trigger.kind == SenderKind::Human && input.pass == PassKind::Human {
        return Some(MentionTarget::Human {
            label: trigger.sender.clone(),
        });
    }

    let author_is_other = trigger.kind == SenderKind::Agent
        && trigger
            .sender_id
            .as_deref()
            .is_some_and(|id| id != input.responder.id);
    if input.mentioned && author_is_other {
        return trigger
            .sender_id
            .as_deref()
            .and_then(|id| participant_target(id, input.participants));
    }

    if rng.gen::<f64>() >= MENTION_PROBABILITY {
        return None;
    }
    recent_authors(input.recent, &input.responder.id)
        .into_iter()
        .next()
        .and_then(|id| participant_target(&id, input.participants))
}

/// Distinct other agent authors, most recent first.
fn recent_authors(recent: &[&ContextEntry], exclude_id: &str) -> Vec<String> {
    let mut authors: Vec<String> = Vec::new();
    for entry in recent.iter().rev().take(RECENT_WINDOW) {
        if entry.role != SenderKind::Agent {
            continue;
        }
        let Some(ref id) = entry.sender_id else {
            continue;
        };
        if id != exclude_id && !authors.contains(id) {
            authors.push(id.clone());
            if authors.len() == MAX_RECENT_AUTHORS {
                break;
            }
        }
    }
    authors
}

fn participant_target(id: &str, participants: &[Participant]) -> Option<MentionTarget> {
    participants
        .iter()
        .find(|p| p.id == id)
        .map(|p| MentionTarget::Participant {
            id: p.id.clone(),
            alias: p.alias.clone(),
        })
}

/// Turn a stance into a directive for the generator.
pub fn build_directive(
    stance: Stance,
    mentioned: bool,
    trigger_sender: &str,
    target: Option<&MentionTarget>,
) -> String {
    let mut lines = Vec::new();
    if mentioned {
        lines.push(format!(
            "You were addressed directly by name. You must respond directly to what {trigger_sender} said to you."
        ));
    }
    lines.push(stance.instruction().to_string());
    if let Some(target) = target {
        lines.push(format!(
            "Address {} by name somewhere in your reply.",
            target.handle()
        ));
    }
    lines.push("Keep it to a few sentences and do not prefix your reply with your own name.".into());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_core::message::Message;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn roster() -> Vec<Participant> {
        vec![
            Participant::new("p1", "claude"),
            Participant::new("p2", "gpt"),
            Participant::new("p3", "gem"),
        ]
    }

    fn entry(msg: Message) -> ContextEntry {
        ContextEntry::from(&msg)
    }

    #[test]
    fn test_base_weights_sum_to_one() {
        assert!((StanceWeights::default().total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_pick_walks_in_declared_order() {
        let w = StanceWeights::default();
        assert_eq!(w.pick(0.0), Stance::AgreeExpand);
        assert_eq!(w.pick(0.30), Stance::AgreeExpand);
        assert_eq!(w.pick(0.31), Stance::Challenge);
        assert_eq!(w.pick(0.56), Stance::Redirect);
        assert_eq!(w.pick(0.85), Stance::Question);
        assert_eq!(w.pick(0.95), Stance::Direct);
        assert_eq!(w.pick(1.5), Stance::Direct, "nothing reaches r: default");
    }

    #[test]
    fn test_background_agent_trigger_boosts_without_renormalizing() {
        let w = StanceWeights::contextual(SenderKind::Agent, PassKind::Background, &[]);
        assert!((w.get(Stance::Challenge) - 0.45).abs() < 1e-9);
        assert!((w.get(Stance::AgreeExpand) - 0.45).abs() < 1e-9);
        assert!((w.total() - 1.35).abs() < 1e-9);
        // AgreeExpand + Challenge already cover [0, 0.9]; Direct only wins at the very top.
        assert_eq!(w.pick(0.89), Stance::Challenge);
        assert_eq!(w.pick(0.99), Stance::Redirect);
    }

    #[test]
    fn test_busy_agent_context_boosts_redirect_and_question() {
        let entries: Vec<ContextEntry> = (0..3)
            .map(|i| entry(Message::agent(format!("p{i}"), "x", "talk")))
            .collect();
        let refs: Vec<&ContextEntry> = entries.iter().collect();
        let w = StanceWeights::contextual(SenderKind::Human, PassKind::Human, &refs);
        assert!((w.get(Stance::Redirect) - 0.25).abs() < 1e-9);
        assert!((w.get(Stance::Question) - 0.30).abs() < 1e-9);

        let too_few = StanceWeights::contextual(SenderKind::Human, PassKind::Human, &refs[..2]);
        assert_eq!(too_few, StanceWeights::default());
    }

    #[test]
    fn test_mentioned_forces_direct() {
        let ps = roster();
        let trigger = Trigger::from(&Message::human("Ada", "@claude hi").with_mentions(vec!["claude".into()]));
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let d = decide(
                &StrategyInput {
                    responder: &ps[0],
                    mentioned: true,
                    trigger: &trigger,
                    pass: PassKind::Human,
                    recent: &[],
                    participants: &ps,
                },
                &mut rng,
            );
            assert_eq!(d.stance, Stance::Direct);
            assert!(d.directive.contains("addressed directly"));
        }
    }

    #[test]
    fn test_human_trigger_mentions_human() {
        let ps = roster();
        let trigger = Trigger::from(&Message::human("Ada", "thoughts?"));
        let mut rng = StdRng::seed_from_u64(3);
        let d = decide(
            &StrategyInput {
                responder: &ps[1],
                mentioned: false,
                trigger: &trigger,
                pass: PassKind::Human,
                recent: &[],
                participants: &ps,
            },
            &mut rng,
        );
        assert!(d.should_mention);
        assert_eq!(
            d.target,
            Some(MentionTarget::Human {
                label: "Ada".into()
            })
        );
        assert!(d.directive.contains("@Ada"));
    }

    #[test]
    fn test_mentioned_by_other_agent_mentions_author() {
        let ps = roster();
        let trigger = Trigger::from(&Message::agent("p2", "gpt", "@claude agree?").with_mentions(vec!["claude".into()]));
        let mut rng = StdRng::seed_from_u64(9);
        let d = decide(
            &StrategyInput {
                responder: &ps[0],
                mentioned: true,
                trigger: &trigger,
                pass: PassKind::Background,
                recent: &[],
                participants: &ps,
            },
            &mut rng,
        );
        assert_eq!(
            d.target,
            Some(MentionTarget::Participant {
                id: "p2".into(),
                alias: "gpt".into()
            })
        );
    }

    #[test]
    fn test_unresolvable_author_suppresses_mention() {
        let ps = roster();
        let trigger = Trigger::from(&Message::agent("gone", "ghost", "@claude hi").with_mentions(vec!["claude".into()]));
        let mut rng = StdRng::seed_from_u64(1);
        let d = decide(
            &StrategyInput {
                responder: &ps[0],
                mentioned: true,
                trigger: &trigger,
                pass: PassKind::Background,
                recent: &[],
                participants: &ps,
            },
            &mut rng,
        );
        assert!(!d.should_mention);
        assert!(d.target.is_none());
    }

    #[test]
    fn test_random_mention_targets_most_recent_other_author() {
        let ps = roster();
        let entries = vec![
            entry(Message::agent("p3", "gem", "one")),
            entry(Message::agent("p2", "gpt", "two")),
            entry(Message::agent("p1", "claude", "mine")),
        ];
        let refs: Vec<&ContextEntry> = entries.iter().collect();
        assert_eq!(recent_authors(&refs, "p1"), vec!["p2", "p3"]);

        let trigger = Trigger::from(&entries[2]);
        let mut mentioned = 0;
        for seed in 0..400 {
            let mut rng = StdRng::seed_from_u64(seed);
            let d = decide(
                &StrategyInput {
                    responder: &ps[0],
                    mentioned: false,
                    trigger: &trigger,
                    pass: PassKind::Background,
                    recent: &refs,
                    participants: &ps,
                },
                &mut rng,
            );
            if let Some(target) = d.target {
                mentioned += 1;
                assert_eq!(
                    target,
                    MentionTarget::Participant {
                        id: "p2".into(),
                        alias: "gpt".into()
                    }
                );
            }
        }
        // Roughly 35% of 400; generous band.
        assert!(mentioned > 80 && mentioned < 200, "got {mentioned}");
    }

    #[test]
    fn test_directive_encodes_each_stance() {
        let texts: Vec<String> = Stance::ALL
            .iter()
            .map(|s| build_directive(*s, false, "Ada", None))
            .collect();
        assert!(texts[0].contains("agree"));
        assert!(texts[1].contains("counterpoint"));
        assert!(texts[2].contains("Pivot"));
        assert!(texts[3].contains("question"));
        assert!(texts[4].contains("plainly"));
        for t in &texts {
            assert!(!t.contains("addressed directly"));
        }
    }
}
