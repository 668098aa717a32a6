//! `@mention` extraction and participant resolution.

use chorus_core::participant::Participant;

pub use chorus_core::participant::normalize;

/// Scan `text` for `@token` occurrences and return normalized tokens.
///
/// At each `@`, the known multi-word names are tried first (longest match
/// wins, case-insensitive, must end on a word boundary); otherwise the token
/// is the contiguous non-whitespace run after the `@`. An `@` only starts a
/// mention at the beginning of the text or after a non-alphanumeric
/// character, so e-mail addresses are not mentions.
pub fn extract_mentions(text: &str, known_names: &[&str]) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut prev: Option<char> = None;

    for (i, c) in text.char_indices() {
        let at_boundary = prev.map_or(true, |p| !p.is_alphanumeric());
        prev = Some(c);
        if c != '@' || !at_boundary {
            continue;
        }

        let rest = &text[i + c.len_utf8()..];
        let token = longest_known_prefix(rest, known_names)
            .map(normalize)
            .unwrap_or_else(|| {
                let run = rest.split(char::is_whitespace).next().unwrap_or_default();
                normalize(run)
            });

        if !token.is_empty() && !found.contains(&token) {
            found.push(token);
        }
    }
    found
}

fn longest_known_prefix<'a>(rest: &str, known_names: &[&'a str]) -> Option<&'a str> {
    known_names
        .iter()
        .filter(|name| !name.trim().is_empty())
        .filter(|name| matches_prefix_ci(rest, name))
        .max_by_key(|name| name.chars().count())
        .copied()
}

/// Case-insensitive prefix match that must end on a non-alphanumeric boundary.
fn matches_prefix_ci(rest: &str, name: &str) -> bool {
    let mut chars = rest.chars();
    for nc in name.chars() {
        match chars.next() {
            Some(rc) if rc.to_lowercase().eq(nc.to_lowercase()) => {}
            _ => return false,
        }
    }
    chars.next().map_or(true, |next| !next.is_alphanumeric())
}

/// Resolve a handle against the participant table.
///
/// Tries normalized alias, then display name, then raw name, then model key,
/// each across all participants before moving to the next key.
pub fn resolve<'a>(token: &str, participants: &'a [Participant]) -> Option<&'a Participant> {
    let wanted = normalize(token);
    if wanted.is_empty() {
        return None;
    }

    let keys: [fn(&Participant) -> Option<String>; 4] = [
        |p| Some(p.normalized_alias.clone()),
        |p| p.display_name.as_deref().map(normalize),
        |p| p.name.as_deref().map(normalize),
        |p| p.model.as_deref().map(normalize),
    ];

    keys.iter().find_map(|key| {
        participants
            .iter()
            .find(|p| key(p).is_some_and(|k| !k.is_empty() && k == wanted))
    })
}

/// Extract mentions from `text` and map each to the participant it resolves to.
///
/// Resolved tokens become the participant's normalized alias; unresolved
/// tokens (the human, unknown names) are kept as-is.
pub fn resolve_mentions(text: &str, participants: &[Participant]) -> Vec<String> {
    let names: Vec<&str> = participants
        .iter()
        .filter_map(|p| p.display_name.as_deref())
        .chain(participants.iter().filter_map(|p| p.name.as_deref()))
        .filter(|n| n.contains(char::is_whitespace))
        .collect();

    let mut out: Vec<String> = Vec::new();
    for token in extract_mentions(text, &names) {
        let resolved = resolve(&token, participants)
            .map(|p| p.normalized_alias.clone())
            .unwrap_or(token);
        if !out.contains(&resolved) {
            out.push(resolved);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> Vec<Participant> {
        let mut gpt = Participant::new("p2", "gpt");
        gpt.model = Some("gpt-4o".into());
        let mut gem = Participant::new("p3", "gem");
        gem.name = Some("Gemini Flash".into());
        vec![
            Participant::new("p1", "claude").with_display_name("Claude Sonnet"),
            gpt,
            gem,
        ]
    }

    #[test]
    fn test_mention_with_trailing_punctuation() {
        let ps = roster();
        assert_eq!(extract_mentions("@Claude, what do you think?", &[]), vec!["claude"]);
        let p = resolve("Claude,", &ps).unwrap();
        assert_eq!(p.id, "p1");
        assert_eq!(resolve_mentions("@CLAUDE!!", &ps), vec!["claude"]);
    }

    #[test]
    fn test_multi_word_display_name_longest_match() {
        let names = ["Claude", "Claude Sonnet"];
        assert_eq!(
            extract_mentions("hey @claude sonnet are you there", &names),
            vec!["claudesonnet"]
        );
        // Without the boundary the longer name does not match.
        assert_eq!(
            extract_mentions("hey @claude sonnets", &names),
            vec!["claude"]
        );
    }

    #[test]
    fn test_display_name_resolves_to_alias() {
        let ps = roster();
        assert_eq!(
            resolve_mentions("@Claude Sonnet and @gemini flash, thoughts?", &ps),
            vec!["claude", "gem"]
        );
    }

    #[test]
    fn test_resolve_by_model_key() {
        let ps = roster();
        assert_eq!(resolve("@GPT-4o", &ps).unwrap().id, "p2");
        assert!(resolve("nobody", &ps).is_none());
        assert!(resolve("!!", &ps).is_none());
    }

    #[test]
    fn test_alias_wins_over_other_keys() {
        let mut a = Participant::new("a", "nova");
        a.model = Some("orion".into());
        let b = Participant::new("b", "orion");
        let ps = vec![a, b];
        assert_eq!(resolve("orion", &ps).unwrap().id, "b");
    }

    #[test]
    fn test_email_is_not_a_mention() {
        assert!(extract_mentions("mail me at ada@example.com", &[]).is_empty());
    }

    #[test]
    fn test_duplicates_and_unknown_tokens() {
        let ps = roster();
        assert_eq!(
            resolve_mentions("@gpt @GPT @You @", &ps),
            vec!["gpt", "you"]
        );
    }
}
