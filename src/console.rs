//! Console transport: stdin lines in, rendered events out.

use chorus_core::{
    message::SenderKind,
    participant::{normalize, Participant},
};
use chorus_scheduler::{ChorusEvent, Orchestrator};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// One line of console input.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Say(String),
    Topic(String),
    Wake,
    Sleep,
    Status,
    Mute(String),
    Unmute(String),
    Quit,
    Help,
    Unknown(String),
    Empty,
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Say(line.to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim().to_string()),
        None => (rest, String::new()),
    };
    match name.to_lowercase().as_str() {
        "topic" if !arg.is_empty() => Command::Topic(arg),
        "wake" => Command::Wake,
        "sleep" => Command::Sleep,
        "status" => Command::Status,
        "mute" if !arg.is_empty() => Command::Mute(arg),
        "unmute" if !arg.is_empty() => Command::Unmute(arg),
        "quit" | "exit" => Command::Quit,
        "help" => Command::Help,
        _ => Command::Unknown(line.to_string()),
    }
}

const HELP: &str = "commands: /topic <text>, /wake, /sleep, /status, /mute <alias>, /unmute <alias>, /quit";

/// Read stdin until EOF, `/quit`, or Ctrl-C.
pub async fn run(orch: Arc<Orchestrator>) -> anyhow::Result<()> {
    let labels: HashMap<String, String> = orch
        .participants()
        .await
        .iter()
        .map(|p| (p.id.clone(), p.label()))
        .collect();
    let mut events = orch.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = render(&event, &labels) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(n)) => warn!("console: skipped {n} events"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        match parse_command(&line) {
            Command::Empty => {}
            Command::Say(text) => {
                if let Err(e) = orch.ingest_human(&text).await {
                    println!("! {e}");
                }
            }
            Command::Topic(topic) => {
                let author = orch.config().chorus.human_label.clone();
                if let Err(e) = orch.change_topic(&topic, &author).await {
                    println!("! {e}");
                }
            }
            Command::Wake => orch.wake().await,
            Command::Sleep => orch.sleep().await,
            Command::Status => {
                let status = orch.status().await;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            Command::Mute(alias) => set_active(&orch, &alias, false).await,
            Command::Unmute(alias) => set_active(&orch, &alias, true).await,
            Command::Help => println!("{HELP}"),
            Command::Unknown(cmd) => println!("! unknown command {cmd}; {HELP}"),
            Command::Quit => break,
        }
    }

    printer.abort();
    Ok(())
}

async fn set_active(orch: &Orchestrator, alias: &str, active: bool) {
    let Some(id) = find_participant(&orch.participants().await, alias) else {
        println!("! no participant called '{alias}'");
        return;
    };
    match orch.set_active(&id, active).await {
        Ok(()) => println!("* {alias} {}", if active { "unmuted" } else { "muted" }),
        Err(e) => println!("! {e}"),
    }
}

fn find_participant(participants: &[Participant], alias: &str) -> Option<String> {
    let wanted = normalize(alias);
    participants
        .iter()
        .find(|p| p.normalized_alias == wanted || p.id == alias)
        .map(|p| p.id.clone())
}

/// Console line for an event, if it is worth showing.
fn render(event: &ChorusEvent, labels: &HashMap<String, String>) -> Option<String> {
    match event {
        ChorusEvent::ResponseProduced { message } => {
            let label = message
                .sender_id
                .as_ref()
                .and_then(|id| labels.get(id))
                .unwrap_or(&message.sender);
            Some(format!("{label}: {}", message.content))
        }
        ChorusEvent::MessageAccepted { message } if message.kind == SenderKind::System => {
            Some(format!("* {}", message.content))
        }
        ChorusEvent::GenerationStarted { participant_id, alias } => {
            let label = labels.get(participant_id).unwrap_or(alias);
            Some(format!("  ({label} is typing...)"))
        }
        ChorusEvent::Slept { .. } => {
            Some("-- everyone went quiet; say something (or /wake) to restart --".into())
        }
        ChorusEvent::Woke { .. } => Some("-- the room is awake --".into()),
        ChorusEvent::Error {
            participant_id,
            error,
        } => Some(match participant_id {
            Some(id) => format!("! {id}: {error}"),
            None => format!("! {error}"),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_core::message::Message;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("  hello there "), Command::Say("hello there".into()));
        assert_eq!(parse_command("/topic  tide pools"), Command::Topic("tide pools".into()));
        assert_eq!(parse_command("/TOPIC"), Command::Unknown("/TOPIC".into()));
        assert_eq!(parse_command("/wake"), Command::Wake);
        assert_eq!(parse_command("/mute claude"), Command::Mute("claude".into()));
        assert_eq!(parse_command("/exit"), Command::Quit);
        assert_eq!(parse_command("   "), Command::Empty);
    }

    #[test]
    fn test_render_reply_uses_label() {
        let labels = HashMap::from([("p1".to_string(), "🤖 claude".to_string())]);
        let event = ChorusEvent::ResponseProduced {
            message: Message::agent("p1", "claude", "hi"),
        };
        assert_eq!(render(&event, &labels).as_deref(), Some("🤖 claude: hi"));
    }

    #[test]
    fn test_render_skips_human_echo() {
        let event = ChorusEvent::MessageAccepted {
            message: Message::human("You", "hi"),
        };
        assert_eq!(render(&event, &HashMap::new()), None);
        let topic = ChorusEvent::MessageAccepted {
            message: Message::system("You changed the topic to: rust"),
        };
        assert_eq!(
            render(&topic, &HashMap::new()).as_deref(),
            Some("* You changed the topic to: rust")
        );
    }

    #[test]
    fn test_find_participant_by_alias_or_id() {
        let roster = vec![Participant::new("p1", "Claude"), Participant::new("p2", "gpt")];
        assert_eq!(find_participant(&roster, "@claude").as_deref(), Some("p1"));
        assert_eq!(find_participant(&roster, "p2").as_deref(), Some("p2"));
        assert_eq!(find_participant(&roster, "nobody"), None);
    }
}
