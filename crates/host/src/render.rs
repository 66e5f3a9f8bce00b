//! Print store updates to stdout

use lia_agent::{AssistantSession, ConversationUpdate, VisualUpdate};
use lia_core::{EventTone, VisualEvent, VisualPayload};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub fn describe_visual(event: &VisualEvent) -> String {
    let prefix = match event.tone {
        EventTone::Normal => "",
        EventTone::Notice => "(notice) ",
        EventTone::Error => "(error) ",
    };
    let body = match &event.payload {
        VisualPayload::Text { text } => text.clone(),
        VisualPayload::Image { url, caption } => match caption {
            Some(caption) => format!("[image] {} ({})", caption, url),
            None => format!("[image] {}", url),
        },
        VisualPayload::Video { url, caption } => match caption {
            Some(caption) => format!("[video] {} ({})", caption, url),
            None => format!("[video] {}", url),
        },
        VisualPayload::Chart { title, .. } => {
            format!("[chart] {}", title.as_deref().unwrap_or("untitled"))
        },
        VisualPayload::Search {
            query,
            results,
            summary,
        } => {
            let mut lines = vec![format!("[search] {}", query)];
            if let Some(summary) = summary {
                lines.push(format!("  {}", summary));
            }
            for hit in results {
                lines.push(format!("  - {} <{}>", hit.title, hit.url));
            }
            lines.join("\n")
        },
    };
    format!("{}{}: {}", prefix, event.role, body)
}

/// Spawn printers for messages, visual events, avatar and status
pub fn spawn_printers(session: &Arc<AssistantSession>) -> Vec<JoinHandle<()>> {
    let mut tasks = Vec::new();

    let mut messages = session.subscribe_messages();
    tasks.push(tokio::spawn(async move {
        loop {
            match messages.recv().await {
                Ok(ConversationUpdate::Appended { scope, message }) => {
                    println!("[{}] {}: {}", scope, message.role, message.content);
                    for attachment in &message.attachments {
                        println!("[{}]   + {} ({} bytes)", scope, attachment.name, attachment.size_bytes);
                    }
                },
                Ok(ConversationUpdate::Typing { scope, is_typing: true }) => {
                    println!("[{}] …", scope);
                },
                Ok(_) => {},
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Message printer lagged");
                },
                Err(RecvError::Closed) => break,
            }
        }
    }));

    let mut visuals = session.subscribe_visuals();
    tasks.push(tokio::spawn(async move {
        loop {
            match visuals.recv().await {
                Ok(VisualUpdate::Appended(event)) => println!("» {}", describe_visual(&event)),
                Ok(VisualUpdate::Cleared) => println!("» (history cleared)"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Visual printer lagged");
                },
                Err(RecvError::Closed) => break,
            }
        }
    }));

    let mut avatar = session.subscribe_avatar();
    tasks.push(tokio::spawn(async move {
        while avatar.changed().await.is_ok() {
            let state = avatar.borrow_and_update().clone();
            println!("  (avatar: {})", state);
        }
    }));

    let mut status = session.subscribe_status();
    tasks.push(tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let line = status.borrow_and_update().clone();
            if !line.is_empty() {
                println!("  ({})", line);
            }
        }
    }));

    tasks
}

#[cfg(test)]
mod tests {
    use super::*;
    use lia_core::SearchHit;

    #[test]
    fn test_describe_search() {
        let event = VisualEvent::agent(VisualPayload::Search {
            query: "tides".to_string(),
            results: vec![SearchHit {
                title: "Tide tables".to_string(),
                url: "https://tides.example.com".to_string(),
                snippet: String::new(),
            }],
            summary: None,
        });
        assert_eq!(
            describe_visual(&event),
            "agent: [search] tides\n  - Tide tables <https://tides.example.com>"
        );
    }

    #[test]
    fn test_describe_error() {
        assert_eq!(
            describe_visual(&VisualEvent::error("boom")),
            "(error) agent: boom"
        );
    }
}
