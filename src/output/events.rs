//! Plain listing of every stored event for the `--list` mode

use crate::storage::StoredEvent;

/// Renders one event as an indented block, skipping empty fields
pub fn format_event(event: &StoredEvent) -> String {
    let mut lines = vec![format!("#{} {}", event.id, event.title)];

    let fields = [
        ("When", &event.date_text),
        ("Where", &event.location),
        ("Organizer", &event.organizer),
        ("Price", &event.price),
    ];
    for (label, value) in fields {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            lines.push(format!("    {}: {}", label, value));
        }
    }

    lines.push(format!("    {}", event.source_url));
    lines.join("\n")
}

/// Prints every event to stdout
pub fn print_events(events: &[StoredEvent]) {
    if events.is_empty() {
        println!("No events stored yet.");
        return;
    }

    println!("=== Stored Events ({}) ===\n", events.len());
    for event in events {
        println!("{}\n", format_event(event));
    }
}
