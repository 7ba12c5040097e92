use parley_lib::conversations::{Conversation, Message, Role};

/// ANSI color codes
pub struct Color;

impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

/// Wrap `text` in `color` when colors are enabled
pub fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// Render a conversation transcript for the terminal
pub fn render_conversation(conversation: &Conversation, use_color: bool) -> String {
    let mut lines = Vec::new();

    lines.push(paint(&conversation.title, Color::BOLD, use_color));
    let mut meta = format!(
        "created {}  updated {}",
        conversation.created_at.format("%Y-%m-%d %H:%M"),
        conversation.updated_at.format("%Y-%m-%d %H:%M"),
    );
    if let Some(model) = &conversation.model {
        meta.push_str(&format!("  model {}", model));
    }
    lines.push(paint(&meta, Color::GRAY, use_color));

    if let Some(prompt) = &conversation.system_prompt {
        lines.push(String::new());
        lines.push(paint("system", Color::YELLOW, use_color));
        lines.extend(wrap_lines(prompt, "  ", 80));
    }

    for message in &conversation.messages {
        lines.push(String::new());
        lines.extend(render_message(message, use_color));
    }

    if conversation.messages.is_empty() {
        lines.push(String::new());
        lines.push(paint("(no messages)", Color::DIM, use_color));
    }

    lines.join("\n")
}

fn render_message(message: &Message, use_color: bool) -> Vec<String> {
    let (label, color) = match message.role {
        Role::System => ("system", Color::YELLOW),
        Role::User => ("you", Color::GREEN),
        Role::Assistant => ("assistant", Color::CYAN),
        Role::Tool => ("tool", Color::GRAY),
    };

    let mut lines = vec![format!(
        "{} {}",
        paint(label, color, use_color),
        paint(&message.timestamp.format("%H:%M").to_string(), Color::GRAY, use_color),
    )];
    lines.extend(wrap_lines(&message.content, "  ", 80));

    if let Some(calls) = &message.tool_calls {
        for call in calls {
            lines.push(paint(&format!("  -> {}", call.tool), Color::DIM, use_color));
        }
    }
    lines
}

/// Simple word-wrapping for terminal output
fn wrap_lines(text: &str, prefix: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let effective_width = max_width.saturating_sub(prefix.len());

    for line in text.lines() {
        if line.len() <= effective_width {
            lines.push(format!("{}{}", prefix, line));
            continue;
        }
        let mut current_line = String::new();
        for word in line.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_line.len() + 1 + word.len() <= effective_width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(format!("{}{}", prefix, current_line));
                current_line = word.to_string();
            }
        }
        if !current_line.is_empty() {
            lines.push(format!("{}{}", prefix, current_line));
        }
    }

    lines
}
