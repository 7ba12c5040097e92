use anyhow::{Context, Result};
use uuid::Uuid;

use parley_lib::conversations::ConversationSummary;

use crate::app::App;
use crate::render::terminal::{paint, render_conversation, Color};
use crate::OutputFormat;

pub fn run_list(
    app: &App,
    token: Option<&str>,
    all: bool,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let (summaries, next_token) = if all {
        let summaries = app
            .conversations
            .list_all()
            .context("Failed to list conversations")?;
        (summaries, None)
    } else {
        let page = app
            .conversations
            .list_page(token)
            .context("Failed to list conversations")?;
        (page.conversations, page.next_token)
    };

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "conversations": summaries,
                "nextToken": next_token,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Plain => {
            if summaries.is_empty() {
                println!("No conversations.");
            }
            for summary in &summaries {
                print_summary(summary, use_color);
            }
            if let Some(next) = next_token {
                println!();
                println!(
                    "{} --token {}",
                    paint("More:", Color::DIM, use_color),
                    next
                );
            }
        }
    }
    Ok(())
}

fn print_summary(summary: &ConversationSummary, use_color: bool) {
    println!(
        "{}  {}  {}",
        paint(&summary.id.to_string(), Color::GRAY, use_color),
        paint(
            &summary.updated_at.format("%Y-%m-%d %H:%M").to_string(),
            Color::DIM,
            use_color
        ),
        summary.title,
    );
    println!("    {} messages", summary.message_count);
}

pub fn run_show(app: &App, id: Uuid, format: &OutputFormat, use_color: bool) -> Result<()> {
    let conversation = app
        .conversations
        .get(id)
        .with_context(|| format!("Failed to read conversation {}", id))?
        .with_context(|| format!("Conversation {} not found", id))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&conversation)?),
        OutputFormat::Plain => println!("{}", render_conversation(&conversation, use_color)),
    }
    Ok(())
}

pub fn run_new(
    app: &App,
    title: Option<&str>,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let title = title.unwrap_or("New conversation");
    let conversation = app
        .conversations
        .create(title)
        .context("Failed to create conversation")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&conversation.summary())?),
        OutputFormat::Plain => {
            println!(
                "{} {} ({})",
                paint("Created", Color::GREEN, use_color),
                conversation.title,
                conversation.id
            );
        }
    }
    Ok(())
}

pub fn run_delete(app: &App, id: Uuid, format: &OutputFormat, use_color: bool) -> Result<()> {
    app.conversations
        .delete(id)
        .with_context(|| format!("Failed to delete conversation {}", id))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "deleted": id })),
        OutputFormat::Plain => println!("{} {}", paint("Deleted", Color::YELLOW, use_color), id),
    }
    Ok(())
}
