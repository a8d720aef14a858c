//! Serenity EventHandler that maps text commands onto tracker operations.

use std::sync::Arc;

use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use solvelog_tracker::{DELETE_LISTING_LIMIT, Tracker, TrackerError};
use solvelog_types::{Platform, SolvedProblem, Summary};

/// Bridges Discord messages into tracker calls and replies.
pub struct CommandHandler {
    pub tracker: Arc<Tracker>,
    pub prefix: String,
    pub ready_tx: watch::Sender<bool>,
}

#[async_trait]
impl EventHandler for CommandHandler {
    async fn message(&self, ctx: Context, msg: Message) {
        // Skip messages from bots
        if msg.author.bot {
            return;
        }

        let Some((command, args)) = parse_command(&msg.content, &self.prefix) else {
            return;
        };

        let user_id = msg.author.id.get() as i64;
        let display_name = msg
            .author
            .global_name
            .as_deref()
            .unwrap_or(&msg.author.name)
            .to_string();

        debug!(user_id, command, "Handling command");

        let Some(reply) = self.dispatch(user_id, &display_name, command, &args).await else {
            return;
        };

        if let Err(e) = msg.channel_id.say(&ctx.http, reply).await {
            warn!(user_id, command, "Failed to send reply: {e}");
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(bot_name = ready.user.name, "Discord bot connected and ready");
        let _ = self.ready_tx.send(true);
    }
}

impl CommandHandler {
    /// Route a parsed command. Returns `None` for commands this bot does not
    /// own, so it stays quiet in shared channels.
    async fn dispatch(
        &self,
        user_id: i64,
        display_name: &str,
        command: &str,
        args: &[&str],
    ) -> Option<String> {
        let reply = match command {
            "log" => self.handle_log(user_id, args).await,
            "summary" => self.handle_summary(user_id, display_name).await,
            "recent" => self.handle_recent(user_id, args).await,
            "delete" => self.handle_delete(user_id, args).await,
            "remind" => self.handle_remind(user_id, args).await,
            "help" => self.help_text(),
            _ => return None,
        };
        Some(reply)
    }

    async fn handle_log(&self, user_id: i64, args: &[&str]) -> String {
        let [platform, identifier] = args else {
            return format!(
                "Usage: `{p}log <atcoder|paiza> <identifier>`",
                p = self.prefix
            );
        };
        let Ok(platform) = platform.parse::<Platform>() else {
            return unknown_platform(platform);
        };

        match self.tracker.log_problem(user_id, platform, identifier).await {
            Ok(record) => format!(
                "Recorded!\nPlatform: {}\nProblem: {}",
                platform.display_name(),
                record.problem_id
            ),
            Err(TrackerError::InvalidIdentifier { platform, .. }) => identifier_hint(platform),
            Err(TrackerError::Duplicate) => "That problem is already recorded.".into(),
            Err(e) => generic_failure(user_id, "log", e),
        }
    }

    async fn handle_summary(&self, user_id: i64, display_name: &str) -> String {
        match self.tracker.summary(user_id).await {
            Ok(summary) if summary.is_empty() => format!(
                "No records yet. Start logging with `{p}log`!",
                p = self.prefix
            ),
            Ok(summary) => render_summary(display_name, &summary),
            Err(e) => generic_failure(user_id, "summary", e),
        }
    }

    async fn handle_recent(&self, user_id: i64, args: &[&str]) -> String {
        let [platform] = args else {
            return format!("Usage: `{p}recent <atcoder|paiza>`", p = self.prefix);
        };
        let Ok(platform) = platform.parse::<Platform>() else {
            return unknown_platform(platform);
        };

        match self
            .tracker
            .list_recent(user_id, platform, DELETE_LISTING_LIMIT)
            .await
        {
            Ok(records) if records.is_empty() => {
                format!("No {} records found.", platform.display_name())
            }
            Ok(records) => {
                let mut out = format!(
                    "Recent {} solves (up to {}):\n",
                    platform.display_name(),
                    DELETE_LISTING_LIMIT
                );
                for record in &records {
                    out.push_str(&format!(
                        "• {} — <t:{}:f>\n",
                        record.problem_id,
                        record.solved_at.timestamp()
                    ));
                }
                out.push_str(&format!(
                    "Delete with `{p}delete {} <problem id...>`",
                    platform,
                    p = self.prefix
                ));
                out
            }
            Err(e) => generic_failure(user_id, "recent", e),
        }
    }

    async fn handle_delete(&self, user_id: i64, args: &[&str]) -> String {
        let [platform, ids @ ..] = args else {
            return format!(
                "Usage: `{p}delete <atcoder|paiza> <problem id...>`",
                p = self.prefix
            );
        };
        if ids.is_empty() {
            return format!(
                "Usage: `{p}delete <atcoder|paiza> <problem id...>`",
                p = self.prefix
            );
        }
        let Ok(platform) = platform.parse::<Platform>() else {
            return unknown_platform(platform);
        };

        let ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        match self.tracker.delete_problems(user_id, platform, &ids).await {
            Ok(0) => "No matching records found.".into(),
            Ok(1) => "Deleted 1 record.".into(),
            Ok(n) => format!("Deleted {n} records."),
            Err(e) => generic_failure(user_id, "delete", e),
        }
    }

    async fn handle_remind(&self, user_id: i64, args: &[&str]) -> String {
        match args {
            ["off"] => match self.tracker.clear_reminder(user_id).await {
                Ok(true) => "Reminder disabled.".into(),
                Ok(false) => "No reminder was configured.".into(),
                Err(e) => generic_failure(user_id, "remind", e),
            },
            [time, timezone] => match self.tracker.set_reminder(user_id, time, timezone).await {
                Ok(()) => format!("Reminder set for {time} ({timezone}), every day."),
                Err(TrackerError::InvalidTime(_)) => {
                    "Invalid time. Use HH:MM, e.g. 21:00.".into()
                }
                Err(TrackerError::InvalidTimezone(_)) => {
                    "Unknown timezone. Use an IANA name, e.g. Asia/Tokyo.".into()
                }
                Err(e) => generic_failure(user_id, "remind", e),
            },
            _ => format!(
                "Usage: `{p}remind <HH:MM> <timezone>` or `{p}remind off`",
                p = self.prefix
            ),
        }
    }

    fn help_text(&self) -> String {
        let p = &self.prefix;
        format!(
            "**solvelog commands**\n\
             `{p}log <atcoder|paiza> <identifier>` — record a solved problem\n\
             `{p}summary` — your solve counts and recent activity\n\
             `{p}recent <atcoder|paiza>` — recent solves, for deleting\n\
             `{p}delete <atcoder|paiza> <problem id...>` — remove records\n\
             `{p}remind <HH:MM> <timezone>` — daily reminder if you haven't solved anything\n\
             `{p}remind off` — disable the reminder"
        )
    }
}

/// Parse a `<prefix>command arg arg...` message.
/// Returns `None` when the prefix is absent or nothing follows it.
fn parse_command<'a>(text: &'a str, prefix: &str) -> Option<(&'a str, Vec<&'a str>)> {
    let rest = text.trim().strip_prefix(prefix)?;
    let mut parts = rest.split_whitespace();
    let command = parts.next()?;
    Some((command, parts.collect()))
}

fn unknown_platform(input: &str) -> String {
    format!("Unknown platform {input:?}. Choose `atcoder` or `paiza`.")
}

fn identifier_hint(platform: Platform) -> String {
    match platform {
        Platform::AtCoder => "Invalid identifier. For AtCoder, paste the task URL \
            (e.g. https://atcoder.jp/contests/abc123/tasks/abc123_a)."
            .into(),
        Platform::Paiza => "Invalid identifier. For Paiza, use a rank letter (S/A/B/C/D) \
            plus three digits (e.g. C012, s123)."
            .into(),
    }
}

fn generic_failure(user_id: i64, command: &str, e: TrackerError) -> String {
    warn!(user_id, command, "Command failed: {e}");
    "Something went wrong. Please try again later.".into()
}

fn render_solve_line(record: &SolvedProblem) -> String {
    let ts = record.solved_at.timestamp();
    match &record.url {
        Some(url) => format!("• [{}]({url}) — <t:{ts}:R>", record.problem_id),
        None => format!(
            "• **{}**: {} — <t:{ts}:R>",
            record.platform.display_name(),
            record.problem_id
        ),
    }
}

fn render_summary(display_name: &str, summary: &Summary) -> String {
    let mut out = format!("**{display_name}'s solve summary**\n");

    out.push_str("Solved by platform:\n");
    for count in &summary.counts {
        out.push_str(&format!(
            "**{}**: {}\n",
            count.platform.display_name(),
            count.count
        ));
    }

    out.push_str("Recent solves:\n");
    for record in &summary.recent {
        out.push_str(&render_solve_line(record));
        out.push('\n');
    }

    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use solvelog_store::ActivityStore;

    fn handler() -> CommandHandler {
        let store = Arc::new(ActivityStore::open_in_memory().unwrap());
        let (ready_tx, _) = watch::channel(false);
        CommandHandler {
            tracker: Arc::new(Tracker::new(store)),
            prefix: "!".into(),
            ready_tx,
        }
    }

    #[test]
    fn test_parse_command_basic() {
        assert_eq!(
            parse_command("!log atcoder url", "!"),
            Some(("log", vec!["atcoder", "url"]))
        );
        assert_eq!(parse_command("!summary", "!"), Some(("summary", vec![])));
    }

    #[test]
    fn test_parse_command_no_prefix() {
        assert_eq!(parse_command("hello world", "!"), None);
    }

    #[test]
    fn test_parse_command_just_prefix() {
        assert_eq!(parse_command("!", "!"), None);
        assert_eq!(parse_command("!   ", "!"), None);
    }

    #[test]
    fn test_parse_command_custom_prefix() {
        assert_eq!(parse_command("?help", "?"), Some(("help", vec![])));
        assert_eq!(parse_command("!help", "?"), None);
    }

    #[test]
    fn test_parse_command_extra_whitespace() {
        assert_eq!(
            parse_command("  !delete  paiza  C012   S123 ", "!"),
            Some(("delete", vec!["paiza", "C012", "S123"]))
        );
    }

    #[tokio::test]
    async fn test_dispatch_log_and_duplicate() {
        let h = handler();
        let reply = h
            .dispatch(10, "alice", "log", &["paiza", "c012"])
            .await
            .unwrap();
        assert!(reply.contains("Recorded"));
        assert!(reply.contains("C012"));

        let reply = h
            .dispatch(10, "alice", "log", &["paiza", "C012"])
            .await
            .unwrap();
        assert!(reply.contains("already recorded"));
    }

    #[tokio::test]
    async fn test_dispatch_log_invalid_identifier() {
        let h = handler();
        let reply = h
            .dispatch(10, "alice", "log", &["atcoder", "garbage"])
            .await
            .unwrap();
        assert!(reply.contains("Invalid identifier"));
        assert!(reply.contains("atcoder.jp"));
    }

    #[tokio::test]
    async fn test_dispatch_log_unknown_platform() {
        let h = handler();
        let reply = h
            .dispatch(10, "alice", "log", &["codeforces", "x"])
            .await
            .unwrap();
        assert!(reply.contains("Unknown platform"));
    }

    #[tokio::test]
    async fn test_dispatch_summary_empty_then_filled() {
        let h = handler();
        let reply = h.dispatch(10, "alice", "summary", &[]).await.unwrap();
        assert!(reply.contains("No records yet"));

        h.dispatch(10, "alice", "log", &["paiza", "C012"]).await.unwrap();
        let reply = h.dispatch(10, "alice", "summary", &[]).await.unwrap();
        assert!(reply.contains("alice's solve summary"));
        assert!(reply.contains("**Paiza**: 1"));
        assert!(reply.contains("C012"));
    }

    #[tokio::test]
    async fn test_dispatch_delete_counts() {
        let h = handler();
        h.dispatch(10, "alice", "log", &["paiza", "A001"]).await.unwrap();
        h.dispatch(10, "alice", "log", &["paiza", "B002"]).await.unwrap();

        let reply = h
            .dispatch(10, "alice", "delete", &["paiza", "A001", "Z999", "B002"])
            .await
            .unwrap();
        assert!(reply.contains("Deleted 2 records"));

        let reply = h
            .dispatch(10, "alice", "delete", &["paiza", "A001"])
            .await
            .unwrap();
        assert!(reply.contains("No matching records"));
    }

    #[tokio::test]
    async fn test_dispatch_remind_flow() {
        let h = handler();
        let reply = h
            .dispatch(10, "alice", "remind", &["21:00", "Asia/Tokyo"])
            .await
            .unwrap();
        assert!(reply.contains("Reminder set for 21:00 (Asia/Tokyo)"));

        let reply = h
            .dispatch(10, "alice", "remind", &["25:00", "Asia/Tokyo"])
            .await
            .unwrap();
        assert!(reply.contains("Invalid time"));

        let reply = h
            .dispatch(10, "alice", "remind", &["21:00", "Mars/Crater"])
            .await
            .unwrap();
        assert!(reply.contains("Unknown timezone"));

        let reply = h.dispatch(10, "alice", "remind", &["off"]).await.unwrap();
        assert!(reply.contains("Reminder disabled"));
        let reply = h.dispatch(10, "alice", "remind", &["off"]).await.unwrap();
        assert!(reply.contains("No reminder was configured"));
    }

    #[tokio::test]
    async fn test_dispatch_unknown_command_stays_quiet() {
        let h = handler();
        assert!(h.dispatch(10, "alice", "frobnicate", &[]).await.is_none());
    }

    #[tokio::test]
    async fn test_recent_listing() {
        let h = handler();
        h.dispatch(10, "alice", "log", &["paiza", "C012"]).await.unwrap();
        let reply = h.dispatch(10, "alice", "recent", &["paiza"]).await.unwrap();
        assert!(reply.contains("C012"));
        assert!(reply.contains("!delete paiza"));
    }
}
