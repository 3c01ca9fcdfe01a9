//! CLI session: stdin/stdout REPL driving the adapter for local testing.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::activity::{Activity, ActivityKind, ChannelAccount};
use crate::adapter::BotAdapter;

/// Channel id used for CLI turns.
pub const CLI_CHANNEL: &str = "cli";
const CLI_CONVERSATION: &str = "cli-conversation";
const CLI_USER: &str = "local-user";

/// A single local conversation over a line-oriented reader/writer.
pub struct CliSession {
    adapter: Arc<BotAdapter>,
}

impl CliSession {
    pub fn new(adapter: Arc<BotAdapter>) -> Self {
        Self { adapter }
    }

    /// Run against the process's stdin and stdout until EOF or `/quit`.
    pub async fn run_stdio(&self) -> anyhow::Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.run(stdin, stdout).await
    }

    /// Run against arbitrary I/O.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let join = Activity::members_added(
            CLI_CHANNEL,
            CLI_CONVERSATION,
            vec![ChannelAccount::new(CLI_USER).with_name("You")],
        );
        self.exchange(join, &mut writer).await?;

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "/quit" {
                break;
            }
            let activity = Activity::message(CLI_CHANNEL, CLI_CONVERSATION, CLI_USER, line);
            self.exchange(activity, &mut writer).await?;
        }
        writer.flush().await?;
        Ok(())
    }

    async fn exchange<W>(&self, activity: Activity, writer: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        for reply in self.adapter.process_activity(activity).await {
            match reply.kind {
                ActivityKind::Message => {
                    let mut line = format!("bot> {}", reply.text());
                    if let Some(actions) = &reply.suggested_actions {
                        let options: Vec<&str> =
                            actions.actions.iter().map(|a| a.title.as_str()).collect();
                        line.push_str(&format!("  [{}]", options.join(" | ")));
                    }
                    line.push('\n');
                    writer.write_all(line.as_bytes()).await?;
                }
                ActivityKind::Trace => {
                    tracing::debug!(
                        name = reply.name.as_deref().unwrap_or(""),
                        value = ?reply.value,
                        "Trace activity"
                    );
                }
                _ => {}
            }
        }
        writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::DialogBot;
    use crate::dialogs::{Locale, Messages, UserProfileDialog};
    use crate::state::{BotState, MemoryStorage};

    #[tokio::test]
    async fn scripted_session_prints_replies() {
        let messages = Messages::new(Locale::English);
        let storage = Arc::new(MemoryStorage::new());
        let user = BotState::user(storage.clone());
        let dialog = Arc::new(UserProfileDialog::new(&user, messages));
        let bot = DialogBot::builder()
            .conversation_state(BotState::conversation(storage))
            .user_state(user)
            .dialog(dialog)
            .build()
            .unwrap();
        let session = CliSession::new(Arc::new(BotAdapter::new(Arc::new(bot), messages)));

        let input: &[u8] = b"hi\n\nAna\n/quit\nignored\n";
        let mut output = Vec::new();
        session.run(input, &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].starts_with("bot> Welcome"));
        assert_eq!(lines[1], "bot> What is your name?");
        assert_eq!(lines[2], "bot> Hello Ana! Shall we place your order?");
        assert!(lines[3].ends_with("[300ml | 500ml | 700ml]"));
        assert_eq!(lines.len(), 4);
    }
}
