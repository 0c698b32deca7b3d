use ayjx_yulu::prelude::*;
use ayjx_yulu::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};

const CHANNEL_ID: &str = "main_terminal";

/// 终端适配器：每行输入作为一条消息，回复直接打印
pub struct ConsoleAdapter {
    id: String,
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self {
            id: "console-01".to_string(),
        }
    }
}

#[async_trait]
impl Adapter for ConsoleAdapter {
    fn id(&self) -> &str {
        &self.id
    }
    fn name(&self) -> &str {
        "Console Adapter"
    }

    async fn start(&self, ctx: AdapterContext) -> AyjxResult<()> {
        let event_tx = ctx.event_tx.clone();
        let login = Login::new(&self.id);
        let mut sys_rx = ctx.system_rx;

        tokio::spawn(async move {
            let mut reader = BufReader::new(tokio::io::stdin()).lines();
            let mut counter = 0u64;

            if let Err(e) = event_tx.send(Event::login_added(login.clone())).await {
                error!(target: "Console", "发送 login-added 失败: {}", e);
                return;
            }

            info!(target: "Console", "输入消息后回车发送，/exit 退出");

            loop {
                tokio::select! {
                    Ok(SystemSignal::Shutdown) = sys_rx.recv() => {
                        break;
                    }
                    line_result = reader.next_line() => {
                        match line_result {
                            Ok(Some(text)) => {
                                let content = text.trim().to_string();
                                if content.is_empty() { continue; }
                                if content == "/exit" {
                                    break;
                                }

                                counter += 1;
                                let msg = Message::new(format!("msg_{}", counter), content)
                                    .in_channel(Channel::new(CHANNEL_ID));
                                let event = Event::message_created(msg).with_login(login.clone());

                                if let Err(e) = event_tx.send(event).await {
                                    error!(target: "Console", "发送事件失败: {}", e);
                                    break;
                                }
                            }
                            Ok(None) => break,
                            Err(e) => {
                                error!(target: "Console", "读取输入错误: {}", e);
                                break;
                            }
                        }
                    }
                }
            }

            let _ = event_tx.send(Event::login_removed(login)).await;
        });

        Ok(())
    }

    async fn stop(&self) -> AyjxResult<()> {
        Ok(())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> AyjxResult<()> {
        println!("[{}] Bot: {}", channel_id, content);
        Ok(())
    }
}
