use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Capacity of the findings queue between probe tasks and the reporter.
pub const REPORT_QUEUE_CAPACITY: usize = 1024;

/// One finding: an optional console line and an optional line for the output file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportMessage {
    pub console: Option<String>,
    pub file: Option<String>,
}

impl ReportMessage {
    pub fn new(console: impl Into<String>, file: impl Into<String>) -> Self {
        Self { console: Some(console.into()), file: Some(file.into()) }
    }
}

pub type ReportSender = mpsc::Sender<ReportMessage>;

pub fn report_channel() -> (ReportSender, mpsc::Receiver<ReportMessage>) {
    mpsc::channel(REPORT_QUEUE_CAPACITY)
}

/// Drain `rx` in FIFO order until every sender is dropped.
///
/// The file sink is flushed after each line so partial output survives an abrupt exit.
/// A failing sink is logged and skipped; the other sink keeps receiving. After the first
/// console error the console is no longer written to (a closed pipe stays closed).
pub async fn drain_reports<C, F>(
    mut rx: mpsc::Receiver<ReportMessage>,
    console: &mut C,
    mut file: Option<&mut F>,
) -> std::io::Result<()>
where
    C: AsyncWrite + Unpin,
    F: AsyncWrite + Unpin,
{
    let mut console_open = true;
    while let Some(msg) = rx.recv().await {
        if let Some(text) = msg.console.as_deref().filter(|t| console_open && !t.is_empty()) {
            if let Err(e) = write_line(console, text).await {
                tracing::error!(error=%e, "failed to write to console; further findings go to the output file only");
                console_open = false;
            }
        }
        if let (Some(f), Some(text)) = (file.as_deref_mut(), msg.file.as_deref().filter(|t| !t.is_empty())) {
            if let Err(e) = write_line(f, text).await {
                tracing::error!(error=%e, "failed to write to output file");
            }
        }
    }
    Ok(())
}

async fn write_line<F: AsyncWrite + Unpin>(f: &mut F, text: &str) -> std::io::Result<()> {
    f.write_all(text.as_bytes()).await?;
    f.write_all(b"\n").await?;
    f.flush().await
}

/// Spawn the single consumer that prints findings to stdout and appends them to `file`.
pub fn spawn_reporter(
    rx: mpsc::Receiver<ReportMessage>,
    mut file: Option<File>,
) -> tokio::task::JoinHandle<std::io::Result<()>> {
    tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        drain_reports(rx, &mut stdout, file.as_mut()).await
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_enqueue_order_to_both_sinks() {
        let (tx, rx) = report_channel();
        tx.send(ReportMessage::new("first", "f1")).await.unwrap();
        tx.send(ReportMessage { console: Some("second".into()), file: None }).await.unwrap();
        tx.send(ReportMessage { console: None, file: Some("f3".into()) }).await.unwrap();
        drop(tx);

        let mut console: Vec<u8> = Vec::new();
        let mut file: Vec<u8> = Vec::new();
        drain_reports(rx, &mut console, Some(&mut file)).await.unwrap();

        assert_eq!(String::from_utf8(console).unwrap(), "first\nsecond\n");
        assert_eq!(String::from_utf8(file).unwrap(), "f1\nf3\n");
    }

    struct ClosedPipe;

    impl AsyncWrite for ClosedPipe {
        fn poll_write(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &[u8],
        ) -> std::task::Poll<std::io::Result<usize>> {
            std::task::Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn broken_console_does_not_starve_the_file() {
        let (tx, rx) = report_channel();
        tx.send(ReportMessage::new("one", "f1")).await.unwrap();
        tx.send(ReportMessage::new("two", "f2")).await.unwrap();
        drop(tx);

        let mut console = ClosedPipe;
        let mut file: Vec<u8> = Vec::new();
        drain_reports(rx, &mut console, Some(&mut file)).await.unwrap();

        assert_eq!(String::from_utf8(file).unwrap(), "f1\nf2\n");
    }

    #[tokio::test]
    async fn empty_texts_are_skipped() {
        let (tx, rx) = report_channel();
        tx.send(ReportMessage::new("", "")).await.unwrap();
        drop(tx);

        let mut console: Vec<u8> = Vec::new();
        drain_reports::<_, Vec<u8>>(rx, &mut console, None).await.unwrap();
        assert!(console.is_empty());
    }
}
