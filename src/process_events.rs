use futures::Stream;
use std::io;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, trace};

/// Exit status of a finished process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    pub code: Option<i32>,
}

impl ExitInfo {
    #[cfg(test)]
    pub fn success() -> Self {
        Self { code: Some(0) }
    }

    #[cfg(test)]
    pub fn failure(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitInfo {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Line(String),
    Exited(ExitInfo),
}

/// Combined stdout/stderr of a running process, one line at a time.
///
/// Both pipes are drained concurrently; the final item is always
/// [`ProcessEvent::Exited`] unless waiting on the child failed. Dropping the
/// stream kills the process.
pub struct ProcessEvents {
    stream: UnboundedReceiverStream<io::Result<ProcessEvent>>,
}

impl ProcessEvents {
    pub fn spawn(mut command: Command) -> io::Result<ProcessEvents> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = command.spawn()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let stdout = child.stdout.take().map(|pipe| forward_lines(pipe, tx.clone()));
        let stderr = child.stderr.take().map(|pipe| forward_lines(pipe, tx.clone()));
        let consumer = tx.clone();

        tokio::spawn(async move {
            let finished = async {
                for reader in [stdout, stderr].into_iter().flatten() {
                    let _ = reader.await;
                }
                child.wait().await
            };
            tokio::select! {
                status = finished => {
                    let _ = tx.send(status.map(|status| ProcessEvent::Exited(status.into())));
                }
                _ = consumer.closed() => {
                    // Dropping the child kills it
                    debug!("Output no longer consumed, stopping process");
                }
            }
        });

        Ok(ProcessEvents {
            stream: UnboundedReceiverStream::new(rx),
        })
    }

    /// Builds a finished stream out of already known events.
    #[cfg(test)]
    pub fn from_events(events: Vec<ProcessEvent>) -> ProcessEvents {
        ProcessEvents::from_results(events.into_iter().map(Ok).collect())
    }

    #[cfg(test)]
    pub fn from_results(events: Vec<io::Result<ProcessEvent>>) -> ProcessEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        for event in events {
            let _ = tx.send(event);
        }
        ProcessEvents {
            stream: UnboundedReceiverStream::new(rx),
        }
    }
}

impl Stream for ProcessEvents {
    type Item = io::Result<ProcessEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().stream).poll_next(cx)
    }
}

fn forward_lines<R>(
    pipe: R,
    tx: mpsc::UnboundedSender<io::Result<ProcessEvent>>,
) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => return,
                Ok(_) => {
                    let line = decode_line(&buf);
                    trace!("{}", line);
                    if tx.send(Ok(ProcessEvent::Line(line))).is_err() {
                        return;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            }
        }
    })
}

/// Lossy, so stray bytes in the engine's output never end the stream.
fn decode_line(buf: &[u8]) -> String {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn from_events_yields_events_in_order_then_ends() {
        let mut events = ProcessEvents::from_events(vec![
            ProcessEvent::Line("pulling manifest".to_string()),
            ProcessEvent::Exited(ExitInfo::success()),
        ]);

        assert_eq!(
            events.next().await.unwrap().unwrap(),
            ProcessEvent::Line("pulling manifest".to_string())
        );
        assert_eq!(
            events.next().await.unwrap().unwrap(),
            ProcessEvent::Exited(ExitInfo::success())
        );
        assert!(events.next().await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn spawn_merges_both_pipes_and_reports_exit_last() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo out; echo err 1>&2; exit 3"]);
        let events: Vec<ProcessEvent> = ProcessEvents::spawn(command)
            .unwrap()
            .map(|event| event.unwrap())
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        assert!(events.contains(&ProcessEvent::Line("out".to_string())));
        assert!(events.contains(&ProcessEvent::Line("err".to_string())));
        assert_eq!(events[2], ProcessEvent::Exited(ExitInfo::failure(3)));
    }

    #[test]
    fn decode_line_strips_line_endings_and_replaces_invalid_bytes() {
        assert_eq!(decode_line(b"success\r\n"), "success");
        assert_eq!(decode_line(b"no newline"), "no newline");
        assert_eq!(decode_line(b"pulling \xff layer\n"), "pulling \u{fffd} layer");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn invalid_utf8_does_not_cut_the_stream_short() {
        let mut command = Command::new("sh");
        command.args([
            "-c",
            "printf 'pulling \\377 layer\\n'; echo 'pulling abc... 100% done'; exit 0",
        ]);
        let events: Vec<ProcessEvent> = ProcessEvents::spawn(command)
            .unwrap()
            .map(|event| event.unwrap())
            .collect()
            .await;

        assert_eq!(
            events,
            vec![
                ProcessEvent::Line("pulling \u{fffd} layer".to_string()),
                ProcessEvent::Line("pulling abc... 100% done".to_string()),
                ProcessEvent::Exited(ExitInfo::success()),
            ]
        );
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn dropping_the_stream_stops_the_process() {
        let mut command = Command::new("sh");
        command.args(["-c", "echo $$; exec sleep 30"]);
        let mut events = ProcessEvents::spawn(command).unwrap();
        let pid = match events.next().await.unwrap().unwrap() {
            ProcessEvent::Line(line) => line,
            other => panic!("unexpected event: {other:?}"),
        };
        drop(events);

        let stat = format!("/proc/{pid}/stat");
        let mut stopped = false;
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            // Gone, or a zombie waiting to be reaped
            match std::fs::read_to_string(&stat) {
                Err(_) => stopped = true,
                Ok(content) => stopped = content.contains(") Z "),
            }
            if stopped {
                break;
            }
        }
        assert!(stopped, "process {pid} still running");
    }
}
