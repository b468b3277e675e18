use std::time::{Duration, Instant};

use chrono::NaiveTime;
use ericbt_domain::status::StatusFrame;
use humantime::format_duration;
use tokio::time;
use tracing::{debug, info};

use crate::{CommandSink, LinkError};

const PROGRESS_EVERY: usize = 100;

/// Send one status frame per `interval` until `limit` frames went out or a
/// send fails. Returns the number of frames sent.
pub async fn pump<S, C>(
    sink: &mut S,
    frame: &mut StatusFrame,
    interval: Duration,
    limit: Option<usize>,
    mut clock: C,
) -> Result<usize, LinkError>
where
    S: CommandSink + ?Sized,
    C: FnMut() -> NaiveTime + Send,
{
    let start = Instant::now();
    let mut sent = 0;
    while limit.is_none_or(|limit| sent < limit) {
        let payload = frame.next_command(clock()).to_json()?;
        debug!("Sending {} bytes: {payload}", payload.len());
        sink.send(payload.as_bytes()).await?;
        sent += 1;
        if sent % PROGRESS_EVERY == 0 {
            let runtime = Duration::from_secs(start.elapsed().as_secs());
            info!("{sent} frames sent (Runtime: {})", format_duration(runtime));
        }
        time::sleep(interval).await;
    }
    Ok(sent)
}
