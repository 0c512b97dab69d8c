use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use futures_core::stream::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tokio_util::io::StreamReader;
use tracing::{debug, info, instrument, warn};

use crate::core::{RawByteStream, TextStream};
use crate::error::{AIError, GenerationError};
use crate::generator::GeneratorConfig;
use crate::interceptors::Interceptor;
use crate::json_utils::{extract_array, find_json_structures, JsonStreamParser};
use crate::schema::{validate_artifact, Artifact};

/// One step of a streamed generation.
///
/// A stream yields zero or more `Element`s (one per array element as soon as
/// it is complete) and ends with exactly one `Complete` carrying the validated
/// artifact, unless it ends with an error instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GenerationEvent<T> {
    Element { index: usize, item: T },
    Complete { items: Vec<T> },
}

impl<T> GenerationEvent<T> {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

/// Turn a Server-Sent-Events byte stream into text deltas.
///
/// `extract` maps one event's `data:` payload to the text it carries; events
/// it returns `None` for (metadata, keep-alives) are skipped. A `[DONE]`
/// payload ends nothing by itself, the stream simply runs to completion.
pub fn sse_text_deltas<F>(byte_stream: RawByteStream, extract: F) -> impl Stream<Item = Result<String, AIError>>
where
    F: Fn(&str) -> Option<String> + Send + 'static,
{
    try_stream! {
        let io_stream = byte_stream.map(|res| {
            res.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        });
        let mut lines = BufReader::new(StreamReader::new(io_stream)).lines();
        let mut event = String::new();

        loop {
            let line = lines
                .next_line()
                .await
                .map_err(|e| AIError::Stream(e.to_string()))?;
            let Some(line) = line else { break };
            let line = line.trim_end_matches('\r');

            if line.is_empty() {
                if let Some(delta) = take_event(&mut event, &extract) {
                    yield delta;
                }
            } else if let Some(data) = line.strip_prefix("data:") {
                if !event.is_empty() { event.push('\n'); }
                event.push_str(data.trim_start());
            }
        }

        // Final event without a trailing blank line
        if let Some(delta) = take_event(&mut event, &extract) {
            yield delta;
        }
    }
}

fn take_event<F>(event: &mut String, extract: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if event.is_empty() {
        return None;
    }
    let payload = std::mem::take(event);
    if payload.trim() == "[DONE]" {
        return None;
    }
    extract(&payload).filter(|text| !text.is_empty())
}

/// Fail the stream with [`GenerationError::TimedOut`] once `limit` has elapsed.
pub fn with_deadline(mut inner: TextStream, limit: Duration) -> impl Stream<Item = Result<String, GenerationError>> {
    try_stream! {
        let deadline = Instant::now() + limit;
        loop {
            match tokio::time::timeout_at(deadline, inner.next()).await {
                Ok(Some(delta)) => yield delta?,
                Ok(None) => break,
                Err(_) => {
                    warn!(limit_secs = limit.as_secs(), "generation exceeded execution ceiling");
                    Err::<(), _>(GenerationError::TimedOut(limit))?;
                }
            }
        }
    }
}

/// Parse streamed model text into [`GenerationEvent`]s for artifact `T`.
///
/// Every closed element of the root array that deserializes as `T` is
/// reported immediately. When the text ends the full output is extracted and
/// validated; only a valid artifact produces `Complete`.
pub fn artifact_events<T, S>(
    deltas: S,
    config: GeneratorConfig,
    transcript: Option<(Arc<dyn Interceptor>, String)>,
) -> impl Stream<Item = Result<GenerationEvent<T>, GenerationError>>
where
    T: Artifact,
    S: Stream<Item = Result<String, GenerationError>> + Send + 'static,
{
    try_stream! {
        let mut deltas = Box::pin(deltas);
        let mut parser = JsonStreamParser::new();
        let mut accum = String::new();
        let mut received = 0usize;

        while let Some(delta) = deltas.next().await {
            let delta = delta?;
            accum.push_str(&delta);
            for node in parser.feed(&delta).elements {
                let Some(slice) = node.slice(&accum) else { continue };
                match serde_json::from_str::<T>(slice) {
                    Ok(item) => {
                        debug!(target: "studygen::json_stream", index = received, kind = %T::KIND, "element received");
                        yield GenerationEvent::Element { index: received, item };
                        received += 1;
                    }
                    Err(e) => debug!(target: "studygen::json_stream", error = %e, "skipping element that does not match schema"),
                }
            }
        }

        if let Some((interceptor, prompt)) = &transcript {
            if let Err(e) = interceptor.save(prompt, &accum).await {
                warn!(error = %e, "failed to write transcript");
            }
        }

        let items = finish::<T>(&accum, &config)?;
        info!(kind = %T::KIND, count = items.len(), "artifact validated");
        yield GenerationEvent::Complete { items };
    }
}

/// Extract and validate the artifact array from complete model output.
#[instrument(target = "studygen::generator", skip(raw, config), fields(raw_len = raw.len(), kind = %T::KIND))]
pub fn finish<T: Artifact>(raw: &str, config: &GeneratorConfig) -> Result<Vec<T>, GenerationError> {
    let items = match extract_array::<T>(raw) {
        Some(items) => items,
        None if find_json_structures(raw).is_empty() => {
            warn!("model output contains no JSON");
            return Err(GenerationError::NoArtifactFound(raw.to_string()));
        }
        None => {
            let err = serde_json::from_str::<Vec<T>>(raw.trim())
                .err()
                .unwrap_or_else(|| serde_json::Error::io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "no structure in the output matches the artifact schema",
                )));
            warn!(error = %err, "model output does not match the artifact schema");
            return Err(GenerationError::JsonDeserialization(err, raw.to_string()));
        }
    };

    validate_artifact(&items, config).map_err(|e| {
        warn!(error = %e, "artifact failed validation");
        GenerationError::from(e)
    })?;
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use crate::schema::FlashCard;

    fn text_stream(chunks: Vec<&'static str>) -> impl Stream<Item = Result<String, GenerationError>> {
        futures_util::stream::iter(chunks.into_iter().map(|c| Ok(c.to_string())))
    }

    const CARDS: &str = r#"[{"question":"q1","description":"d1"},{"question":"q2","description":"d2"},{"question":"q3","description":"d3"},{"question":"q4","description":"d4"}]"#;

    #[tokio::test]
    async fn elements_are_reported_before_the_array_closes() {
        let (head, tail) = CARDS.split_at(CARDS.find("},{").unwrap() + 1);
        let events: Vec<_> = artifact_events::<FlashCard, _>(text_stream(vec![head, tail]), GeneratorConfig::default(), None)
            .collect()
            .await;

        assert_eq!(events.len(), 5);
        match &events[0] {
            Ok(GenerationEvent::Element { index: 0, item }) => assert_eq!(item.question, "q1"),
            other => panic!("unexpected first event: {:?}", other),
        }
        assert!(matches!(&events[4], Ok(GenerationEvent::Complete { items }) if items.len() == 4));
    }

    #[tokio::test]
    async fn short_artifact_ends_with_validation_error() {
        let raw = r#"[{"question":"q1","description":"d1"}]"#;
        let events: Vec<_> = artifact_events::<FlashCard, _>(text_stream(vec![raw]), GeneratorConfig::default(), None)
            .collect()
            .await;

        assert!(matches!(events[0], Ok(GenerationEvent::Element { index: 0, .. })));
        assert!(matches!(events.last(), Some(Err(GenerationError::Validation(_)))));
    }

    #[tokio::test]
    async fn prose_only_output_is_no_artifact() {
        let err = finish::<FlashCard>("I cannot help with that.", &GeneratorConfig::default()).unwrap_err();
        assert!(matches!(err, GenerationError::NoArtifactFound(_)));
    }

    #[tokio::test]
    async fn sse_events_become_text_deltas() {
        let body = "data: {\"t\":\"[{\"}\r\n\r\ndata: {\"t\":\"}]\"}\n\ndata: [DONE]\n\n";
        // Split mid-event to exercise line buffering
        let (a, b) = body.split_at(7);
        let bytes: RawByteStream = Box::pin(futures_util::stream::iter(vec![
            Ok(Bytes::from(a.to_string())),
            Ok(Bytes::from(b.to_string())),
        ]));
        let deltas: Vec<String> = sse_text_deltas(bytes, |payload| {
            serde_json::from_str::<serde_json::Value>(payload)
                .ok()
                .and_then(|v| v["t"].as_str().map(str::to_string))
        })
        .map(|r| r.unwrap())
        .collect()
        .await;

        assert_eq!(deltas, vec!["[{".to_string(), "}]".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_stream_times_out() {
        let stalled: TextStream = Box::pin(futures_util::stream::pending::<Result<String, AIError>>());
        let results: Vec<_> = with_deadline(stalled, Duration::from_secs(60)).collect().await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(GenerationError::TimedOut(_))));
    }
}
