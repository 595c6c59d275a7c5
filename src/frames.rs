//! Decoding of chunked message responses into [`StreamFrame`]s.
//!
//! The server answers a message submit with a body of JSON objects, each
//! terminated by CRLF. A bare LF does not end a frame, so JSON that wraps
//! across lines still decodes as one. Chunk boundaries are arbitrary: one
//! chunk may hold several frames, a fraction of one, or nothing but
//! delimiters. The
//! [`FrameDecoder`] accumulates bytes and hands out every complete segment;
//! [`process_frames`] drives it from an async byte stream.
//!
//! Malformed segments are isolated: each yields one `Err(Error::MalformedFrame)`
//! and decoding continues with the next segment.

use bytes::{Buf, Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{STREAM_BYTES, STREAM_FRAMES, STREAM_MALFORMED_FRAMES};
use crate::{Error, Result, StreamFrame};

/// Incremental accumulator that splits a byte stream into frames.
///
/// Bytes are buffered rather than text so a multi-byte character split across
/// two chunks decodes correctly.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk without decoding anything.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Appends a chunk and returns a lazy iterator over the frames it completes.
    ///
    /// Frames the iterator does not get to stay buffered and come out of the
    /// next call to `push`, `next_frame` or `finish`.
    pub fn push(&mut self, chunk: &[u8]) -> Frames<'_> {
        self.extend(chunk);
        Frames { decoder: self }
    }

    /// Decodes the next complete segment in the buffer, skipping blank ones.
    ///
    /// Returns `None` when only a partial trailing fragment (or nothing) is
    /// left.
    pub fn next_frame(&mut self) -> Option<Result<StreamFrame>> {
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\r\n") {
            let segment = self.buffer.split_to(end + 2);
            if let Some(frame) = parse_segment(&segment) {
                return Some(frame);
            }
        }
        None
    }

    /// Flushes the trailing fragment once the stream has ended.
    ///
    /// A blank remainder yields `None`; anything else is parsed under the
    /// same rules as a delimited segment.
    pub fn finish(&mut self) -> Option<Result<StreamFrame>> {
        let remainder = self.buffer.split();
        parse_segment(remainder.chunk())
    }

    /// Number of bytes waiting for a delimiter.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Lazy iterator returned by [`FrameDecoder::push`].
pub struct Frames<'a> {
    decoder: &'a mut FrameDecoder,
}

impl Iterator for Frames<'_> {
    type Item = Result<StreamFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decoder.next_frame()
    }
}

/// Parses one segment; `None` means the segment was blank.
fn parse_segment(segment: &[u8]) -> Option<Result<StreamFrame>> {
    let trimmed = segment.trim_ascii();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_slice::<StreamFrame>(trimmed) {
        Ok(frame) => {
            STREAM_FRAMES.click();
            Some(Ok(frame))
        }
        Err(e) => {
            STREAM_MALFORMED_FRAMES.click();
            Some(Err(Error::malformed_frame(
                format!("failed to parse frame: {e}"),
                String::from_utf8_lossy(trimmed),
                Some(Box::new(e)),
            )))
        }
    }
}

/// Process a stream of bytes into a stream of frames.
///
/// Transport errors are passed through and end the stream; malformed frames
/// are yielded as errors without ending it.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use futures::{StreamExt, stream};
/// use composer::{StreamFrame, process_frames};
///
/// # tokio_test::block_on(async {
/// let chunks = stream::iter(vec![
///     Ok::<_, composer::Error>(Bytes::from_static(b"{\"message\":\"Hel")),
///     Ok(Bytes::from_static(b"lo\"}\r\n")),
/// ]);
/// let frames: Vec<_> = process_frames(chunks).collect().await;
/// assert_eq!(frames.len(), 1);
/// assert_eq!(frames[0].as_ref().unwrap(), &StreamFrame::message("Hello"));
/// # });
/// ```
pub fn process_frames<S>(byte_stream: S) -> impl Stream<Item = Result<StreamFrame>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    stream::unfold(
        (byte_stream, FrameDecoder::new(), false),
        |(mut stream, mut decoder, done)| async move {
            if done {
                return None;
            }
            loop {
                if let Some(frame) = decoder.next_frame() {
                    return Some((frame, (stream, decoder, false)));
                }

                match stream.next().await {
                    Some(Ok(bytes)) => {
                        STREAM_BYTES.count(bytes.len() as u64);
                        decoder.extend(&bytes);
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, decoder, true)));
                    }
                    None => {
                        return decoder
                            .finish()
                            .map(|frame| (frame, (stream, decoder, true)));
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&[u8]]) -> impl Stream<Item = Result<Bytes>> + Unpin {
        let parts: Vec<Result<Bytes>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p)))
            .collect();
        stream::iter(parts)
    }

    async fn collect(parts: &[&[u8]]) -> Vec<Result<StreamFrame>> {
        process_frames(chunks(parts)).collect().await
    }

    #[test]
    fn push_yields_frames_in_order() {
        let mut decoder = FrameDecoder::new();
        let frames: Vec<_> = decoder
            .push(b"{\"message\":\"Hi\"}\r\n{\"artifact\":\"# Doc\"}\r\n")
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(
            frames,
            vec![StreamFrame::message("Hi"), StreamFrame::artifact("# Doc")]
        );
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn push_buffers_partial_fragment() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.push(b"{\"mess").count(), 0);
        assert_eq!(decoder.buffered(), 6);

        let frames: Vec<_> = decoder.push(b"age\":\"Hi\"}\r\n").collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap(), &StreamFrame::message("Hi"));
    }

    #[test]
    fn push_is_lazy() {
        let mut decoder = FrameDecoder::new();
        let mut frames = decoder.push(b"{\"message\":\"a\"}\r\n{\"message\":\"b\"}\r\n");
        assert_eq!(
            frames.next().unwrap().unwrap(),
            StreamFrame::message("a")
        );
        drop(frames);
        assert_eq!(
            decoder.next_frame().unwrap().unwrap(),
            StreamFrame::message("b")
        );
        assert!(decoder.next_frame().is_none());
    }

    #[test]
    fn blank_segments_are_skipped() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.push(b"\r\n\r\n").count(), 0);
        assert_eq!(decoder.push(b"   \r\n\t\r\n").count(), 0);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn finish_parses_trailing_fragment() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.push(b"{\"artifact\":\"tail\"}").count(), 0);
        assert_eq!(
            decoder.finish().unwrap().unwrap(),
            StreamFrame::artifact("tail")
        );
        assert_eq!(decoder.buffered(), 0);
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn finish_reports_truncated_fragment() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.push(b"{\"message\":\"cut").count(), 0);
        let err = decoder.finish().unwrap().unwrap_err();
        assert!(err.is_malformed_frame());
    }

    #[tokio::test]
    async fn decode_two_frames() {
        let frames = collect(&[b"{\"message\":\"Hi\"}\r\n{\"artifact\":\"# Doc\"}\r\n"]).await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_ref().unwrap(), &StreamFrame::message("Hi"));
        assert_eq!(frames[1].as_ref().unwrap(), &StreamFrame::artifact("# Doc"));
    }

    #[tokio::test]
    async fn decode_frame_split_across_chunks() {
        let frames = collect(&[b"{\"mess", b"age\":\"Hi\"}\r\n"]).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap(), &StreamFrame::message("Hi"));
    }

    #[tokio::test]
    async fn decode_delimiter_split_across_chunks() {
        let frames = collect(&[b"{\"message\":\"a\"}\r", b"\n{\"message\":\"b\"}", b"\r\n"]).await;
        let frames: Vec<_> = frames.into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(
            frames,
            vec![StreamFrame::message("a"), StreamFrame::message("b")]
        );
    }

    #[tokio::test]
    async fn decode_byte_at_a_time() {
        let body = b"{\"message\":\"Hi\"}\r\n\r\n{\"artifact\":\"# Doc\"}\r\n";
        let parts: Vec<&[u8]> = body.chunks(1).collect();
        let frames: Vec<_> = collect(&parts)
            .await
            .into_iter()
            .map(|f| f.unwrap())
            .collect();
        assert_eq!(
            frames,
            vec![StreamFrame::message("Hi"), StreamFrame::artifact("# Doc")]
        );
    }

    #[tokio::test]
    async fn decode_multibyte_character_split_across_chunks() {
        let body = "{\"message\":\"caf\u{e9} \u{1f600}\"}\r\n".as_bytes();
        let split = body.iter().position(|b| *b == 0xc3).unwrap() + 1;
        let frames = collect(&[&body[..split], &body[split..]]).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(
            frames[0].as_ref().unwrap(),
            &StreamFrame::message("caf\u{e9} \u{1f600}")
        );
    }

    #[tokio::test]
    async fn decode_blank_segments_only() {
        let frames = collect(&[b"\r\n\r\n", b"\r\n"]).await;
        assert!(frames.is_empty());
    }

    #[tokio::test]
    async fn decode_server_encoder_output() {
        // json.Encoder terminates with '\n' and the handler appends "\r\n".
        let frames = collect(&[b"{\"message\":\"\",\"artifact\":\"# A\"}\n\r\n{\"message\":\"ok\"}\n\r\n"])
            .await;
        let frames: Vec<_> = frames.into_iter().map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].artifact_text(), Some("# A"));
        assert_eq!(frames[0].message_text(), None);
        assert_eq!(frames[1], StreamFrame::message("ok"));
    }

    #[test]
    fn bare_line_feed_stays_inside_frame() {
        let mut decoder = FrameDecoder::new();
        let frames: Vec<_> = decoder.push(b"{\"message\":\n\"Hi\"}\r\n").collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref().unwrap(), &StreamFrame::message("Hi"));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn lone_line_feed_waits_for_delimiter() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.push(b"{\"message\":\"a\"}\n").count(), 0);
        assert_eq!(decoder.push(b"\r\n").count(), 1);
    }

    #[tokio::test]
    async fn malformed_frame_is_isolated() {
        let frames = collect(&[b"{\"message\":\"a\"}\r\nnot json\r\n{\"message\":\"b\"}\r\n"]).await;
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].as_ref().unwrap(), &StreamFrame::message("a"));
        match &frames[1] {
            Err(Error::MalformedFrame { segment, .. }) => assert_eq!(segment, "not json"),
            other => panic!("expected malformed frame, got {other:?}"),
        }
        assert_eq!(frames[2].as_ref().unwrap(), &StreamFrame::message("b"));
    }

    #[tokio::test]
    async fn wrong_shape_is_malformed() {
        let frames = collect(&[b"[1,2,3]\r\n{\"message\":7}\r\n"]).await;
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| matches!(f, Err(e) if e.is_malformed_frame())));
    }

    #[tokio::test]
    async fn trailing_fragment_without_delimiter() {
        let frames = collect(&[b"{\"message\":\"a\"}\r\n{\"artifact\":\"b\"}"]).await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].as_ref().unwrap(), &StreamFrame::artifact("b"));
    }

    #[tokio::test]
    async fn transport_error_ends_stream() {
        let parts: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"{\"message\":\"a\"}\r\n{\"mess")),
            Err(Error::streaming("connection reset", None)),
            Ok(Bytes::from_static(b"age\":\"b\"}\r\n")),
        ];
        let frames: Vec<_> = process_frames(stream::iter(parts)).collect().await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_ref().unwrap(), &StreamFrame::message("a"));
        assert!(matches!(frames[1], Err(Error::Streaming { .. })));
    }
}
