use crate::{
    ByteSource, ChunkSource, Error, LineBuffer, LineEnding, SourceEvent, SourceSender,
    chunk_channel,
};
use bytes::Bytes;
use std::collections::VecDeque;

async fn source_with(chunks: &[&[u8]]) -> (SourceSender, ChunkSource) {
    let (tx, source) = chunk_channel(chunks.len() + 1);
    for chunk in chunks {
        tx.send(Bytes::copy_from_slice(chunk)).await.unwrap();
    }
    (tx, source)
}

async fn ended_buffer(chunks: &[&[u8]], max_lines: Option<u64>) -> LineBuffer<ChunkSource> {
    let (tx, source) = source_with(chunks).await;
    tx.end().await.unwrap();
    LineBuffer::with_max_lines(source, max_lines)
}

fn drain_strings<S: ByteSource>(buffer: &mut LineBuffer<S>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(line) = buffer.pull_line() {
        lines.push(line.to_str().unwrap().to_owned());
    }
    lines
}

#[tokio::test]
async fn single_chunk_then_end_yields_every_line() {
    let mut buffer = ended_buffer(&[b"a\nb\nc"], None).await;

    assert_eq!(buffer.pull_line().unwrap().as_bytes(), b"a");
    assert_eq!(buffer.pull_line().unwrap().as_bytes(), b"b");
    assert!(!buffer.is_finished());

    let last = buffer.pull_line().unwrap();
    assert_eq!(last.as_bytes(), b"c");
    assert_eq!(last.ending(), LineEnding::None);
    assert_eq!(last.number(), 3);

    assert!(buffer.pull_line().is_none());
    assert!(buffer.is_finished());
    assert!(!buffer.is_readable());
}

#[tokio::test]
async fn output_is_independent_of_chunk_boundaries() {
    let mut buffer = ended_buffer(&[b"a\nb", b"\nc"], None).await;
    assert_eq!(drain_strings(&mut buffer), ["a", "b", "c"]);
    assert!(buffer.is_finished());
}

#[tokio::test]
async fn line_cap_stops_production_and_finishes() {
    let mut buffer = ended_buffer(&[b"a\nb\nc\n"], Some(2)).await;

    assert_eq!(drain_strings(&mut buffer), ["a", "b"]);
    assert_eq!(buffer.lines_consumed(), 2);
    assert!(buffer.is_finished());

    // The cap is permanent.
    assert!(buffer.pull_line().is_none());
    assert!(!buffer.is_readable());
}

#[tokio::test]
async fn zero_line_cap_is_finished_immediately() {
    let buffer = ended_buffer(&[b"a\n"], Some(0)).await;
    assert!(buffer.is_finished());
}

#[tokio::test]
async fn not_finished_until_end_is_observed() {
    let (tx, source) = source_with(&[b"a\n"]).await;
    let mut buffer = LineBuffer::new(source);

    assert_eq!(buffer.pull_line().unwrap().as_bytes(), b"a");
    assert!(buffer.pull_line().is_none());
    assert!(!buffer.is_finished());

    tx.end().await.unwrap();
    assert!(matches!(buffer.next_event().await, SourceEvent::End));
    assert!(buffer.is_closed());
    assert!(buffer.is_finished());
}

#[tokio::test]
async fn held_remainder_keeps_buffer_unfinished() {
    let (tx, source) = source_with(&[b"a\npartial"]).await;
    let mut buffer = LineBuffer::new(source);

    assert_eq!(drain_strings(&mut buffer), ["a"]);
    assert_eq!(buffer.remainder_len(), "partial".len());

    tx.end().await.unwrap();
    assert!(matches!(buffer.next_event().await, SourceEvent::End));
    assert!(!buffer.is_finished());
    assert!(buffer.is_readable());

    assert_eq!(drain_strings(&mut buffer), ["partial"]);
    assert!(buffer.is_finished());
}

#[tokio::test]
async fn recognizes_crlf_and_lf_terminators() {
    let mut buffer = ended_buffer(&[b"one\r\ntwo\nthree\r\n"], None).await;

    let one = buffer.pull_line().unwrap();
    let two = buffer.pull_line().unwrap();
    let three = buffer.pull_line().unwrap();

    assert_eq!((one.as_bytes(), one.ending()), (&b"one"[..], LineEnding::CrLf));
    assert_eq!((two.as_bytes(), two.ending()), (&b"two"[..], LineEnding::Lf));
    assert_eq!(
        (three.as_bytes(), three.ending()),
        (&b"three"[..], LineEnding::CrLf)
    );
    // A trailing terminator does not produce an extra empty line.
    assert!(buffer.pull_line().is_none());
    assert!(buffer.is_finished());
}

#[tokio::test]
async fn crlf_split_across_chunks_is_one_terminator() {
    let mut buffer = ended_buffer(&[b"a\r", b"\nb\n"], None).await;

    let a = buffer.pull_line().unwrap();
    assert_eq!(a.as_bytes(), b"a");
    assert_eq!(a.ending(), LineEnding::CrLf);
    assert_eq!(buffer.pull_line().unwrap().as_bytes(), b"b");
}

#[tokio::test]
async fn bare_carriage_return_is_content() {
    let mut buffer = ended_buffer(&[b"a\rb\n"], None).await;
    assert_eq!(buffer.pull_line().unwrap().as_bytes(), b"a\rb");
}

#[tokio::test]
async fn empty_lines_are_returned() {
    let mut buffer = ended_buffer(&[b"\n\nx\n"], None).await;
    assert_eq!(drain_strings(&mut buffer), ["", "", "x"]);
}

#[tokio::test]
async fn multibyte_character_split_across_chunks() {
    let text = "héllo\nwörld".as_bytes();
    let (head, tail) = text.split_at(2);
    let mut buffer = ended_buffer(&[head, tail], None).await;
    assert_eq!(drain_strings(&mut buffer), ["héllo", "wörld"]);
}

#[tokio::test]
async fn reconstructs_input_for_every_three_way_partition() {
    let input: &[u8] = b"ab\r\ncd\n\nef\r\ngh\r";

    for i in 0..=input.len() {
        for j in i..=input.len() {
            let mut buffer =
                ended_buffer(&[&input[..i], &input[i..j], &input[j..]], None).await;

            let mut rebuilt = Vec::new();
            while let Some(line) = buffer.pull_line() {
                rebuilt.extend_from_slice(line.as_bytes());
                rebuilt.extend_from_slice(line.ending().as_bytes());
            }

            assert!(buffer.is_finished(), "unfinished at split ({i}, {j})");
            assert_eq!(rebuilt, input, "mismatch at split ({i}, {j})");
        }
    }
}

#[tokio::test]
async fn lines_plus_remainder_reproduce_consumed_bytes() {
    let (_tx, source) = source_with(&[b"first\nsec", b"ond\nthi"]).await;
    let mut buffer = LineBuffer::new(source);

    let mut rebuilt = Vec::new();
    while let Some(line) = buffer.pull_line() {
        rebuilt.extend_from_slice(line.as_bytes());
        rebuilt.extend_from_slice(line.ending().as_bytes());
    }

    assert_eq!(rebuilt, b"first\nsecond\n");
    assert_eq!(buffer.remainder_len(), "thi".len());
}

#[tokio::test]
async fn pull_up_to_returns_at_most_n_lines() {
    let (_tx, source) = source_with(&[b"1\n2\n3\n4\n"]).await;
    let mut buffer = LineBuffer::new(source);

    let first = buffer.pull_up_to(3).unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(first[2].number(), 3);

    let rest = buffer.pull_up_to(5_usize).unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].as_bytes(), b"4");

    assert!(buffer.pull_up_to(0).unwrap().is_empty());
}

#[tokio::test]
async fn pull_up_to_rejects_negative_counts() {
    let (_tx, source) = source_with(&[b"1\n2\n"]).await;
    let mut buffer = LineBuffer::new(source);

    let err = buffer.pull_up_to(-1).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert_eq!(buffer.lines_consumed(), 0);

    // The rejected call did not disturb the buffer.
    assert_eq!(buffer.pull_up_to(2).unwrap().len(), 2);
}

#[tokio::test]
async fn readiness_follows_source_notifications() {
    let (tx, source) = chunk_channel(4);
    let mut buffer = LineBuffer::new(source);
    assert!(!buffer.is_readable());

    tx.send("x\n").await.unwrap();
    assert!(matches!(buffer.next_event().await, SourceEvent::Readable));
    assert!(buffer.is_readable());

    assert_eq!(buffer.pull_line().unwrap().as_bytes(), b"x");
    assert!(buffer.pull_line().is_none());
    assert!(!buffer.is_readable());

    tx.send("y\n").await.unwrap();
    assert!(matches!(buffer.next_event().await, SourceEvent::Readable));
    assert!(buffer.is_readable());
}

#[tokio::test]
async fn source_errors_are_forwarded() {
    let (tx, source) = chunk_channel(4);
    let mut buffer = LineBuffer::new(source);

    tx.fail(std::io::Error::other("disk on fire")).await.unwrap();

    match buffer.next_event().await {
        SourceEvent::Error(err) => assert_eq!(err.to_string(), "disk on fire"),
        other => panic!("expected error, got {other:?}"),
    }
    assert!(buffer.is_closed());
    assert!(!buffer.is_readable());
    assert!(!buffer.is_finished());
}

#[tokio::test]
async fn reader_source_pumps_async_reader() {
    let reader: &'static [u8] = b"alpha\r\nbeta\ngamma";
    let mut buffer = LineBuffer::new(ChunkSource::from_reader(reader, 4));

    let mut lines = Vec::new();
    loop {
        match buffer.next_event().await {
            SourceEvent::Readable | SourceEvent::End => {}
            SourceEvent::Error(err) => panic!("unexpected error: {err}"),
        }
        lines.extend(drain_strings(&mut buffer));
        if buffer.is_finished() {
            break;
        }
    }

    assert_eq!(lines, ["alpha", "beta", "gamma"]);
}

#[tokio::test]
async fn long_line_over_many_small_chunks_is_held_once() {
    const CHUNKS: usize = 2048;
    const CHUNK_LEN: usize = 64;

    let (tx, source) = chunk_channel(1);
    let mut buffer = LineBuffer::new(source);

    for n in 0..CHUNKS {
        tx.send(vec![b'a' + (n % 26) as u8; CHUNK_LEN]).await.unwrap();
        assert!(buffer.pull_line().is_none());
        assert_eq!(buffer.remainder_len(), (n + 1) * CHUNK_LEN);
    }
    tx.send("\r").await.unwrap();
    assert!(buffer.pull_line().is_none());
    tx.send("\nnext\n").await.unwrap();

    let line = buffer.pull_line().unwrap();
    assert_eq!(line.len(), CHUNKS * CHUNK_LEN);
    assert_eq!(line.ending(), LineEnding::CrLf);
    assert!(
        line.as_bytes()
            .chunks(CHUNK_LEN)
            .enumerate()
            .all(|(n, chunk)| chunk.iter().all(|&b| b == b'a' + (n % 26) as u8))
    );
    assert_eq!(buffer.pull_line().unwrap().as_bytes(), b"next");
    assert_eq!(buffer.remainder_len(), 0);
}

/// Source that reports its end as soon as its last chunk has been handed out.
struct EndsWithLastChunk {
    chunks: VecDeque<Bytes>,
}

impl EndsWithLastChunk {
    fn new(chunks: &[&'static [u8]]) -> Self {
        Self {
            chunks: chunks.iter().copied().map(Bytes::from_static).collect(),
        }
    }
}

impl ByteSource for EndsWithLastChunk {
    fn read(&mut self) -> Option<Bytes> {
        self.chunks.pop_front()
    }

    fn is_ended(&self) -> bool {
        self.chunks.is_empty()
    }

    async fn next_event(&mut self) -> SourceEvent {
        core::future::pending().await
    }
}

#[test]
fn last_chunk_fragment_becomes_a_line() {
    let mut buffer = LineBuffer::new(EndsWithLastChunk::new(&[b"ab", b"c\nd"]));

    let abc = buffer.pull_line().unwrap();
    assert_eq!(abc.as_bytes(), b"abc");
    assert_eq!(abc.ending(), LineEnding::Lf);

    let d = buffer.pull_line().unwrap();
    assert_eq!(d.as_bytes(), b"d");
    assert_eq!(d.ending(), LineEnding::None);

    assert!(buffer.pull_line().is_none());
    assert!(buffer.is_finished());
}

#[test]
fn last_chunk_without_terminator_flushes_the_remainder() {
    let mut buffer = LineBuffer::new(EndsWithLastChunk::new(&[b"x\ny", b"z"]));

    assert_eq!(drain_strings(&mut buffer), ["x", "yz"]);
    assert_eq!(buffer.remainder_len(), 0);
    assert!(buffer.is_finished());
}
