use crate::model::TranscriptChunk;

/// Seconds a chunk stays on screen after its window closes.
pub const DEFAULT_GRACE: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Located<'a> {
    pub text: &'a str,
    pub index: Option<usize>,
}

impl<'a> Located<'a> {
    fn found(chunks: &'a [TranscriptChunk], index: usize) -> Self {
        Self {
            text: &chunks[index].text,
            index: Some(index),
        }
    }

    pub fn is_found(&self) -> bool {
        self.index.is_some()
    }
}

/// Finds the chunk to display at `position`.
///
/// A chunk whose `[start, end)` window holds the position wins. Otherwise the
/// latest chunk that already started is kept for `grace` seconds past its end.
pub fn locate(chunks: &[TranscriptChunk], position: f64, grace: f64) -> Located<'_> {
    if let Some(index) = chunks
        .iter()
        .position(|chunk| chunk.start() <= position && position < chunk.end())
    {
        return Located::found(chunks, index);
    }

    let latest = chunks
        .iter()
        .enumerate()
        .filter(|(_, chunk)| chunk.start() <= position)
        .fold(None::<(usize, &TranscriptChunk)>, |best, (idx, chunk)| match best {
            Some((_, current)) if current.start() >= chunk.start() => best,
            _ => Some((idx, chunk)),
        });

    match latest {
        Some((index, chunk)) if position <= chunk.end() + grace => Located::found(chunks, index),
        _ => Located::default(),
    }
}

/// Text of the chunk shown at `position`, empty when nothing is on screen.
pub fn text_at(chunks: &[TranscriptChunk], position: f64) -> &str {
    locate(chunks, position, DEFAULT_GRACE).text
}

/// Chunks whose window overlaps `[from, to]`, in transcript order.
pub fn visible_between(chunks: &[TranscriptChunk], from: f64, to: f64) -> Vec<&TranscriptChunk> {
    chunks
        .iter()
        .filter(|chunk| chunk.start() <= to && chunk.end() >= from)
        .collect()
}
