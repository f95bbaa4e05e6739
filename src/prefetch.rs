/// Whether the card at `index` should start loading its media and content.
///
/// Only the active card and the one right after it qualify. Before any card
/// is active the first card stands in for it.
pub fn should_load(index: usize, active_index: Option<usize>) -> bool {
    let active = active_index.unwrap_or(0);
    index == active || index == active + 1
}

/// Indices worth loading in a feed of `len` cards.
pub fn plan(len: usize, active_index: Option<usize>) -> Vec<usize> {
    let active = active_index.unwrap_or(0);
    [active, active + 1]
        .into_iter()
        .filter(|idx| *idx < len)
        .collect()
}
