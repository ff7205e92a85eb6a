use crate::common::*;

/// Shuffles a stream with a bounded reservoir.
///
/// The reservoir is filled with up to `buffer_size` items. Each pull emits a
/// uniformly chosen item from the reservoir, which is refilled from the input
/// until the input is exhausted.
pub fn reservoir_shuffle<S, R>(
    stream: S,
    buffer_size: usize,
    rng: R,
) -> impl Stream<Item = S::Item>
where
    S: Stream,
    R: Rng,
{
    struct State<S, T, R> {
        stream: Pin<Box<S>>,
        buffer: Vec<T>,
        buffer_size: usize,
        exhausted: bool,
        rng: R,
    }

    let state = State {
        stream: Box::pin(stream),
        buffer: vec![],
        buffer_size: buffer_size.max(1),
        exhausted: false,
        rng,
    };

    stream::unfold(state, |mut state| async move {
        while !state.exhausted && state.buffer.len() < state.buffer_size {
            match state.stream.next().await {
                Some(item) => state.buffer.push(item),
                None => state.exhausted = true,
            }
        }

        if state.buffer.is_empty() {
            return None;
        }

        let index = state.rng.gen_range(0..state.buffer.len());
        let item = state.buffer.swap_remove(index);
        Some((item, state))
    })
}

/// Repeats passes indefinitely. `make_pass` is called with the pass index
/// each time the previous pass is exhausted.
pub fn repeat_passes<F, S>(mut make_pass: F) -> impl Stream<Item = S::Item>
where
    F: FnMut(usize) -> S,
    S: Stream,
{
    stream::iter(0..).flat_map(move |epoch| make_pass(epoch))
}
