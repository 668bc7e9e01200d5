use std::ops::Range;

use serde::Deserialize;

pub const DEFAULT_INITIAL_COUNT: usize = 50;
pub const DEFAULT_LOAD_STEP: usize = 50;
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_CARDS_PER_BATCH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// One growing list; "request more" appends another step.
    #[default]
    Infinite,
    /// Fixed-size pages, each revealed in batches.
    Paged,
}

/// Lifecycle of a growing cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Collapsed,
    Expanding,
    Saturated,
}

/// A count that grows by `step` toward `bound`.
///
/// The cursor never drops below its initial value (clamped to the bound), so a
/// transient shrink of the upstream list does not leave the view stuck small.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    initial: usize,
    step: usize,
    value: usize,
    bound: usize,
}

impl Cursor {
    pub fn new(initial: usize, step: usize) -> Self {
        let initial = initial.max(1);
        Self {
            initial,
            step: step.max(1),
            value: initial,
            bound: usize::MAX,
        }
    }

    pub fn value(&self) -> usize {
        self.value.min(self.bound)
    }

    pub fn state(&self) -> CursorState {
        if self.value >= self.bound {
            CursorState::Saturated
        } else if self.value <= self.initial {
            CursorState::Collapsed
        } else {
            CursorState::Expanding
        }
    }

    /// Grow by one step. Returns `false` when already saturated.
    pub fn request_more(&mut self) -> bool {
        if self.state() == CursorState::Saturated {
            return false;
        }
        self.value = self.value.saturating_add(self.step).min(self.bound);
        true
    }

    pub fn rebound(&mut self, bound: usize) {
        self.bound = bound;
        let floor = self.initial.min(bound);
        self.value = self.value.min(bound).max(floor);
    }

    pub fn reset(&mut self) {
        self.value = self.initial.min(self.bound);
    }
}

/// Window sizing knobs, as read from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSettings {
    pub mode: WindowMode,
    pub initial_count: usize,
    pub load_step: usize,
    pub page_size: usize,
    pub cards_per_batch: usize,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            mode: WindowMode::Infinite,
            initial_count: DEFAULT_INITIAL_COUNT,
            load_step: DEFAULT_LOAD_STEP,
            page_size: DEFAULT_PAGE_SIZE,
            cards_per_batch: DEFAULT_CARDS_PER_BATCH,
        }
    }
}

/// Snapshot of the window for pagination controls and status lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowStatus {
    pub mode: WindowMode,
    pub shown: usize,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
    pub cursor: CursorState,
}

/// The bounded slice of the filtered sequence that is exposed for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    mode: WindowMode,
    infinite: Cursor,
    page_size: usize,
    page: usize,
    in_page: Cursor,
    total: usize,
}

impl Window {
    pub fn new(settings: WindowSettings) -> Self {
        let page_size = settings.page_size.max(1);
        Self {
            mode: settings.mode,
            infinite: Cursor::new(settings.initial_count, settings.load_step),
            page_size,
            page: 1,
            in_page: Cursor::new(settings.cards_per_batch, settings.cards_per_batch),
            total: 0,
        }
        .rebounded(0)
    }

    pub fn infinite() -> Self {
        Self::new(WindowSettings::default())
    }

    pub fn paged(page_size: usize) -> Self {
        Self::new(WindowSettings {
            mode: WindowMode::Paged,
            page_size,
            ..WindowSettings::default()
        })
    }

    fn rebounded(mut self, total: usize) -> Self {
        self.rebound(total);
        self
    }

    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.page_size)
    }

    /// Switching modes starts both cursors over.
    pub fn set_mode(&mut self, mode: WindowMode) {
        self.mode = mode;
        self.reset();
    }

    /// Page sizes below one are clamped to one.
    pub fn set_page_size(&mut self, page_size: usize) {
        if page_size == 0 {
            tracing::warn!("page size must be at least 1, clamping");
        }
        self.page_size = page_size.max(1);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.page = 1;
        self.rebound(self.total);
        self.infinite.reset();
        self.in_page.reset();
    }

    /// Adopt a new upstream length, clamping the page and both cursors.
    pub fn rebound(&mut self, total: usize) {
        self.total = total;
        self.page = self.page.clamp(1, self.total_pages().max(1));
        self.infinite.rebound(total);
        self.in_page.rebound(self.page_len());
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages().max(1));
        self.in_page.rebound(self.page_len());
        self.in_page.reset();
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.go_to_page(self.page.saturating_sub(1));
    }

    /// Reveal another batch. Returns `false` if the active cursor was already saturated.
    pub fn request_more(&mut self) -> bool {
        match self.mode {
            WindowMode::Infinite => self.infinite.request_more(),
            WindowMode::Paged => self.in_page.request_more(),
        }
    }

    pub fn cursor_state(&self) -> CursorState {
        match self.mode {
            WindowMode::Infinite => self.infinite.state(),
            WindowMode::Paged => self.in_page.state(),
        }
    }

    pub fn range(&self) -> Range<usize> {
        match self.mode {
            WindowMode::Infinite => 0..self.infinite.value(),
            WindowMode::Paged => {
                let start = self.page_start();
                start..start + self.in_page.value()
            }
        }
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let range = self.range();
        let end = range.end.min(items.len());
        let start = range.start.min(end);
        &items[start..end]
    }

    pub fn status(&self) -> WindowStatus {
        WindowStatus {
            mode: self.mode,
            shown: self.range().len(),
            total: self.total,
            page: self.page,
            total_pages: self.total_pages(),
            cursor: self.cursor_state(),
        }
    }

    fn page_start(&self) -> usize {
        (self.page - 1) * self.page_size
    }

    fn page_len(&self) -> usize {
        self.total
            .saturating_sub(self.page_start())
            .min(self.page_size)
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::infinite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn infinite_grows_by_step_and_saturates_at_total() {
        let mut window = Window::infinite();
        window.rebound(120);
        assert_eq!(window.range(), 0..50);
        assert_eq!(window.cursor_state(), CursorState::Collapsed);

        assert!(window.request_more());
        assert_eq!(window.range(), 0..100);
        assert_eq!(window.cursor_state(), CursorState::Expanding);

        assert!(window.request_more());
        assert_eq!(window.range(), 0..120);
        assert_eq!(window.cursor_state(), CursorState::Saturated);
        assert!(!window.request_more());
    }

    #[test]
    fn shrinking_upstream_saturates_at_new_bound() {
        let mut window = Window::infinite();
        window.rebound(500);
        window.request_more();
        window.request_more();
        assert_eq!(window.range(), 0..150);

        window.rebound(30);
        assert_eq!(window.range(), 0..30);
        assert_eq!(window.cursor_state(), CursorState::Saturated);

        window.rebound(500);
        assert_eq!(window.range(), 0..50);
    }

    #[test]
    fn page_count_and_clamping() {
        let mut window = Window::paged(50);
        window.rebound(125);
        assert_eq!(window.total_pages(), 3);

        window.go_to_page(4);
        assert_eq!(window.page(), 3);
        window.go_to_page(0);
        assert_eq!(window.page(), 1);

        window.prev_page();
        assert_eq!(window.page(), 1);
        window.next_page();
        window.next_page();
        window.next_page();
        assert_eq!(window.page(), 3);
    }

    #[test]
    fn in_page_batches_grow_toward_page_size() {
        let mut window = Window::paged(50);
        window.rebound(125);
        assert_eq!(window.range(), 0..20);
        window.request_more();
        assert_eq!(window.range(), 0..40);
        window.request_more();
        assert_eq!(window.range(), 0..50);
        assert_eq!(window.cursor_state(), CursorState::Saturated);

        window.next_page();
        assert_eq!(window.range(), 50..70);

        window.go_to_page(3);
        assert_eq!(window.range(), 100..120);
        window.request_more();
        assert_eq!(window.range(), 100..125);
        assert!(!window.request_more());
    }

    #[test]
    fn small_pages_show_whole_page_at_once() {
        let mut window = Window::paged(5);
        window.rebound(12);
        assert_eq!(window.range(), 0..5);
        assert_eq!(window.cursor_state(), CursorState::Saturated);
    }

    #[test]
    fn switching_mode_resets_cursors() {
        let mut window = Window::paged(50);
        window.rebound(200);
        window.go_to_page(3);
        window.request_more();

        window.set_mode(WindowMode::Infinite);
        assert_eq!(window.page(), 1);
        assert_eq!(window.range(), 0..50);

        window.request_more();
        window.set_mode(WindowMode::Paged);
        assert_eq!(window.range(), 0..20);
    }

    #[test]
    fn zero_page_size_clamps_to_one() {
        let mut window = Window::paged(0);
        assert_eq!(window.page_size(), 1);
        window.set_page_size(0);
        window.rebound(3);
        assert_eq!(window.total_pages(), 3);
        assert_eq!(window.range(), 0..1);
    }

    #[test]
    fn empty_upstream_has_one_empty_page() {
        let mut window = Window::paged(10);
        window.rebound(0);
        window.go_to_page(7);
        assert_eq!(window.page(), 1);
        assert!(window.range().is_empty());
        assert_eq!(window.slice::<u8>(&[]).len(), 0);
    }

    proptest! {
        #[test]
        fn window_never_exceeds_bounds(
            total in 0usize..400,
            page_size in 0usize..80,
            paged in any::<bool>(),
            requests in 0usize..12,
            page in 0usize..12,
        ) {
            let mut window = if paged { Window::paged(page_size) } else { Window::infinite() };
            window.rebound(total);
            window.go_to_page(page);
            for _ in 0..requests {
                window.request_more();
            }
            let items: Vec<usize> = (0..total).collect();
            let shown = window.slice(&items);
            prop_assert!(shown.len() <= total);
            if paged {
                prop_assert!(shown.len() <= page_size.max(1));
            }
            prop_assert_eq!(shown.len(), window.status().shown);
        }
    }
}
