//! Generic filterable list with a selection cursor and variable-height rows.

pub struct ScrollableList<T> {
    pub items: Vec<T>,
    pub filtered_indices: Vec<usize>,
    pub selected: usize,
    /// First visible position in `filtered_indices`.
    pub scroll_offset: usize,
    pub filter: String,
    filter_fn: Box<dyn Fn(&T, &str) -> bool + Send + Sync>,
}

impl<T> ScrollableList<T> {
    pub fn new(filter_fn: impl Fn(&T, &str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            items: Vec::new(),
            filtered_indices: Vec::new(),
            selected: 0,
            scroll_offset: 0,
            filter: String::new(),
            filter_fn: Box::new(filter_fn),
        }
    }

    /// Replace the items, keeping the cursor on the item for which `same`
    /// returns true if it is still present.
    pub fn set_items_keeping(&mut self, items: Vec<T>, same: impl Fn(&T, &T) -> bool) {
        let prev = self.selected_item().map(|cur| {
            items
                .iter()
                .position(|candidate| same(cur, candidate))
        });
        self.items = items;
        self.rebuild_filter();
        if let Some(Some(orig)) = prev {
            self.set_selected_by_original(orig);
        }
        self.clamp_scroll();
    }

    pub fn set_filter(&mut self, query: &str) {
        self.filter = query.to_string();
        let old_idx = self.filtered_indices.get(self.selected).copied();
        self.rebuild_filter();
        // Keep the same item selected after a filter change
        self.selected = old_idx
            .and_then(|prev| self.filtered_indices.iter().position(|&i| i == prev))
            .unwrap_or(0);
        self.scroll_offset = 0;
    }

    pub fn rebuild_filter(&mut self) {
        if self.filter.is_empty() {
            self.filtered_indices = (0..self.items.len()).collect();
        } else {
            self.filtered_indices = self
                .items
                .iter()
                .enumerate()
                .filter(|(_, item)| (self.filter_fn)(item, &self.filter))
                .map(|(i, _)| i)
                .collect();
        }
        if self.selected >= self.filtered_indices.len() {
            self.selected = self.filtered_indices.len().saturating_sub(1);
        }
    }

    pub fn select_up(&mut self, n: usize) {
        if self.filtered_indices.is_empty() {
            return;
        }
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn select_down(&mut self, n: usize) {
        if self.filtered_indices.is_empty() {
            return;
        }
        self.selected = (self.selected + n).min(self.filtered_indices.len().saturating_sub(1));
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.filtered_indices.len().saturating_sub(1);
    }

    /// Move the cursor to filtered position `pos`.
    pub fn select_position(&mut self, pos: usize) -> bool {
        if pos < self.filtered_indices.len() {
            self.selected = pos;
            true
        } else {
            false
        }
    }

    pub fn selected_item(&self) -> Option<&T> {
        let idx = self.filtered_indices.get(self.selected)?;
        self.items.get(*idx)
    }

    /// Item at filtered position `pos`.
    pub fn item_at(&self, pos: usize) -> Option<&T> {
        let idx = self.filtered_indices.get(pos)?;
        self.items.get(*idx)
    }

    pub fn set_selected_by_original(&mut self, orig_idx: usize) {
        if let Some(pos) = self.filtered_indices.iter().position(|&i| i == orig_idx) {
            self.selected = pos;
        }
    }

    /// Select the first item matching `pred`.  Returns false if none does.
    pub fn select_where(&mut self, pred: impl Fn(&T) -> bool) -> bool {
        let found = self
            .filtered_indices
            .iter()
            .position(|&i| pred(&self.items[i]));
        match found {
            Some(pos) => {
                self.selected = pos;
                true
            }
            None => false,
        }
    }

    /// Adjust `scroll_offset` so the selected row fits in `height` rows,
    /// where `row_height(pos)` is the height of the row at filtered `pos`.
    pub fn ensure_visible_by(&mut self, height: usize, row_height: impl Fn(usize) -> usize) {
        if height == 0 || self.filtered_indices.is_empty() {
            self.scroll_offset = 0;
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
            return;
        }
        // Walk back from the selection until the rows no longer fit.
        let mut used = row_height(self.selected);
        let mut first = self.selected;
        while first > self.scroll_offset {
            let h = row_height(first - 1);
            if used + h > height {
                break;
            }
            used += h;
            first -= 1;
        }
        if first > self.scroll_offset {
            self.scroll_offset = first;
        }
    }

    fn clamp_scroll(&mut self) {
        if self.scroll_offset > self.selected {
            self.scroll_offset = self.selected;
        }
    }

    pub fn len(&self) -> usize {
        self.filtered_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered_indices.is_empty()
    }

    pub fn total_len(&self) -> usize {
        self.items.len()
    }
}
