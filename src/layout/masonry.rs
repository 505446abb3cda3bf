use crate::models::{ColumnItem, ColumnModel, MediaItem};

/// Viewport widths (logical pixels) at which the grid gains a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoints {
    /// Width from which three columns are used (default: 768)
    pub medium: u32,
    /// Width from which four columns are used (default: 1024)
    pub wide: u32,
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            medium: 768,
            wide: 1024,
        }
    }
}

/// Greedy shortest-column masonry packer.
///
/// Each item goes to the column with the smallest accumulated height weight
/// (ties go to the lowest column index). This balances columns well enough for
/// display; it does not search for an optimal partition.
#[derive(Debug, Clone, Default)]
pub struct MasonryLayout {
    pub breakpoints: Breakpoints,
}

impl MasonryLayout {
    pub fn new(breakpoints: Breakpoints) -> Self {
        Self { breakpoints }
    }

    /// `<medium → 2`, `medium..wide → 3`, `≥wide → 4`.
    pub fn column_count(&self, viewport_width: f32) -> u32 {
        if !viewport_width.is_finite() {
            return 2;
        }
        if viewport_width >= self.breakpoints.wide as f32 {
            4
        } else if viewport_width >= self.breakpoints.medium as f32 {
            3
        } else {
            2
        }
    }

    /// Distributes `items` (in order) across `column_count` columns.
    ///
    /// # Returns
    /// No columns for an empty input, otherwise exactly `max(column_count, 1)`
    /// columns whose item counts sum to `items.len()`.
    pub fn pack(&self, items: &[MediaItem], column_count: u32) -> Vec<ColumnModel> {
        if items.is_empty() {
            return Vec::new();
        }

        let column_count = column_count.max(1);
        let mut columns: Vec<ColumnModel> = (0..column_count).map(ColumnModel::new).collect();

        for (prefix_index, item) in items.iter().enumerate() {
            let target = shortest_column(&columns);
            columns[target].push(ColumnItem {
                media_id: item.id.clone(),
                prefix_index,
                height_units: item.height_weight(),
            });
        }

        columns
    }
}

fn shortest_column(columns: &[ColumnModel]) -> usize {
    let mut best = 0;
    for (index, column) in columns.iter().enumerate().skip(1) {
        if column.height_units < columns[best].height_units {
            best = index;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaSource, MediaType};

    fn make_item(id: usize, hint: Option<&str>) -> MediaItem {
        let item = MediaItem::new(
            id,
            MediaSource::Path(format!("{}.jpg", id).into()),
            MediaType::Image,
        );
        match hint {
            Some(hint) => item.with_height(hint),
            None => item,
        }
    }

    #[test]
    fn test_column_count_breakpoints() {
        let layout = MasonryLayout::default();
        assert_eq!(layout.column_count(320.0), 2);
        assert_eq!(layout.column_count(767.9), 2);
        assert_eq!(layout.column_count(768.0), 3);
        assert_eq!(layout.column_count(1023.0), 3);
        assert_eq!(layout.column_count(1024.0), 4);
        assert_eq!(layout.column_count(2560.0), 4);
    }

    #[test]
    fn test_empty_items() {
        let layout = MasonryLayout::default();
        assert!(layout.pack(&[], 4).is_empty());
    }

    #[test]
    fn test_greedy_assignment_prefers_lowest_index_on_ties() {
        let layout = MasonryLayout::default();
        let items = vec![
            make_item(0, Some("h-64")),
            make_item(1, Some("h-48")),
            make_item(2, Some("h-96")),
            make_item(3, None),
            make_item(4, Some("h-48")),
        ];

        let columns = layout.pack(&items, 3);
        let ids: Vec<Vec<usize>> = columns
            .iter()
            .map(|c| c.items.iter().map(|i| i.prefix_index).collect())
            .collect();

        // 0 -> col0 (64), 1 -> col1 (48), 2 -> col2 (96),
        // 3 -> col1 (49), 4 -> col1 (97)
        assert_eq!(ids, vec![vec![0], vec![1, 3, 4], vec![2]]);
        assert_eq!(columns[1].height_units, 97);
    }

    #[test]
    fn test_unhinted_items_round_robin() {
        let layout = MasonryLayout::default();
        let items: Vec<MediaItem> = (0..8).map(|i| make_item(i, None)).collect();
        let columns = layout.pack(&items, 4);
        for column in &columns {
            assert_eq!(column.items.len(), 2);
        }
        assert_eq!(columns[0].items[1].prefix_index, 4);
    }

    #[test]
    fn test_conservation_for_any_column_count() {
        let layout = MasonryLayout::default();
        let hints = [Some("h-48"), None, Some("h-96"), Some("h-64"), Some("bogus")];
        let items: Vec<MediaItem> = (0..37).map(|i| make_item(i, hints[i % hints.len()])).collect();

        for k in 0..8 {
            let columns = layout.pack(&items, k);
            assert_eq!(columns.len() as u32, k.max(1));

            let mut seen: Vec<usize> = columns
                .iter()
                .flat_map(|c| c.items.iter().map(|i| i.prefix_index))
                .collect();
            seen.sort_unstable();
            assert_eq!(seen, (0..items.len()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_columns_stay_balanced() {
        let layout = MasonryLayout::default();
        let items: Vec<MediaItem> = (0..40)
            .map(|i| make_item(i, Some(if i % 3 == 0 { "h-96" } else { "h-48" })))
            .collect();
        let columns = layout.pack(&items, 4);
        let max = columns.iter().map(|c| c.height_units).max().unwrap();
        let min = columns.iter().map(|c| c.height_units).min().unwrap();
        // Greedy placement never lets the spread exceed the heaviest single item.
        assert!(max - min <= 96, "spread {} too large", max - min);
    }
}
