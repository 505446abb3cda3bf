use crate::models::MediaId;

/// One item placed in a masonry column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnItem {
    pub media_id: MediaId,
    /// Position in the visible prefix; the lightbox opens at this index.
    pub prefix_index: usize,
    /// Weight this item added to the column's running height.
    pub height_units: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnModel {
    pub column_index: u32,
    pub height_units: u64,
    pub items: Vec<ColumnItem>,
}

impl ColumnModel {
    pub fn new(column_index: u32) -> Self {
        Self {
            column_index,
            height_units: 0,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, item: ColumnItem) {
        self.height_units += u64::from(item.height_units);
        self.items.push(item);
    }
}
