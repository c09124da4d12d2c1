use crate::cache::CacheMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page_index: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_page: usize,
    pub count: usize,
}

impl PageInfo {
    pub fn is_first_page(&self) -> bool {
        self.page_index == 1
    }

    pub fn is_last_page(&self) -> bool {
        self.page_index == self.total_page
    }

    pub fn has_previous_page(&self) -> bool {
        self.page_index > 1
    }

    pub fn has_next_page(&self) -> bool {
        self.page_index < self.total_page
    }

    // Позиция первого элемента страницы (с 1), 0 для пустой страницы
    pub fn first_item_on_page(&self) -> usize {
        if self.count == 0 {
            return 0;
        }
        self.page_size * (self.page_index - 1) + 1
    }

    pub fn last_item_on_page(&self) -> usize {
        if self.count == 0 {
            return 0;
        }
        self.first_item_on_page() + self.count - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub mode: CacheMode,
    pub is_cached: bool,
    pub suspend_depth: usize,
    pub reloads: u64,
}

impl CacheStats {
    pub fn is_suspended(&self) -> bool {
        self.suspend_depth > 0
    }
}

// Производные величины пагинации.
// Пустой источник даёт одну пустую страницу.
#[inline]
pub fn total_page_for(total_count: usize, page_size: usize) -> usize {
    if total_count == 0 {
        return 1;
    }
    (total_count - 1) / page_size + 1
}

#[inline]
pub fn page_count_for(total_count: usize, page_size: usize, page_index: usize) -> usize {
    let total_page = total_page_for(total_count, page_size);
    if page_index < total_page {
        page_size
    } else if page_index == total_page {
        total_count - page_size * (total_page - 1)
    } else {
        0
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_total_page() {
        assert_eq!(total_page_for(25, 10), 3);
        assert_eq!(total_page_for(30, 10), 3);
        assert_eq!(total_page_for(1, 10), 1);
        assert_eq!(total_page_for(0, 10), 1);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count_for(25, 10, 1), 10);
        assert_eq!(page_count_for(25, 10, 3), 5);
        assert_eq!(page_count_for(30, 10, 3), 10);
        assert_eq!(page_count_for(0, 10, 1), 0);
        assert_eq!(page_count_for(25, 10, 4), 0);
    }

    #[test]
    fn test_page_info_positions() {
        let info = PageInfo { page_index: 3, page_size: 10, total_count: 25, total_page: 3, count: 5 };
        assert!(info.is_last_page());
        assert!(!info.has_next_page());
        assert!(info.has_previous_page());
        assert_eq!(info.first_item_on_page(), 21);
        assert_eq!(info.last_item_on_page(), 25);

        let empty = PageInfo { page_index: 1, page_size: 10, total_count: 0, total_page: 1, count: 0 };
        assert!(empty.is_first_page() && empty.is_last_page());
        assert_eq!(empty.first_item_on_page(), 0);
        assert_eq!(empty.last_item_on_page(), 0);
    }
}
