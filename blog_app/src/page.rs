use serde::Serialize;

/// Pagination window over `item_count` items.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page {
    pub item_count: u64,
    pub page_index: u64,
    pub page_size: u64,
    pub page_count: u64,
    pub offset: u64,
    pub limit: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl Page {
    pub fn new(item_count: u64, page_index: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        let page_count = item_count.div_ceil(page_size);
        let (page_index, offset, limit) = if item_count == 0 || page_index > page_count {
            (1, 0, 0)
        } else {
            let index = page_index.max(1);
            (index, page_size * (index - 1), page_size)
        };
        Page {
            item_count,
            page_index,
            page_size,
            page_count,
            offset,
            limit,
            has_next: page_index < page_count,
            has_previous: page_index > 1,
        }
    }
}

/// Parse a `page` argument; anything unparsable or below 1 is page 1.
pub fn page_index(page: Option<&str>) -> u64 {
    page.and_then(|p| p.trim().parse::<u64>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows() {
        let p = Page::new(91, 3, 10);
        assert_eq!((p.page_count, p.offset, p.limit), (10, 20, 10));
        assert!(p.has_next && p.has_previous);
        let p = Page::new(0, 1, 10);
        assert_eq!((p.page_count, p.offset, p.limit), (0, 0, 0));
        assert!(!p.has_next);
        let p = Page::new(5, 9, 10);
        assert_eq!((p.page_index, p.limit), (1, 0));
    }

    #[test]
    fn parses_page_index() {
        assert_eq!(page_index(Some("3")), 3);
        assert_eq!(page_index(Some("0")), 1);
        assert_eq!(page_index(Some("x")), 1);
        assert_eq!(page_index(None), 1);
    }
}
