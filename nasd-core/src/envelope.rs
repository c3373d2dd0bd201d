//! Response envelope and pagination, per §3 / §4.9: every non-streaming HTTP
//! response carries exactly one of `data`/`error`, plus metadata.

use serde::{Deserialize, Serialize};

use crate::clock::unix_now_secs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub correlation_id: String,
    pub version: String,
    pub timestamp: u64,
}

impl Metadata {
    pub fn new(correlation_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            version: version.into(),
            timestamp: unix_now_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageDescriptor {
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageDescriptor {
    pub fn new(page: u32, page_size: u32, total_items: u64) -> Self {
        let total_pages = if total_items == 0 {
            1
        } else {
            ((total_items + page_size as u64 - 1) / page_size as u64) as u32
        };
        Self {
            page,
            page_size,
            total_pages,
            total_items,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }
}

/// A page request accepted on paginated endpoints: `page >= 1`,
/// `page_size` in `[1, 1000]`, default 50.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}
fn default_page_size() -> u32 {
    50
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PageQuery {
    /// Clamp to the legal range: page >= 1, page_size in [1, 1000].
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, 1000),
        }
    }

    /// Slice `items` to the requested page, returning the slice and the
    /// page descriptor describing the full set.
    pub fn paginate<T: Clone>(self, items: &[T]) -> (Vec<T>, PageDescriptor) {
        let q = self.normalized();
        let total_items = items.len() as u64;
        let start = ((q.page - 1) as u64 * q.page_size as u64) as usize;
        let end = (start + q.page_size as usize).min(items.len());
        let slice = if start >= items.len() {
            Vec::new()
        } else {
            items[start..end].to_vec()
        };
        (slice, PageDescriptor::new(q.page, q.page_size, total_items))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageDescriptor>,
    pub metadata: Metadata,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T, correlation_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            data: Some(data),
            page: None,
            metadata: Metadata::new(correlation_id, version),
        }
    }

    pub fn paginated(
        data: T,
        page: PageDescriptor,
        correlation_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            data: Some(data),
            page: Some(page),
            metadata: Metadata::new(correlation_id, version),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_descriptor_computes_bounds() {
        let p = PageDescriptor::new(2, 50, 120);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next);
        assert!(p.has_prev);
    }

    #[test]
    fn page_descriptor_single_page_when_empty() {
        let p = PageDescriptor::new(1, 50, 0);
        assert_eq!(p.total_pages, 1);
        assert!(!p.has_next);
        assert!(!p.has_prev);
    }

    #[test]
    fn page_query_clamps_page_size() {
        let q = PageQuery {
            page: 0,
            page_size: 5000,
        }
        .normalized();
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, 1000);
    }

    #[test]
    fn paginate_slices_correctly() {
        let items: Vec<u32> = (1..=125).collect();
        let (slice, page) = PageQuery {
            page: 3,
            page_size: 50,
        }
        .paginate(&items);
        assert_eq!(slice, (101..=125).collect::<Vec<_>>());
        assert_eq!(page.total_pages, 3);
        assert!(!page.has_next);
    }
}
