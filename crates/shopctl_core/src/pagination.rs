use anyhow::{Result, bail};

/// One page of a remote list query: the items plus the total the server
/// reported at that moment.
#[derive(Debug, Clone, Default)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: usize,
}

/// Fetch an entire remote collection through an offset-paginated list query.
///
/// `fetch_page(skip, take)` is called with an increasing offset until the
/// accumulated count reaches the total reported by the most recent page.
/// The latest total wins on purpose: these runs are offline batch jobs, and
/// slightly over- or under-fetching when the collection changes underneath
/// us is acceptable. An empty page always terminates the loop so a shrinking
/// total cannot spin forever.
pub fn fetch_all<T, F>(page_size: usize, mut fetch_page: F) -> Result<Vec<T>>
where
    F: FnMut(usize, usize) -> Result<Page<T>>,
{
    if page_size == 0 {
        bail!("page size must be greater than zero");
    }

    let mut items: Vec<T> = Vec::new();
    loop {
        let page = fetch_page(items.len(), page_size)?;
        let fetched = page.items.len();
        let total = page.total_items;
        items.extend(page.items);
        if fetched == 0 || items.len() >= total {
            break;
        }
    }
    Ok(items)
}
