use crate::resize::error::{ErrorKind, Result};
use lowres_storage::{Cursor, ListingPage};

/// Where a folder listing stands between two remote calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Pagination {
    /// Nothing fetched yet; the next call is the initial listing.
    NeedFirstPage,
    /// The next call continues from this cursor.
    NeedNextPage(Cursor),
    /// The last page has been seen.
    Done,
}

impl Pagination {
    /// State following the receipt of `page`.
    ///
    /// Fails with [`ErrorKind::Pagination`] if the page claims there is more
    /// to come but carries no cursor to fetch it with.
    pub fn after(page: &ListingPage) -> Result<Self> {
        match (page.has_more, &page.cursor) {
            (false, _) => Ok(Self::Done),
            (true, Some(cursor)) => Ok(Self::NeedNextPage(cursor.clone())),
            (true, None) => exn::bail!(ErrorKind::Pagination),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}
