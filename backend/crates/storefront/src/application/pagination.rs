//! Paginated Collection Reader
//!
//! One protocol for paging through `products`, `users` and `categories`:
//! newest first by `created_at`, ties broken by id, resumed from an opaque
//! cursor. Each read is independent; accumulation belongs to the caller
//! (see [`PageAccumulator`]).
//!
//! A full page always carries a cursor, so a collection whose size is an
//! exact multiple of the page size costs one extra, empty read. Pages are not
//! de-duplicated: a record created between two reads shifts the ordering and
//! can make the next page repeat an item.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kernel::page::{Cursor, Page};
use serde::{Deserialize, Serialize};

use crate::domain::repository::{Document, PagePosition, PagedCollection};
use crate::domain::value_object::collection::Collection;
use crate::error::{CursorError, StorefrontError, StorefrontResult};

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CursorPayload {
    collection: Collection,
    created_at: DateTime<Utc>,
    id: String,
}

/// Encode a position as a base64url JSON cursor
pub fn encode_cursor(collection: Collection, position: &PagePosition) -> StorefrontResult<Cursor> {
    let payload = CursorPayload {
        collection,
        created_at: position.created_at,
        id: position.id.clone(),
    };
    let bytes = serde_json::to_vec(&payload)
        .map_err(|e| StorefrontError::Internal(format!("cursor encoding failed: {e}")))?;
    Ok(Cursor::new(platform::crypto::to_base64url(&bytes)))
}

/// Decode a cursor issued for `expected`
pub fn decode_cursor(expected: Collection, cursor: &Cursor) -> Result<PagePosition, CursorError> {
    let bytes =
        platform::crypto::from_base64url(cursor.as_str()).map_err(|_| CursorError::Encoding)?;
    let payload: CursorPayload =
        serde_json::from_slice(&bytes).map_err(|_| CursorError::Payload)?;

    if payload.collection != expected {
        return Err(CursorError::WrongCollection {
            issued_for: payload.collection,
            expected,
        });
    }
    if payload.id.is_empty() {
        return Err(CursorError::Payload);
    }

    Ok(PagePosition {
        created_at: payload.created_at,
        id: payload.id,
    })
}

/// Stateless page reader over any store implementing [`PagedCollection`]
pub struct PaginatedReader<S> {
    store: Arc<S>,
}

impl<S> Clone for PaginatedReader<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> PaginatedReader<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Read one page of `T`, newest first.
    ///
    /// `next_cursor` is `Some` exactly when the page is full. Store failures
    /// surface as one error; a partial page is never returned.
    pub async fn read<T>(&self, page_size: usize, cursor: Option<&Cursor>) -> StorefrontResult<Page<T>>
    where
        T: Document,
        S: PagedCollection<T>,
    {
        if page_size == 0 {
            return Err(StorefrontError::InvalidPageSize);
        }

        let after = cursor
            .map(|cursor| decode_cursor(T::COLLECTION, cursor))
            .transpose()?;

        let mut items = self.store.fetch_after(after.as_ref(), page_size).await?;
        items.truncate(page_size);

        let next_cursor = match items.last() {
            Some(last) if items.len() == page_size => {
                Some(encode_cursor(T::COLLECTION, &last.position())?)
            }
            _ => None,
        };

        tracing::debug!(
            collection = %T::COLLECTION,
            page_size,
            returned = items.len(),
            resumed = after.is_some(),
            "Read page"
        );

        Ok(Page { items, next_cursor })
    }
}

/// Handed out per "load more" request; identifies the accumulator state it
/// was issued against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    epoch: u64,
    cursor: Option<Cursor>,
}

impl FetchTicket {
    /// Cursor to pass to the reader
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }
}

/// Caller-side "load more" accumulation with a stale-response guard.
///
/// A result is applied only if its ticket was issued after the latest
/// `reset`/`close` and for the current cursor. Late results are dropped; the
/// request itself is never cancelled.
#[derive(Debug)]
pub struct PageAccumulator<T> {
    page_size: usize,
    items: Vec<T>,
    next_cursor: Option<Cursor>,
    has_more: bool,
    epoch: u64,
    closed: bool,
}

impl<T> PageAccumulator<T> {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            items: Vec::new(),
            next_cursor: None,
            has_more: true,
            epoch: 0,
            closed: false,
        }
    }

    /// Ticket for the next read, or `None` when closed or exhausted
    pub fn next_ticket(&self) -> Option<FetchTicket> {
        if self.closed || !self.has_more {
            return None;
        }
        Some(FetchTicket {
            epoch: self.epoch,
            cursor: self.next_cursor.clone(),
        })
    }

    /// Append a page read with `ticket`. Returns `false` if it was stale.
    pub fn accept(&mut self, ticket: FetchTicket, page: Page<T>) -> bool {
        if self.closed || ticket.epoch != self.epoch || ticket.cursor != self.next_cursor {
            tracing::debug!(
                ticket_epoch = ticket.epoch,
                epoch = self.epoch,
                "Discarding stale page"
            );
            return false;
        }

        self.has_more = page.has_more(self.page_size);
        self.next_cursor = page.next_cursor;
        self.items.extend(page.items);
        true
    }

    /// Start over from the newest record; in-flight results become stale
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.items.clear();
        self.next_cursor = None;
        self.has_more = true;
    }

    /// Stop accepting results (the screen went away)
    pub fn close(&mut self) {
        self.epoch += 1;
        self.closed = true;
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    pub fn has_more(&self) -> bool {
        !self.closed && self.has_more
    }
}
