//! Lazy, single-pass, closeable result sequences.
//!
//! A [`ResultStream`] owns a [`Cursor`] that pulls from a backend on demand. The stream closes its
//! cursor when it is exhausted, when it yields an error, when the consumer calls
//! [`ResultStream::close`], and when it is dropped. Closing is idempotent, so every exit path
//! releases backend resources exactly once.

use std::collections::VecDeque;

use crate::errors::GraphError;

/// Pull-based source behind a [`ResultStream`].
pub trait Cursor<T>: Send {
    /// Next item, or `None` once exhausted.
    fn advance(&mut self) -> Option<Result<T, GraphError>>;

    /// Release backend resources. Called at most once.
    fn close(&mut self);
}

pub struct ResultStream<T> {
    cursor: Option<Box<dyn Cursor<T>>>,
}

impl<T> ResultStream<T> {
    pub fn close(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.cursor.is_none()
    }
}

impl<T> Iterator for ResultStream<T> {
    type Item = Result<T, GraphError>;

    fn next(&mut self) -> Option<Self::Item> {
        let cursor = self.cursor.as_mut()?;
        match cursor.advance() {
            Some(Ok(item)) => Some(Ok(item)),
            Some(Err(err)) => {
                self.close();
                Some(Err(err))
            }
            None => {
                self.close();
                None
            }
        }
    }
}

impl<T> Drop for ResultStream<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T> std::fmt::Debug for ResultStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStream")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl<T: Send + 'static> ResultStream<T> {
    pub fn new(cursor: impl Cursor<T> + 'static) -> Self {
        Self {
            cursor: Some(Box::new(cursor)),
        }
    }

    pub fn empty() -> Self {
        Self { cursor: None }
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self::from_results(items.into_iter().map(Ok))
    }

    pub fn from_results<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<T, GraphError>> + Send + 'static,
    {
        Self::new(IterCursor { iter })
    }

    /// A stream whose first pull reports `err`.
    pub fn failed(err: GraphError) -> Self {
        Self::from_results(std::iter::once(Err(err)))
    }

    /// Drain the stream into a vector, closing it on every path.
    pub fn collect_all(mut self) -> Result<Vec<T>, GraphError> {
        let mut items = Vec::new();
        for item in self.by_ref() {
            items.push(item?);
        }
        Ok(items)
    }

    pub fn try_map<U, F>(self, f: F) -> ResultStream<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Result<U, GraphError> + Send + 'static,
    {
        ResultStream::new(MapCursor { inner: self, f })
    }

    pub fn map<U, F>(self, mut f: F) -> ResultStream<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        self.try_map(move |item| Ok(f(item)))
    }

    pub fn filter_map<U, F>(self, f: F) -> ResultStream<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Option<U> + Send + 'static,
    {
        ResultStream::new(FilterMapCursor { inner: self, f })
    }

    /// At most `limit` items; the source closes as soon as the limit is reached.
    pub fn take(self, limit: usize) -> ResultStream<T> {
        ResultStream::new(TakeCursor {
            inner: self,
            remaining: limit,
        })
    }

    /// Replace each item by the stream `f` opens for it, one at a time.
    pub fn flat_map<U, F>(self, f: F) -> ResultStream<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Result<ResultStream<U>, GraphError> + Send + 'static,
    {
        ResultStream::new(FlatMapCursor {
            outer: self,
            current: None,
            f,
        })
    }

    /// Lazy concatenation; closing the result closes every part not yet drained.
    pub fn concat(parts: Vec<ResultStream<T>>) -> ResultStream<T> {
        ResultStream::new(ConcatCursor {
            parts: parts.into(),
        })
    }

    /// Run `hook` once when the stream closes, after the source closes.
    pub fn on_close<F>(self, hook: F) -> ResultStream<T>
    where
        F: FnOnce() + Send + 'static,
    {
        ResultStream::new(OnCloseCursor {
            inner: self,
            hook: Some(hook),
        })
    }
}

struct IterCursor<I> {
    iter: I,
}

impl<T, I> Cursor<T> for IterCursor<I>
where
    I: Iterator<Item = Result<T, GraphError>> + Send,
{
    fn advance(&mut self) -> Option<Result<T, GraphError>> {
        self.iter.next()
    }

    fn close(&mut self) {}
}

struct MapCursor<T, F> {
    inner: ResultStream<T>,
    f: F,
}

impl<T, U, F> Cursor<U> for MapCursor<T, F>
where
    T: Send,
    F: FnMut(T) -> Result<U, GraphError> + Send,
{
    fn advance(&mut self) -> Option<Result<U, GraphError>> {
        match self.inner.next()? {
            Ok(item) => Some((self.f)(item)),
            Err(err) => Some(Err(err)),
        }
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

struct FilterMapCursor<T, F> {
    inner: ResultStream<T>,
    f: F,
}

impl<T, U, F> Cursor<U> for FilterMapCursor<T, F>
where
    T: Send,
    F: FnMut(T) -> Option<U> + Send,
{
    fn advance(&mut self) -> Option<Result<U, GraphError>> {
        loop {
            match self.inner.next()? {
                Ok(item) => {
                    if let Some(mapped) = (self.f)(item) {
                        return Some(Ok(mapped));
                    }
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

struct TakeCursor<T> {
    inner: ResultStream<T>,
    remaining: usize,
}

impl<T: Send> Cursor<T> for TakeCursor<T> {
    fn advance(&mut self) -> Option<Result<T, GraphError>> {
        if self.remaining == 0 {
            self.inner.close();
            return None;
        }
        let item = self.inner.next()?;
        self.remaining -= 1;
        if self.remaining == 0 {
            self.inner.close();
        }
        Some(item)
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

struct FlatMapCursor<T, U, F> {
    outer: ResultStream<T>,
    current: Option<ResultStream<U>>,
    f: F,
}

impl<T, U, F> Cursor<U> for FlatMapCursor<T, U, F>
where
    T: Send,
    U: Send,
    F: FnMut(T) -> Result<ResultStream<U>, GraphError> + Send,
{
    fn advance(&mut self) -> Option<Result<U, GraphError>> {
        loop {
            if let Some(current) = self.current.as_mut() {
                match current.next() {
                    Some(item) => return Some(item),
                    None => self.current = None,
                }
            }
            match self.outer.next()? {
                Ok(item) => match (self.f)(item) {
                    Ok(stream) => self.current = Some(stream),
                    Err(err) => return Some(Err(err)),
                },
                Err(err) => return Some(Err(err)),
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut current) = self.current.take() {
            current.close();
        }
        self.outer.close();
    }
}

struct ConcatCursor<T> {
    parts: VecDeque<ResultStream<T>>,
}

impl<T: Send> Cursor<T> for ConcatCursor<T> {
    fn advance(&mut self) -> Option<Result<T, GraphError>> {
        loop {
            let front = self.parts.front_mut()?;
            match front.next() {
                Some(item) => return Some(item),
                None => {
                    self.parts.pop_front();
                }
            }
        }
    }

    fn close(&mut self) {
        for mut part in self.parts.drain(..) {
            part.close();
        }
    }
}

struct OnCloseCursor<T, F> {
    inner: ResultStream<T>,
    hook: Option<F>,
}

impl<T, F> Cursor<T> for OnCloseCursor<T, F>
where
    T: Send,
    F: FnOnce() + Send,
{
    fn advance(&mut self) -> Option<Result<T, GraphError>> {
        self.inner.next()
    }

    fn close(&mut self) {
        self.inner.close();
        if let Some(hook) = self.hook.take() {
            hook();
        }
    }
}
