//! Abstractions for forward cursor pagination.

/// Maximum number of nodes a single page may contain.
pub const MAX_PAGE_SIZE: usize = 100;

/// Page of nodes.
#[derive(Clone, Debug)]
pub struct Page<C, N> {
    /// [`Edge`]s on this [`Page`].
    pub edges: Vec<Edge<C, N>>,

    /// Indicator whether there are more nodes after this [`Page`].
    pub has_next_page: bool,
}

impl<C, N> Page<C, N> {
    /// Creates a new [`Page`] out of the fetched `edges`.
    ///
    /// `edges` are expected to be fetched with a limit of
    /// [`Arguments::fetch_limit()`], so the extra one only indicates presence
    /// of a next page and is cut off.
    #[must_use]
    pub fn new(
        args: &Arguments<C>,
        edges: impl IntoIterator<Item = impl Into<Edge<C, N>>>,
    ) -> Self {
        let mut edges = edges.into_iter().map(Into::into).collect::<Vec<_>>();
        let has_next_page = edges.len() > args.first;
        edges.truncate(args.first);
        Self {
            edges,
            has_next_page,
        }
    }

    /// Returns the cursor of the last [`Edge`] on this [`Page`].
    #[must_use]
    pub fn end_cursor(&self) -> Option<&C> {
        self.edges.last().map(|e| &e.cursor)
    }
}

/// An edge on a [`Page`].
#[derive(Clone, Copy, Debug)]
pub struct Edge<C, N> {
    /// Cursor of this [`Edge`].
    pub cursor: C,

    /// Node of this [`Edge`].
    pub node: N,
}

impl<C, N> From<(C, N)> for Edge<C, N> {
    fn from((cursor, node): (C, N)) -> Self {
        Self { cursor, node }
    }
}

/// Forward pagination arguments.
#[derive(Clone, Copy, Debug)]
pub struct Arguments<C> {
    /// Number of nodes to return.
    first: usize,

    /// Cursor after which nodes are returned.
    after: Option<C>,
}

impl<C> Arguments<C> {
    /// Creates new [`Arguments`], using the `default` page size when `first`
    /// is omitted.
    ///
    /// [`None`] is returned if `first` is negative, zero or exceeds the
    /// [`MAX_PAGE_SIZE`].
    pub fn new<Num>(
        first: Option<Num>,
        after: Option<C>,
        default: Num,
    ) -> Option<Self>
    where
        Num: TryInto<usize>,
    {
        let first = first.unwrap_or(default).try_into().ok()?;
        (1..=MAX_PAGE_SIZE)
            .contains(&first)
            .then_some(Self { first, after })
    }

    /// Returns the cursor after which nodes are requested.
    #[must_use]
    pub fn after(&self) -> Option<&C> {
        self.after.as_ref()
    }

    /// Returns the number of requested nodes.
    #[must_use]
    pub fn first(&self) -> usize {
        self.first
    }

    /// Returns the number of nodes to fetch from a storage, which is one more
    /// than requested to detect a next page presence.
    #[must_use]
    pub fn fetch_limit(&self) -> usize {
        self.first + 1
    }
}

/// Pagination selector.
#[derive(Clone, Copy, Debug)]
pub struct Selector<C, F> {
    /// Pagination [`Arguments`].
    pub arguments: Arguments<C>,

    /// Additional filter being applied to the result.
    pub filter: F,
}

/// Defines pagination types for the provided cursor, node and filter.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($cursor:ty, $node:ty, $filter:ty) => {
        #[doc = "Edge on a [`Page`]."]
        pub type Edge = $crate::pagination::Edge<$cursor, $node>;

        #[doc = "A [`Page`] of nodes."]
        pub type Page = $crate::pagination::Page<$cursor, $node>;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments<$cursor>;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$cursor, $filter>;
    };
}

#[cfg(test)]
mod spec {
    use super::{Arguments, Page, MAX_PAGE_SIZE};

    #[test]
    fn validates_page_size() {
        assert_eq!(Arguments::<u8>::new(None, None, 10).unwrap().first(), 10);
        assert_eq!(Arguments::<u8>::new(Some(3), None, 10).unwrap().first(), 3);
        assert!(Arguments::<u8>::new(Some(0), None, 10).is_none());
        assert!(Arguments::<u8>::new(Some(-1), None, 10).is_none());
        assert!(Arguments::<u8>::new(
            Some(i32::try_from(MAX_PAGE_SIZE).unwrap() + 1),
            None,
            10,
        )
        .is_none());
    }

    #[test]
    fn cuts_extra_edge_off() {
        let args = Arguments::new(Some(2), None::<u8>, 10).unwrap();
        assert_eq!(args.fetch_limit(), 3);

        let page =
            Page::<u8, &str>::new(&args, [(1_u8, "a"), (2, "b"), (3, "c")]);
        assert!(page.has_next_page);
        assert_eq!(page.edges.len(), 2);
        assert_eq!(page.end_cursor(), Some(&2));

        let page = Page::<u8, &str>::new(&args, [(1_u8, "a")]);
        assert!(!page.has_next_page);
        assert_eq!(page.end_cursor(), Some(&1));
    }
}
