//! [`Query`] collection related to the multiple [`Lot`]s.

use common::operations::By;

use crate::read::lot::list;
#[cfg(doc)]
use crate::{domain::Lot, Query};

use super::DatabaseQuery;

/// Queries a list of [`Lot`]s.
pub type List = DatabaseQuery<By<list::Page, list::Selector>>;
